//! User service - timestamps and identifiers on top of the repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use eloquent::bson::Document;
use eloquent::{FindOptions, Pagination};

use crate::error::{AppError, AppResult};
use crate::repository::{User, UserRepository};

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn all(&self, options: Option<FindOptions>) -> AppResult<Vec<User>>;

    async fn find(&self, id: &str) -> AppResult<User>;

    async fn find_multiple(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> AppResult<Vec<User>>;

    /// Stamp `created_at` and `updated_at`, then persist
    async fn insert(&self, user: User) -> AppResult<String>;

    /// Stamp every user, then persist the batch
    async fn insert_multiple(&self, users: Vec<User>) -> AppResult<Vec<String>>;

    async fn delete(&self, id: &str) -> AppResult<u64>;

    async fn delete_multiple(&self, filter: Document) -> AppResult<u64>;

    /// Merge `data` into the user it identifies; `data.id` is required
    async fn update(&self, data: User) -> AppResult<u64>;

    async fn update_multiple(&self, filter: Document, data: User) -> AppResult<u64>;

    async fn count(&self, filter: Option<Document>) -> AppResult<u64>;

    async fn paginate(
        &self,
        limit: i64,
        page: i64,
        filter: Option<Document>,
    ) -> AppResult<Pagination<User>>;

    async fn underage(&self, age: i32) -> AppResult<Vec<User>>;

    async fn overage(&self, age: i32) -> AppResult<Vec<User>>;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create new user service instance with repository
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn stamp_created(user: &mut User, at: i64) {
    user.created_at = Some(at);
    user.updated_at = Some(at);
}

#[async_trait]
impl UserService for UserManager {
    async fn all(&self, options: Option<FindOptions>) -> AppResult<Vec<User>> {
        self.repo.all(options).await
    }

    async fn find(&self, id: &str) -> AppResult<User> {
        self.repo.find(id).await
    }

    async fn find_multiple(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> AppResult<Vec<User>> {
        self.repo.find_multiple(filter, options).await
    }

    async fn insert(&self, mut user: User) -> AppResult<String> {
        stamp_created(&mut user, now());
        self.repo.insert(user).await
    }

    async fn insert_multiple(&self, mut users: Vec<User>) -> AppResult<Vec<String>> {
        let at = now();
        users.iter_mut().for_each(|user| stamp_created(user, at));
        self.repo.insert_multiple(users).await
    }

    async fn delete(&self, id: &str) -> AppResult<u64> {
        self.repo.delete(id).await
    }

    async fn delete_multiple(&self, filter: Document) -> AppResult<u64> {
        self.repo.delete_multiple(filter).await
    }

    async fn update(&self, mut data: User) -> AppResult<u64> {
        let id = data
            .id
            .take()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::validation("user id is required for update"))?;

        data.updated_at = Some(now());
        self.repo.update(&id, data).await
    }

    async fn update_multiple(&self, filter: Document, mut data: User) -> AppResult<u64> {
        data.updated_at = Some(now());
        self.repo.update_multiple(filter, data).await
    }

    async fn count(&self, filter: Option<Document>) -> AppResult<u64> {
        self.repo.count(filter).await
    }

    async fn paginate(
        &self,
        limit: i64,
        page: i64,
        filter: Option<Document>,
    ) -> AppResult<Pagination<User>> {
        self.repo.paginate(limit, page, filter).await
    }

    async fn underage(&self, age: i32) -> AppResult<Vec<User>> {
        self.repo.underage(age).await
    }

    async fn overage(&self, age: i32) -> AppResult<Vec<User>> {
        self.repo.overage(age).await
    }
}
