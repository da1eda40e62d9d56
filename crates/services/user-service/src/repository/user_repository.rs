//! User repository on top of the generic document repository.

use std::sync::Arc;

use async_trait::async_trait;
use eloquent::bson::{doc, Document};
use eloquent::{ConnectionProvider, FindOptions, Pagination, Repository};

use super::entities::User;
use crate::error::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Every user
    async fn all(&self, options: Option<FindOptions>) -> AppResult<Vec<User>>;

    /// User by hex identifier
    async fn find(&self, id: &str) -> AppResult<User>;

    /// Users matching `filter`
    async fn find_multiple(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> AppResult<Vec<User>>;

    /// Persist one user, returning its identifier
    async fn insert(&self, user: User) -> AppResult<String>;

    /// Persist a batch, returning identifiers in input order
    async fn insert_multiple(&self, users: Vec<User>) -> AppResult<Vec<String>>;

    async fn delete(&self, id: &str) -> AppResult<u64>;

    async fn delete_multiple(&self, filter: Document) -> AppResult<u64>;

    /// Merge the set fields of `data` into the user with identifier `id`
    async fn update(&self, id: &str, data: User) -> AppResult<u64>;

    /// Merge the set fields of `data` into every user matching `filter`
    async fn update_multiple(&self, filter: Document, data: User) -> AppResult<u64>;

    async fn count(&self, filter: Option<Document>) -> AppResult<u64>;

    /// Page of users, newest first
    async fn paginate(
        &self,
        limit: i64,
        page: i64,
        filter: Option<Document>,
    ) -> AppResult<Pagination<User>>;

    /// Users strictly younger than `age`
    async fn underage(&self, age: i32) -> AppResult<Vec<User>>;

    /// Users strictly older than `age`
    async fn overage(&self, age: i32) -> AppResult<Vec<User>>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    users: Repository<User>,
}

impl UserStore {
    /// Create new repository instance bound to `collection`
    pub fn new(provider: Arc<dyn ConnectionProvider>, collection: &str) -> Self {
        Self {
            users: Repository::new(provider, collection),
        }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn all(&self, options: Option<FindOptions>) -> AppResult<Vec<User>> {
        Ok(self.users.all(options).await?)
    }

    async fn find(&self, id: &str) -> AppResult<User> {
        Ok(self.users.find(id).await?)
    }

    async fn find_multiple(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> AppResult<Vec<User>> {
        Ok(self.users.find_multiple(filter, options).await?)
    }

    async fn insert(&self, user: User) -> AppResult<String> {
        Ok(self.users.insert(&user).await?)
    }

    async fn insert_multiple(&self, users: Vec<User>) -> AppResult<Vec<String>> {
        Ok(self.users.insert_multiple(&users).await?)
    }

    async fn delete(&self, id: &str) -> AppResult<u64> {
        Ok(self.users.delete(id).await?)
    }

    async fn delete_multiple(&self, filter: Document) -> AppResult<u64> {
        Ok(self.users.delete_multiple(filter).await?)
    }

    async fn update(&self, id: &str, data: User) -> AppResult<u64> {
        Ok(self.users.update(id, &data).await?)
    }

    async fn update_multiple(&self, filter: Document, data: User) -> AppResult<u64> {
        Ok(self.users.update_multiple(filter, &data).await?)
    }

    async fn count(&self, filter: Option<Document>) -> AppResult<u64> {
        Ok(self.users.count(filter).await?)
    }

    async fn paginate(
        &self,
        limit: i64,
        page: i64,
        filter: Option<Document>,
    ) -> AppResult<Pagination<User>> {
        Ok(self.users.paginate(limit, page, filter).await?)
    }

    async fn underage(&self, age: i32) -> AppResult<Vec<User>> {
        Ok(self.users.find_multiple(doc! { "age": { "$lt": age } }, None).await?)
    }

    async fn overage(&self, age: i32) -> AppResult<Vec<User>> {
        Ok(self.users.find_multiple(doc! { "age": { "$gt": age } }, None).await?)
    }
}
