//! User service over the in-memory store.

use std::sync::Arc;

use eloquent::bson::doc;
use eloquent::store::memory::MemoryProvider;

use user_service_lib::error::AppError;
use user_service_lib::repository::{User, UserRepository, UserStore};
use user_service_lib::service::{UserManager, UserService};

fn setup() -> (Arc<UserStore>, UserManager) {
    let provider = Arc::new(MemoryProvider::new("user-service-test"));
    let store = Arc::new(UserStore::new(provider, "users"));
    let service = UserManager::new(store.clone());
    (store, service)
}

async fn seed(service: &UserManager) -> Vec<String> {
    let users = vec![
        User::new("c1", 12),
        User::new("c2", 25),
        User::new("c3", 30),
        User::new("c4", 41),
        User::new("c5", 67),
    ];
    service.insert_multiple(users).await.unwrap()
}

#[tokio::test]
async fn test_insert_then_find() {
    let (_, service) = setup();

    let id = service.insert(User::new("c6", 54)).await.unwrap();
    let user = service.find(&id).await.unwrap();

    assert_eq!(user.id.as_deref(), Some(id.as_str()));
    assert_eq!(user.name.as_deref(), Some("c6"));
    assert!(user.created_at.is_some());
    assert_eq!(user.created_at, user.updated_at);
}

#[tokio::test]
async fn test_update_keeps_unset_fields() {
    let (_, service) = setup();
    let id = service.insert(User::new("c6", 54)).await.unwrap();
    let created = service.find(&id).await.unwrap().created_at;

    let modified = service
        .update(User {
            id: Some(id.clone()),
            age: Some(55),
            ..Default::default()
        })
        .await
        .unwrap();
    let user = service.find(&id).await.unwrap();

    assert_eq!(modified, 1);
    assert_eq!(user.name.as_deref(), Some("c6"));
    assert_eq!(user.age, Some(55));
    assert_eq!(user.created_at, created);
}

#[tokio::test]
async fn test_underage_and_overage() {
    let (store, service) = setup();
    seed(&service).await;

    let under = store.underage(30).await.unwrap();
    let over = service.overage(30).await.unwrap();

    assert_eq!(under.len(), 2);
    assert!(under.iter().all(|u| u.age.unwrap() < 30));
    assert_eq!(over.len(), 2);
    assert!(over.iter().all(|u| u.age.unwrap() > 30));
}

#[tokio::test]
async fn test_paginate_and_count() {
    let (_, service) = setup();
    seed(&service).await;

    let page = service.paginate(2, 2, Some(doc! { "age": { "$gte": 20 } })).await.unwrap();

    assert_eq!(page.total, 4);
    assert_eq!(page.last_page, 2);
    assert_eq!((page.from, page.to), (3, 4));
    assert_eq!(page.data.len(), 2);
    assert_eq!(service.count(None).await.unwrap(), 5);
}

#[tokio::test]
async fn test_delete_multiple() {
    let (_, service) = setup();
    seed(&service).await;

    let deleted = service.delete_multiple(doc! { "age": { "$gt": 40 } }).await.unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(service.count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn test_errors_map_to_service_errors() {
    let (_, service) = setup();

    let missing = service.find("642d5b2298ba2bb73c55e5c4").await.unwrap_err();
    let malformed = service.delete("not-an-id").await.unwrap_err();

    assert!(matches!(missing, AppError::NotFound));
    assert_eq!(malformed.code(), "BAD_REQUEST");
}
