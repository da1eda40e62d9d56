//! User Service Library
//!
//! User records kept in a document store through the generic `eloquent`
//! repository, with a service layer that stamps creation and update times.

pub mod config;
pub mod error;
pub mod repository;
pub mod service;

use std::sync::Arc;

use eloquent::ConnectionProvider;

use crate::config::UserServiceConfig;
use crate::repository::UserStore;
use crate::service::UserManager;

/// Wire the repository and service over `provider`.
pub fn build_service(
    provider: Arc<dyn ConnectionProvider>,
    config: &UserServiceConfig,
) -> UserManager {
    let store = UserStore::new(provider, &config.collection);
    tracing::debug!(
        database = %config.store.database,
        collection = %config.collection,
        "user service ready"
    );
    UserManager::new(Arc::new(store))
}
