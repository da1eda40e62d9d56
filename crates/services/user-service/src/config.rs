//! User service configuration.

use std::env;

use common::{ConfigResult, StoreConfig};

/// Environment key for the users collection name
pub const ENV_USERS_COLLECTION: &str = "USERS_COLLECTION";

/// Collection used when `USERS_COLLECTION` is unset
pub const DEFAULT_USERS_COLLECTION: &str = "users";

/// User service configuration.
#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    /// Store connection parameters
    pub store: StoreConfig,
    /// Collection holding user records
    pub collection: String,
}

impl UserServiceConfig {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = StoreConfig::from_lookup(&lookup)?;
        let collection = lookup(ENV_USERS_COLLECTION)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_USERS_COLLECTION.to_string());

        Ok(Self { store, collection })
    }
}
