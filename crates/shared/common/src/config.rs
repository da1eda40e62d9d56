//! Store connection configuration.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Environment key for the database name
pub const ENV_DATABASE: &str = "MONGODB_NAME";
/// Environment key for the store host
pub const ENV_HOST: &str = "MONGODB_HOST";
/// Environment key for the store port
pub const ENV_PORT: &str = "MONGODB_PORT";
/// Environment key for the optional user name
pub const ENV_USER: &str = "MONGODB_USER";
/// Environment key for the optional password
pub const ENV_PASSWORD: &str = "MONGODB_PASSWORD";

/// Connection parameters for the document store.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database every repository is scoped to
    pub database: String,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    password: Option<String>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl StoreConfig {
    /// Build a configuration without credentials.
    pub fn new(database: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            database: database.into(),
            host: host.into(),
            port,
            user: None,
            password: None,
        }
    }

    /// Attach credentials. A blank user clears them.
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let user = user.into();
        if user.is_empty() {
            self.user = None;
            self.password = None;
        } else {
            self.user = Some(user);
            self.password = Some(password.into());
        }
        self
    }

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
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let database = required(ENV_DATABASE)?;
        let host = required(ENV_HOST)?;
        let port = required(ENV_PORT)?
            .parse::<u16>()
            .map_err(|e| ConfigError::invalid(ENV_PORT, e.to_string()))?;

        let config = Self::new(database, host, port);
        let config = match lookup(ENV_USER).filter(|u| !u.is_empty()) {
            Some(user) => config.with_credentials(user, lookup(ENV_PASSWORD).unwrap_or_default()),
            None => config,
        };

        config.validate()?;
        tracing::debug!(
            database = %config.database,
            host = %config.host,
            port = config.port,
            authenticated = config.user.is_some(),
            "store configuration loaded"
        );
        Ok(config)
    }

    /// Reject configurations that cannot produce a usable connection string.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_DATABASE));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_HOST));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid(ENV_PORT, "port must be non-zero"));
        }
        Ok(())
    }

    /// Connection string for the MongoDB driver.
    pub fn connection_uri(&self) -> String {
        let domain = match &self.user {
            Some(user) => format!(
                "{}:{}@{}:{}",
                user,
                self.password.as_deref().unwrap_or_default(),
                self.host,
                self.port
            ),
            None => format!("{}:{}", self.host, self.port),
        };

        format!("mongodb://{}/?retryWrites=true&w=majority", domain)
    }
}
