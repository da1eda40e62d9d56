//! Error taxonomy and classification.
//!
//! Backends report [`StoreError`]. The repository never returns it directly:
//! every failure is classified into a [`RepositoryError`] that carries the
//! collection name and the call site of the operation, rendered as
//! `[collection - <name>] : <message> <call-site>`.

use std::fmt;
use std::panic::Location;

use common::ConfigError;
use thiserror::Error;

use crate::identifier::InvalidIdentifier;

/// Repository operations, used to label call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    All,
    Find,
    FindMultiple,
    Insert,
    InsertMultiple,
    Delete,
    DeleteMultiple,
    Update,
    UpdateMultiple,
    Count,
    Paginate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::All => "all",
            Operation::Find => "find",
            Operation::FindMultiple => "find_multiple",
            Operation::Insert => "insert",
            Operation::InsertMultiple => "insert_multiple",
            Operation::Delete => "delete",
            Operation::DeleteMultiple => "delete_multiple",
            Operation::Update => "update",
            Operation::UpdateMultiple => "update_multiple",
            Operation::Count => "count",
            Operation::Paginate => "paginate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a repository operation was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub operation: Operation,
    pub location: &'static Location<'static>,
}

impl CallSite {
    /// Capture the caller's source location for `operation`.
    #[track_caller]
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(op: {}, at {}:{})",
            self.operation,
            self.location.file(),
            self.location.line()
        )
    }
}

/// Errors raised by store backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "mongodb")]
    #[error("driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("unsupported {0}")]
    Unsupported(String),

    #[error("store returned an unexpected identifier: {0}")]
    UnexpectedId(String),

    #[error("{0}")]
    Backend(String),
}

/// Result type alias for backends
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        StoreError::Unsupported(what.into())
    }
}

/// Classified repository errors.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Malformed identifier, rejected before any store call
    #[error("[collection - {collection}] : {source} {call_site}")]
    InvalidIdentifier {
        collection: String,
        call_site: CallSite,
        #[source]
        source: InvalidIdentifier,
    },

    /// The store confirmed that no document matches
    #[error("[collection - {collection}] : no document with id `{id}` {call_site}")]
    NotFound {
        collection: String,
        id: String,
        call_site: CallSite,
    },

    /// Transport, store or decode failure
    #[error("[collection - {collection}] : {source} {call_site}")]
    QueryFailed {
        collection: String,
        call_site: CallSite,
        #[source]
        source: StoreError,
    },

    /// Connection parameters are missing or unusable
    #[error("[collection - {collection}] : {source} {call_site}")]
    Configuration {
        collection: String,
        call_site: CallSite,
        #[source]
        source: ConfigError,
    },
}

/// Result type alias
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    /// Wrap a backend error with its collection and call site.
    pub fn classify(
        collection: impl Into<String>,
        call_site: CallSite,
        source: StoreError,
    ) -> Self {
        let collection = collection.into();
        match source {
            StoreError::Configuration(source) => RepositoryError::Configuration {
                collection,
                call_site,
                source,
            },
            source => RepositoryError::QueryFailed {
                collection,
                call_site,
                source,
            },
        }
    }

    pub fn invalid_identifier(
        collection: impl Into<String>,
        call_site: CallSite,
        source: InvalidIdentifier,
    ) -> Self {
        RepositoryError::InvalidIdentifier {
            collection: collection.into(),
            call_site,
            source,
        }
    }

    pub fn not_found(
        collection: impl Into<String>,
        id: impl Into<String>,
        call_site: CallSite,
    ) -> Self {
        RepositoryError::NotFound {
            collection: collection.into(),
            id: id.into(),
            call_site,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            RepositoryError::InvalidIdentifier { collection, .. }
            | RepositoryError::NotFound { collection, .. }
            | RepositoryError::QueryFailed { collection, .. }
            | RepositoryError::Configuration { collection, .. } => collection,
        }
    }

    pub fn call_site(&self) -> CallSite {
        match self {
            RepositoryError::InvalidIdentifier { call_site, .. }
            | RepositoryError::NotFound { call_site, .. }
            | RepositoryError::QueryFailed { call_site, .. }
            | RepositoryError::Configuration { call_site, .. } => *call_site,
        }
    }

    pub fn operation(&self) -> Operation {
        self.call_site().operation
    }

    pub fn is_invalid_identifier(&self) -> bool {
        matches!(self, RepositoryError::InvalidIdentifier { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    pub fn is_query_failed(&self) -> bool {
        matches!(self, RepositoryError::QueryFailed { .. })
    }

    /// Client-side errors that a retry with the same input cannot fix.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RepositoryError::InvalidIdentifier { .. } | RepositoryError::NotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_message_shape() {
        let site = CallSite::new(Operation::Count);
        let err = RepositoryError::classify("users", site, StoreError::backend("connection reset"));

        let message = err.to_string();
        assert!(message.starts_with("[collection - users] : connection reset "));
        assert!(message.contains("op: count"));
        assert!(message.contains(file!()));
    }

    #[test]
    fn test_call_site_points_at_caller() {
        let line = line!() + 1;
        let site = CallSite::new(Operation::Find);

        assert_eq!(site.location.line(), line);
        assert_eq!(site.location.file(), file!());
    }

    #[test]
    fn test_configuration_errors_keep_their_class() {
        let err = RepositoryError::classify(
            "users",
            CallSite::new(Operation::All),
            StoreError::from(ConfigError::Missing("MONGODB_HOST")),
        );

        assert!(matches!(err, RepositoryError::Configuration { .. }));
        assert!(err.to_string().contains("MONGODB_HOST"));
    }

    #[test]
    fn test_underlying_cause_is_preserved() {
        let err = RepositoryError::classify(
            "users",
            CallSite::new(Operation::Insert),
            StoreError::DuplicateKey("642d5b2298ba2bb73c55e5c4".into()),
        );

        assert!(err.is_query_failed());
        assert_eq!(err.operation(), Operation::Insert);
        let source = err.source().expect("classified errors keep their source");
        assert!(source.to_string().contains("642d5b2298ba2bb73c55e5c4"));
    }

    #[test]
    fn test_not_found_is_client_error() {
        let err = RepositoryError::not_found(
            "users",
            "642d5b2298ba2bb73c55e5c4",
            CallSite::new(Operation::Find),
        );

        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert_eq!(err.collection(), "users");
    }
}
