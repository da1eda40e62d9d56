//! Service-level errors.

use eloquent::RepositoryError;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Repository(RepositoryError::Configuration { .. }) => "CONFIGURATION_ERROR",
            AppError::Repository(_) => "REPOSITORY_ERROR",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => AppError::NotFound,
            invalid @ RepositoryError::InvalidIdentifier { .. } => {
                AppError::BadRequest(invalid.to_string())
            }
            other => AppError::Repository(other),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use eloquent::{CallSite, Operation, StoreError};

    #[test]
    fn test_repository_errors_map_to_app_errors() {
        let not_found = RepositoryError::not_found(
            "users",
            "642d5b2298ba2bb73c55e5c4",
            CallSite::new(Operation::Find),
        );
        let failed = RepositoryError::classify(
            "users",
            CallSite::new(Operation::Count),
            StoreError::backend("down"),
        );

        assert!(matches!(AppError::from(not_found), AppError::NotFound));
        assert_eq!(AppError::from(failed).code(), "REPOSITORY_ERROR");
    }

    #[test]
    fn test_invalid_identifier_is_bad_request() {
        let invalid = eloquent::identifier::decode("nope").unwrap_err();
        let err =
            RepositoryError::invalid_identifier("users", CallSite::new(Operation::Delete), invalid);

        let app = AppError::from(err);

        assert_eq!(app.code(), "BAD_REQUEST");
        assert!(app.to_string().contains("[collection - users]"));
    }
}
