//! Infrastructure error types and conversions into the domain error

use repopulse_domain::RepoPulseError;
use thiserror::Error;

/// Errors raised inside the infrastructure adapters.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database error: {0}")]
    Database(String),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("task join error: {0}")]
    Join(String),
}

impl From<rusqlite::Error> for InfraError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(err: r2d2::Error) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<tokio::task::JoinError> for InfraError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

impl From<InfraError> for RepoPulseError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Database(msg) | InfraError::Pool(msg) => RepoPulseError::Database(msg),
            InfraError::Http(msg) => RepoPulseError::Upstream(msg),
            InfraError::Config(msg) => RepoPulseError::Config(msg),
            InfraError::Join(msg) => RepoPulseError::Internal(msg),
        }
    }
}

/// Map a blocking-task join failure straight to the domain error.
pub(crate) fn map_join_error(err: tokio::task::JoinError) -> RepoPulseError {
    RepoPulseError::from(InfraError::from(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infra_errors_map_to_the_matching_domain_kind() {
        let db: RepoPulseError = InfraError::Database("locked".into()).into();
        assert!(matches!(db, RepoPulseError::Database(_)));

        let pool: RepoPulseError = InfraError::Pool("exhausted".into()).into();
        assert!(matches!(pool, RepoPulseError::Database(_)));

        let http: RepoPulseError = InfraError::Http("timeout".into()).into();
        assert!(matches!(http, RepoPulseError::Upstream(_)));

        let config: RepoPulseError = InfraError::Config("missing token".into()).into();
        assert!(matches!(config, RepoPulseError::Config(_)));
    }
}
