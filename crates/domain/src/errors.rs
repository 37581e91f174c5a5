//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for RepoPulse
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RepoPulseError {
    /// Unresolved repository id or owner/name pair. Non-retryable.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate-limit, transport, or non-success response from the code host.
    /// Surfaced as one opaque kind; recovery is caller-initiated re-sync.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Unexpected aggregation condition inside the signal engine, e.g. a
    /// missing author reference. Degrades only the affected report.
    #[error("Computation failure: {0}")]
    Computation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A sync run is already in flight for the repository.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for RepoPulse operations
pub type Result<T> = std::result::Result<T, RepoPulseError>;
