//! Application configuration structures
//!
//! Populated by the infra config loader from environment variables or a
//! TOML file; the domain crate only defines the shapes and defaults.

use serde::{Deserialize, Serialize};

use crate::constants::{PROGRESS_COMMIT_INTERVAL, SYNC_CONCURRENCY_LIMIT};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GithubConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path
    pub path: String,
    /// Connection pool size
    pub pool_size: u32,
}

/// Code host API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// API token. Optional; unauthenticated requests are heavily
    /// rate-limited by the host.
    pub token: Option<String>,
    /// API base URL (overridable for tests)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Sync pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum in-flight remote calls per run, shared across PR and issue
    /// processing.
    pub concurrency_limit: usize,
    /// Commit the progress counter every Nth completed item.
    pub progress_commit_interval: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: SYNC_CONCURRENCY_LIMIT,
            progress_commit_interval: PROGRESS_COMMIT_INTERVAL,
        }
    }
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl GithubConfig {
    /// Default configuration pointing at the public GitHub API.
    pub fn unauthenticated() -> Self {
        Self { token: None, base_url: default_base_url(), timeout_secs: default_timeout_secs() }
    }
}
