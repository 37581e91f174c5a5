//! # RepoPulse Infrastructure
//!
//! Adapter implementations of the core ports:
//! - SQLite stores behind an r2d2 connection pool
//! - GitHub REST client over reqwest
//! - Environment/TOML configuration loading
//!
//! All database work runs on the blocking thread pool; the async store
//! traits never hold a connection across an await point.

pub mod config;
pub mod database;
pub mod errors;
pub mod github;

pub use config::loader::ConfigLoader;
pub use database::contributor_store::SqliteContributorStore;
pub use database::issue_store::SqliteIssueStore;
pub use database::manager::DbManager;
pub use database::pull_request_store::SqlitePullRequestStore;
pub use database::repository_store::SqliteRepositoryStore;
pub use database::snapshot_store::SqliteSnapshotStore;
pub use errors::InfraError;
pub use github::client::GithubClient;
