//! # RepoPulse Domain
//!
//! Business domain types and models for RepoPulse.
//!
//! This crate contains:
//! - Persisted entity types (Repository, Contributor, PullRequest, Issue)
//! - Signal report types returned to the serving layer
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other RepoPulse crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
