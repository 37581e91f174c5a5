//! # RepoPulse Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The sync pipeline (foreground init, background bounded-concurrency
//!   item sync with progress tracking)
//! - The signal engine (stateless read-side aggregation)
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `repopulse-domain`
//! - No database or HTTP code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod signals;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use signals::bots::{BotPolicy, LoginBotPolicy};
pub use signals::SignalEngine;
pub use sync::ports::{
    CodeHostClient, ContributorStore, IssueStore, PullRequestStore, RepositoryStore,
    StatsSnapshotStore,
};
pub use sync::{SyncHandle, SyncService};
