//! Two-stage repository synchronization
//!
//! `init_sync` runs in the foreground: it fetches repository metadata and
//! trusted open counts, commits the run header, and returns immediately.
//! `execute_sync` runs in the background: it fetches the most recent open
//! items and upserts them with bounded concurrency, coalescing progress
//! commits.

pub mod contributor_cache;
pub mod ports;
pub mod service;

pub use contributor_cache::ContributorCache;
pub use service::{SyncHandle, SyncService};
