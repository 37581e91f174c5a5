//! Stateless read-side signal computation
//!
//! Every report is recomputed from stored rows on each call; nothing here
//! caches or persists. The four computations are pure functions over row
//! slices, with `SignalEngine` as the port-backed facade.

use std::collections::HashMap;

use repopulse_domain::{Contributor, RepoPulseError, Result};

pub mod bots;
pub mod contributors;
pub mod engine;
pub mod issues;
pub mod overview;
pub mod pull_requests;
pub mod stats;

pub use engine::SignalEngine;

/// Resolve an item's author row. A dangling reference means the store is
/// inconsistent; the affected report degrades with a computation error.
pub(crate) fn author<'a>(
    contributors: &'a HashMap<i64, Contributor>,
    author_id: i64,
) -> Result<&'a Contributor> {
    contributors.get(&author_id).ok_or_else(|| {
        RepoPulseError::Computation(format!("contributor {author_id} missing from store"))
    })
}
