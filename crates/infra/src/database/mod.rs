//! SQLite persistence adapters
//!
//! One store per aggregate, all sharing the pooled `DbManager`. Timestamps
//! are stored as unix seconds; review latency figures as REAL hours.

use chrono::{DateTime, TimeZone, Utc};
use repopulse_domain::{RepoPulseError, Result};

pub mod contributor_store;
pub mod issue_store;
pub mod manager;
pub mod pull_request_store;
pub mod repository_store;
pub mod snapshot_store;

pub(crate) fn to_ts(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

pub(crate) fn from_ts(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| RepoPulseError::Database(format!("timestamp out of range: {secs}")))
}

pub(crate) fn opt_to_ts(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(to_ts)
}

pub(crate) fn opt_from_ts(secs: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    secs.map(from_ts).transpose()
}
