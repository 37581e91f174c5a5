//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Contributor activity windows (days, relative to computation start)
pub const ACTIVE_WINDOW_DAYS: i64 = 30;
pub const CHURN_WINDOW_DAYS: i64 = 45;
pub const ACTIVE_WARNING_DAYS: i64 = 14;
pub const ACTIVE_CRITICAL_DAYS: i64 = 21;

// First-time contributor experience severities (hours)
pub const FIRST_REVIEW_WARNING_HOURS: f64 = 24.0;
pub const FIRST_REVIEW_CRITICAL_HOURS: f64 = 72.0;

// Attention queue thresholds (whole days; strictly greater-than)
pub const ATTENTION_WARNING_DAYS: i64 = 7;
pub const ATTENTION_CRITICAL_DAYS: i64 = 14;
pub const ATTENTION_QUEUE_CAP: usize = 50;

// Aggregation windows
pub const TRAILING_WINDOW_DAYS: i64 = 90;
pub const TREND_WEEKS: i64 = 5;

// Overview thresholds
pub const STALE_PR_THRESHOLD_HOURS: f64 = 336.0; // 14 days of review wait
pub const FAST_RESPONSE_HOURS: f64 = 48.0;
pub const ISSUE_OUTPACE_RATIO: f64 = 1.5;
pub const PR_KEEPUP_RATIO: f64 = 1.2;

// Sync pipeline tuning
pub const SYNC_CONCURRENCY_LIMIT: usize = 10;
pub const PROGRESS_COMMIT_INTERVAL: u64 = 10;
pub const SYNC_PAGE_SIZE: usize = 100;
