//! Persisted entity types
//!
//! One struct per stored row. External ids are the idempotency keys
//! assigned by the code host; local ids are SQLite rowids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{RepoPulseError, Result};

/* -------------------------------------------------------------------------- */
/* Repository                                                                 */
/* -------------------------------------------------------------------------- */

/// Synchronization status of a tracked repository.
///
/// Transitions are forward-only within a run: `Queued -> Syncing ->
/// Completed | Failed`. A terminal status may start over when a new run is
/// triggered, but a status never regresses mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Queued,
    Syncing,
    Completed,
    Failed,
}

impl SyncStatus {
    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Queued, Self::Syncing | Self::Failed) => true,
            (Self::Syncing, Self::Completed | Self::Failed) => true,
            // A finished run may be restarted by a new trigger.
            (Self::Completed | Self::Failed, Self::Queued | Self::Syncing) => true,
            _ => false,
        }
    }

    /// Stable string form used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Syncing => "syncing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the stored string form.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "queued" => Ok(Self::Queued),
            "syncing" => Ok(Self::Syncing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(RepoPulseError::InvalidInput(format!("unknown sync status: {other}"))),
        }
    }
}

/// A tracked repository with trusted open counts and sync progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub external_id: i64,
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub url: String,
    pub description: Option<String>,
    /// Trusted open totals from the host's search API (for large repos the
    /// item sync only covers the most recent page).
    pub open_prs_count: i64,
    pub open_issues_count: i64,
    pub sync_status: SyncStatus,
    /// Items processed so far in the current run; never exceeds
    /// `sync_total_items` and never decreases within a run.
    pub sync_item_count: i64,
    pub sync_total_items: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Insert payload for a repository row.
#[derive(Debug, Clone)]
pub struct NewRepository {
    pub external_id: i64,
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub url: String,
    pub description: Option<String>,
}

/// Metadata and counts committed when a sync run begins.
#[derive(Debug, Clone)]
pub struct SyncBegin {
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub url: String,
    pub description: Option<String>,
    pub open_prs_count: i64,
    pub open_issues_count: i64,
}

impl SyncBegin {
    /// Total items the run will attempt to process.
    pub fn total_items(&self) -> i64 {
        self.open_prs_count + self.open_issues_count
    }
}

/* -------------------------------------------------------------------------- */
/* Contributor                                                                */
/* -------------------------------------------------------------------------- */

/// An account that authored pull requests or issues.
///
/// No explicit bot flag is stored; bot-ness is inferred by the signal
/// engine via a login-pattern predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub id: i64,
    pub external_id: i64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

/// Insert payload for a contributor row.
#[derive(Debug, Clone)]
pub struct NewContributor {
    pub external_id: i64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

/* -------------------------------------------------------------------------- */
/* Pull request                                                               */
/* -------------------------------------------------------------------------- */

/// Pull request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl PullRequestState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "merged" => Ok(Self::Merged),
            other => {
                Err(RepoPulseError::InvalidInput(format!("unknown pull request state: {other}")))
            }
        }
    }
}

/// Review progress of a pull request.
///
/// Exactly one of the two latency figures exists at any instant, so the
/// pair is modeled as a tagged variant rather than two nullable fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewState {
    /// No review yet; `wait_hours` is the time since creation measured at
    /// the last sync.
    Unreviewed { wait_hours: f64 },
    /// Reviewed; `latency_hours` is creation to earliest review.
    Reviewed { latency_hours: f64 },
}

impl ReviewState {
    pub fn has_review(self) -> bool {
        matches!(self, Self::Reviewed { .. })
    }

    /// Recorded review latency, when reviewed.
    pub fn latency_hours(self) -> Option<f64> {
        match self {
            Self::Reviewed { latency_hours } => Some(latency_hours),
            Self::Unreviewed { .. } => None,
        }
    }

    /// Current review wait, when unreviewed.
    pub fn wait_hours(self) -> Option<f64> {
        match self {
            Self::Unreviewed { wait_hours } => Some(wait_hours),
            Self::Reviewed { .. } => None,
        }
    }
}

/// A synced pull request snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    pub external_id: i64,
    pub number: i64,
    pub title: String,
    pub state: PullRequestState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Immutable once assigned.
    pub repository_id: i64,
    pub author_id: i64,
    pub reviews_count: i64,
    pub review: ReviewState,
}

/// Upsert payload for a pull request, keyed by external id.
#[derive(Debug, Clone)]
pub struct PullRequestUpsert {
    pub external_id: i64,
    pub number: i64,
    pub title: String,
    pub state: PullRequestState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub repository_id: i64,
    pub author_id: i64,
    pub reviews_count: i64,
    pub review: ReviewState,
}

/* -------------------------------------------------------------------------- */
/* Issue                                                                      */
/* -------------------------------------------------------------------------- */

/// Issue lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(RepoPulseError::InvalidInput(format!("unknown issue state: {other}"))),
        }
    }
}

/// A synced issue snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub external_id: i64,
    pub number: i64,
    pub title: String,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Immutable once assigned.
    pub repository_id: i64,
    pub author_id: i64,
    pub comments_count: i64,
    /// True iff any fetched comment author differs from the issue author
    /// login. A commenter-identity heuristic, not a resolved role.
    pub has_maintainer_response: bool,
    /// Hours from creation to the earliest qualifying comment.
    pub time_to_first_response: Option<f64>,
}

/// Upsert payload for an issue, keyed by external id.
#[derive(Debug, Clone)]
pub struct IssueUpsert {
    pub external_id: i64,
    pub number: i64,
    pub title: String,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub repository_id: i64,
    pub author_id: i64,
    pub comments_count: i64,
    pub has_maintainer_response: bool,
    pub time_to_first_response: Option<f64>,
}

/* -------------------------------------------------------------------------- */
/* Stats snapshot                                                             */
/* -------------------------------------------------------------------------- */

/// Point-in-time counters appended once per completed sync run.
///
/// Append-only; rows are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub id: i64,
    pub repository_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub active_prs: i64,
    pub active_issues: i64,
}

/// Insert payload for a stats snapshot row.
#[derive(Debug, Clone)]
pub struct NewStatsSnapshot {
    pub repository_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub active_prs: i64,
    pub active_issues: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_status_transitions_are_forward_only() {
        assert!(SyncStatus::Queued.can_transition_to(SyncStatus::Syncing));
        assert!(SyncStatus::Syncing.can_transition_to(SyncStatus::Completed));
        assert!(SyncStatus::Syncing.can_transition_to(SyncStatus::Failed));
        assert!(SyncStatus::Completed.can_transition_to(SyncStatus::Syncing));
        assert!(SyncStatus::Failed.can_transition_to(SyncStatus::Syncing));

        assert!(!SyncStatus::Syncing.can_transition_to(SyncStatus::Queued));
        assert!(!SyncStatus::Completed.can_transition_to(SyncStatus::Failed));
        assert!(!SyncStatus::Queued.can_transition_to(SyncStatus::Completed));
        assert!(!SyncStatus::Syncing.can_transition_to(SyncStatus::Syncing));
    }

    #[test]
    fn sync_status_round_trips_through_storage_form() {
        for status in
            [SyncStatus::Queued, SyncStatus::Syncing, SyncStatus::Completed, SyncStatus::Failed]
        {
            assert_eq!(SyncStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SyncStatus::parse("unknown").is_err());
    }

    #[test]
    fn review_state_is_mutually_exclusive() {
        let unreviewed = ReviewState::Unreviewed { wait_hours: 12.0 };
        assert!(!unreviewed.has_review());
        assert_eq!(unreviewed.wait_hours(), Some(12.0));
        assert_eq!(unreviewed.latency_hours(), None);

        let reviewed = ReviewState::Reviewed { latency_hours: 4.5 };
        assert!(reviewed.has_review());
        assert_eq!(reviewed.latency_hours(), Some(4.5));
        assert_eq!(reviewed.wait_hours(), None);
    }

    #[test]
    fn sync_begin_totals_open_counts() {
        let begin = SyncBegin {
            name: "repo".into(),
            full_name: "owner/repo".into(),
            owner: "owner".into(),
            url: "https://github.com/owner/repo".into(),
            description: None,
            open_prs_count: 12,
            open_issues_count: 30,
        };
        assert_eq!(begin.total_items(), 42);
    }
}
