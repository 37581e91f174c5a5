//! Port interfaces for sync and signal operations
//!
//! The code-host client and entity stores are infrastructure concerns;
//! the core depends only on these contracts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repopulse_domain::{
    Contributor, Issue, IssueUpsert, NewContributor, NewRepository, NewStatsSnapshot, PullRequest,
    PullRequestUpsert, Repository, Result, StatsSnapshot, SyncBegin, SyncStatus,
};
use serde::{Deserialize, Serialize};

/* -------------------------------------------------------------------------- */
/* Remote item shapes                                                         */
/* -------------------------------------------------------------------------- */

/// Repository metadata as returned by the code host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub owner_login: String,
    pub html_url: String,
    pub description: Option<String>,
    /// The host's combined open count; trusted counts come from the
    /// search queries instead.
    pub open_issues_count: i64,
}

/// Account attribution on a remote item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub id: i64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

/// One pull request from the host's listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePullRequest {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub author: RemoteAccount,
}

/// One issue from the host's listing endpoint (PR-shaped rows excluded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteIssue {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub comments_count: i64,
    pub author: RemoteAccount,
}

/// One review on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteReview {
    pub submitted_at: Option<DateTime<Utc>>,
}

/// One comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteComment {
    pub author_login: String,
    pub created_at: DateTime<Utc>,
}

/* -------------------------------------------------------------------------- */
/* Client port                                                                */
/* -------------------------------------------------------------------------- */

/// Contract of the external code-hosting API.
///
/// Implementations surface rate-limit and transport failures as the one
/// opaque `Upstream` error kind; the core never interprets partial
/// responses.
#[async_trait]
pub trait CodeHostClient: Send + Sync {
    /// Fetch repository metadata.
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RemoteRepository>;

    /// Fetch up to 100 most-recently-updated pull requests in `state`.
    async fn get_pull_requests(
        &self,
        owner: &str,
        name: &str,
        state: &str,
    ) -> Result<Vec<RemotePullRequest>>;

    /// Fetch up to 100 most-recently-updated issues in `state`.
    async fn get_issues(&self, owner: &str, name: &str, state: &str) -> Result<Vec<RemoteIssue>>;

    /// Fetch the reviews of one pull request.
    async fn get_pr_reviews(
        &self,
        owner: &str,
        name: &str,
        number: i64,
    ) -> Result<Vec<RemoteReview>>;

    /// Fetch the comments of one issue.
    async fn get_issue_comments(
        &self,
        owner: &str,
        name: &str,
        number: i64,
    ) -> Result<Vec<RemoteComment>>;

    /// Run a search-style count query, returning the total match count.
    async fn search_issue_count(&self, query: &str) -> Result<i64>;
}

/* -------------------------------------------------------------------------- */
/* Store ports                                                                */
/* -------------------------------------------------------------------------- */

/// Repository row persistence.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Repository>>;

    async fn find_by_external_id(&self, external_id: i64) -> Result<Option<Repository>>;

    async fn find_by_owner_and_name(&self, owner: &str, name: &str)
        -> Result<Option<Repository>>;

    /// Insert a new repository row with status `queued` and zeroed
    /// progress counters.
    async fn create(&self, new: &NewRepository) -> Result<Repository>;

    /// Commit a run header: refreshed metadata, trusted open counts,
    /// status `syncing`, `total_items`, and a reset item counter. Returns
    /// the updated projection.
    async fn begin_sync(&self, id: i64, begin: &SyncBegin) -> Result<Repository>;

    /// Persist the coalesced progress counter. Implementations reject
    /// decreasing counters and counters above the run total.
    async fn update_progress(&self, id: i64, item_count: i64) -> Result<()>;

    /// Transition the sync status, enforcing the forward-only rule.
    async fn update_status(&self, id: i64, status: SyncStatus) -> Result<()>;

    /// Terminal success: force the counter to the run total, set status
    /// `completed`, and stamp `last_synced_at`.
    async fn mark_sync_complete(&self, id: i64, completed_at: DateTime<Utc>) -> Result<()>;
}

/// Contributor row persistence.
#[async_trait]
pub trait ContributorStore: Send + Sync {
    async fn find_by_external_id(&self, external_id: i64) -> Result<Option<Contributor>>;

    /// Insert if absent by external id; returns the stored row either way.
    async fn get_or_create(&self, new: &NewContributor) -> Result<Contributor>;

    /// Distinct authors of the repository's PRs and issues.
    async fn list_for_repository(&self, repository_id: i64) -> Result<Vec<Contributor>>;
}

/// Pull request row persistence.
#[async_trait]
pub trait PullRequestStore: Send + Sync {
    /// Create-or-overwrite by external id. Mutable fields are last-write-
    /// wins; `repository_id` is never reassigned on conflict.
    async fn upsert(&self, upsert: &PullRequestUpsert) -> Result<()>;

    async fn list_for_repository(&self, repository_id: i64) -> Result<Vec<PullRequest>>;

    async fn count_for_repository(&self, repository_id: i64) -> Result<i64>;
}

/// Issue row persistence.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Create-or-overwrite by external id. Mutable fields are last-write-
    /// wins; `repository_id` is never reassigned on conflict.
    async fn upsert(&self, upsert: &IssueUpsert) -> Result<()>;

    async fn list_for_repository(&self, repository_id: i64) -> Result<Vec<Issue>>;

    async fn count_for_repository(&self, repository_id: i64) -> Result<i64>;
}

/// Append-only stats snapshot persistence.
#[async_trait]
pub trait StatsSnapshotStore: Send + Sync {
    async fn append(&self, new: &NewStatsSnapshot) -> Result<StatsSnapshot>;

    async fn list_for_repository(&self, repository_id: i64) -> Result<Vec<StatsSnapshot>>;
}
