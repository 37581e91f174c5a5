//! Sync pipeline orchestration
//!
//! `init_sync` is the foreground stage: metadata and trusted open counts
//! are fetched concurrently, the run header is committed, and the updated
//! repository projection is returned without waiting for item sync.
//! `execute_sync` is the background stage: it fetches the most recent open
//! items, upserts each one under a fixed admission limit, and coalesces
//! progress commits. A failed run keeps every row committed so far; there
//! is no per-run rollback.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use repopulse_domain::{
    IssueState, IssueUpsert, NewRepository, NewStatsSnapshot, PullRequestState, PullRequestUpsert,
    RepoPulseError, Repository, Result, ReviewState, SyncBegin, SyncConfig, SyncStatus,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::contributor_cache::ContributorCache;
use super::ports::{
    CodeHostClient, ContributorStore, IssueStore, PullRequestStore, RemoteIssue,
    RemotePullRequest, RemoteReview, RepositoryStore, StatsSnapshotStore,
};

/// Handle to a background sync run.
///
/// Carries the repository id, a cancellation token, and the join handle of
/// the spawned task. Cancellation aborts between items; the run is then
/// recorded as failed and rows already committed are kept.
pub struct SyncHandle {
    repository_id: i64,
    cancellation: CancellationToken,
    join: JoinHandle<Result<()>>,
}

impl SyncHandle {
    pub fn repository_id(&self) -> i64 {
        self.repository_id
    }

    /// Request cancellation of the run.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to finish and return its outcome.
    pub async fn join(self) -> Result<()> {
        self.join
            .await
            .map_err(|err| RepoPulseError::Internal(format!("sync task failed: {err}")))?
    }
}

/// Registry of repositories with a sync run in flight.
///
/// Overlapping runs for one repository would race on the same rows, so a
/// second trigger fails fast with `Conflict` instead of queueing.
#[derive(Clone, Default)]
struct RunRegistry {
    inner: Arc<Mutex<HashSet<i64>>>,
}

impl RunRegistry {
    fn acquire(&self, repository_id: i64) -> Option<RunGuard> {
        let mut active = self.inner.lock();
        if !active.insert(repository_id) {
            return None;
        }
        Some(RunGuard { registry: Arc::clone(&self.inner), repository_id })
    }
}

struct RunGuard {
    registry: Arc<Mutex<HashSet<i64>>>,
    repository_id: i64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.repository_id);
    }
}

/// Tracks completed items and decides when to persist the counter.
struct ProgressTracker {
    completed: i64,
    interval: u64,
}

impl ProgressTracker {
    fn new(interval: u64) -> Self {
        Self { completed: 0, interval: interval.max(1) }
    }

    /// Record one completed item; returns true when a commit is due.
    fn record(&mut self) -> bool {
        self.completed += 1;
        self.completed as u64 % self.interval == 0
    }
}

/// Two-stage synchronization service over the client and store ports.
pub struct SyncService {
    client: Arc<dyn CodeHostClient>,
    repositories: Arc<dyn RepositoryStore>,
    contributors: Arc<dyn ContributorStore>,
    pull_requests: Arc<dyn PullRequestStore>,
    issues: Arc<dyn IssueStore>,
    snapshots: Arc<dyn StatsSnapshotStore>,
    config: SyncConfig,
    runs: RunRegistry,
}

impl SyncService {
    pub fn new(
        client: Arc<dyn CodeHostClient>,
        repositories: Arc<dyn RepositoryStore>,
        contributors: Arc<dyn ContributorStore>,
        pull_requests: Arc<dyn PullRequestStore>,
        issues: Arc<dyn IssueStore>,
        snapshots: Arc<dyn StatsSnapshotStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            client,
            repositories,
            contributors,
            pull_requests,
            issues,
            snapshots,
            config,
            runs: RunRegistry::default(),
        }
    }

    /// Foreground stage: fetch metadata and trusted open counts, commit the
    /// run header, and return the updated projection immediately.
    ///
    /// An upstream failure aborts the attempt and leaves the stored row at
    /// its prior status; recovery is caller-initiated re-sync.
    pub async fn init_sync(&self, owner: &str, name: &str) -> Result<Repository> {
        let pr_query = format!("repo:{owner}/{name} is:pr is:open");
        let issue_query = format!("repo:{owner}/{name} is:issue is:open");

        let (meta, open_prs, open_issues) = tokio::try_join!(
            self.client.get_repository(owner, name),
            self.client.search_issue_count(&pr_query),
            self.client.search_issue_count(&issue_query),
        )?;

        let repository = match self.repositories.find_by_external_id(meta.id).await? {
            Some(existing) => existing,
            None => {
                self.repositories
                    .create(&NewRepository {
                        external_id: meta.id,
                        name: meta.name.clone(),
                        full_name: meta.full_name.clone(),
                        owner: meta.owner_login.clone(),
                        url: meta.html_url.clone(),
                        description: meta.description.clone(),
                    })
                    .await?
            }
        };

        let begin = SyncBegin {
            name: meta.name,
            full_name: meta.full_name,
            owner: meta.owner_login,
            url: meta.html_url,
            description: meta.description,
            open_prs_count: open_prs,
            open_issues_count: open_issues,
        };

        let updated = self.repositories.begin_sync(repository.id, &begin).await?;

        info!(
            repository = %updated.full_name,
            open_prs = open_prs,
            open_issues = open_issues,
            total_items = updated.sync_total_items,
            "sync run initialised"
        );

        Ok(updated)
    }

    /// Spawn the background stage, returning an explicit task handle.
    pub fn spawn(self: &Arc<Self>, repository_id: i64, owner: &str, name: &str) -> SyncHandle {
        let cancellation = CancellationToken::new();
        let token = cancellation.clone();
        let service = Arc::clone(self);
        let owner = owner.to_string();
        let name = name.to_string();

        let join = tokio::spawn(async move {
            service.execute_sync(repository_id, &owner, &name, &token).await
        });

        SyncHandle { repository_id, cancellation, join }
    }

    /// Background stage: fetch the most recent open items and upsert each
    /// one with bounded concurrency.
    ///
    /// Any unhandled error flips the status to failed and halts; rows
    /// already committed in the run remain valid to-date state.
    pub async fn execute_sync(
        &self,
        repository_id: i64,
        owner: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _guard = self.runs.acquire(repository_id).ok_or_else(|| {
            RepoPulseError::Conflict(format!(
                "sync already running for repository {repository_id}"
            ))
        })?;

        match self.run_items(repository_id, owner, name, cancel).await {
            Ok(()) => {
                info!(repository_id, "sync run completed");
                Ok(())
            }
            Err(err) => {
                error!(repository_id, error = %err, "sync run failed");
                if let Err(status_err) =
                    self.repositories.update_status(repository_id, SyncStatus::Failed).await
                {
                    warn!(repository_id, error = %status_err, "failed to record failed status");
                }
                Err(err)
            }
        }
    }

    async fn run_items(
        &self,
        repository_id: i64,
        owner: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let repository = self
            .repositories
            .find_by_id(repository_id)
            .await?
            .ok_or_else(|| RepoPulseError::NotFound(format!("repository {repository_id}")))?;

        let cache = ContributorCache::new(Arc::clone(&self.contributors));
        let mut progress = ProgressTracker::new(self.config.progress_commit_interval);
        let concurrency = self.config.concurrency_limit.max(1);

        let prs = self.client.get_pull_requests(owner, name, "open").await?;
        debug!(repository_id, count = prs.len(), "fetched open pull requests");
        {
            let stream = futures::stream::iter(prs.into_iter().map(|pr| {
                let cache = &cache;
                let repository = &repository;
                async move { self.upsert_pull_request(repository, owner, name, pr, cache).await }
            }))
            .buffer_unordered(concurrency);
            self.drive(stream, repository_id, &mut progress, cancel).await?;
        }

        let issues = self.client.get_issues(owner, name, "open").await?;
        debug!(repository_id, count = issues.len(), "fetched open issues");
        {
            let stream = futures::stream::iter(issues.into_iter().map(|issue| {
                let cache = &cache;
                let repository = &repository;
                async move { self.upsert_issue(repository, owner, name, issue, cache).await }
            }))
            .buffer_unordered(concurrency);
            self.drive(stream, repository_id, &mut progress, cancel).await?;
        }

        // Final commit corrects the coalesced counter to the true total.
        self.repositories.mark_sync_complete(repository_id, Utc::now()).await?;

        self.snapshots
            .append(&NewStatsSnapshot {
                repository_id,
                recorded_at: Utc::now(),
                active_prs: repository.open_prs_count,
                active_issues: repository.open_issues_count,
            })
            .await?;

        Ok(())
    }

    /// Drain one bounded-concurrency batch, committing coalesced progress.
    ///
    /// The first item error (or cancellation) drops the stream, aborting
    /// the remaining in-flight items of the batch.
    async fn drive<S>(
        &self,
        mut stream: S,
        repository_id: i64,
        progress: &mut ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        S: Stream<Item = Result<()>> + Unpin,
    {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    return Err(RepoPulseError::Internal("sync run cancelled".into()));
                }
                next = stream.next() => {
                    match next {
                        Some(item) => {
                            item?;
                            if progress.record() {
                                self.repositories
                                    .update_progress(repository_id, progress.completed)
                                    .await?;
                            }
                        }
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn upsert_pull_request(
        &self,
        repository: &Repository,
        owner: &str,
        name: &str,
        pr: RemotePullRequest,
        cache: &ContributorCache,
    ) -> Result<()> {
        let author_id = cache.resolve(&pr.author).await?;
        let reviews = self.client.get_pr_reviews(owner, name, pr.number).await?;
        let review = review_state(&reviews, pr.created_at, Utc::now());

        let state = pull_request_state(&pr.state, pr.merged_at.is_some())?;

        self.pull_requests
            .upsert(&PullRequestUpsert {
                external_id: pr.id,
                number: pr.number,
                title: pr.title,
                state,
                created_at: pr.created_at,
                updated_at: pr.updated_at,
                closed_at: pr.closed_at,
                merged_at: pr.merged_at,
                repository_id: repository.id,
                author_id,
                reviews_count: reviews.len() as i64,
                review,
            })
            .await
    }

    async fn upsert_issue(
        &self,
        repository: &Repository,
        owner: &str,
        name: &str,
        issue: RemoteIssue,
        cache: &ContributorCache,
    ) -> Result<()> {
        let author_id = cache.resolve(&issue.author).await?;

        let (has_maintainer_response, time_to_first_response) = if issue.comments_count > 0 {
            let comments = self.client.get_issue_comments(owner, name, issue.number).await?;
            let earliest = comments
                .iter()
                .filter(|comment| comment.author_login != issue.author.login)
                .map(|comment| comment.created_at)
                .min();
            match earliest {
                Some(at) => (true, Some(hours_between(issue.created_at, at))),
                None => (false, None),
            }
        } else {
            (false, None)
        };

        self.issues
            .upsert(&IssueUpsert {
                external_id: issue.id,
                number: issue.number,
                title: issue.title,
                state: IssueState::parse(&issue.state)?,
                created_at: issue.created_at,
                updated_at: issue.updated_at,
                closed_at: issue.closed_at,
                repository_id: repository.id,
                author_id,
                comments_count: issue.comments_count,
                has_maintainer_response,
                time_to_first_response,
            })
            .await
    }
}

/// Derive the review state from fetched reviews.
///
/// Reviews without a submission timestamp cannot anchor a latency, so a
/// PR whose reviews all lack timestamps counts as unreviewed.
fn review_state(
    reviews: &[RemoteReview],
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ReviewState {
    let earliest = reviews.iter().filter_map(|review| review.submitted_at).min();
    match earliest {
        Some(at) => ReviewState::Reviewed { latency_hours: hours_between(created_at, at) },
        None => ReviewState::Unreviewed { wait_hours: hours_between(created_at, now) },
    }
}

fn pull_request_state(state: &str, merged: bool) -> Result<PullRequestState> {
    match state {
        "open" => Ok(PullRequestState::Open),
        "closed" if merged => Ok(PullRequestState::Merged),
        "closed" => Ok(PullRequestState::Closed),
        "merged" => Ok(PullRequestState::Merged),
        other => {
            Err(RepoPulseError::InvalidInput(format!("unknown pull request state: {other}")))
        }
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}
