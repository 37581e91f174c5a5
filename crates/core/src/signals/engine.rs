//! Port-backed facade over the signal computations
//!
//! Loads the rows a report needs, resolves the contributor roster, and
//! delegates to the pure computation. Reports never trigger a sync; they
//! read whatever the last run left behind.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use repopulse_domain::{
    Contributor, ContributorsHealthReport, IssuesHealthReport, OverviewReport,
    PrBottlenecksReport, RepoPulseError, Repository, Result,
};
use tracing::debug;

use super::bots::BotPolicy;
use super::{contributors, issues, overview, pull_requests};
use crate::sync::ports::{ContributorStore, IssueStore, PullRequestStore, RepositoryStore};

/// Stateless read-side engine; every call recomputes from stored rows.
pub struct SignalEngine {
    repositories: Arc<dyn RepositoryStore>,
    contributors: Arc<dyn ContributorStore>,
    pull_requests: Arc<dyn PullRequestStore>,
    issues: Arc<dyn IssueStore>,
    bots: Arc<dyn BotPolicy>,
}

impl SignalEngine {
    pub fn new(
        repositories: Arc<dyn RepositoryStore>,
        contributors: Arc<dyn ContributorStore>,
        pull_requests: Arc<dyn PullRequestStore>,
        issues: Arc<dyn IssueStore>,
        bots: Arc<dyn BotPolicy>,
    ) -> Self {
        Self { repositories, contributors, pull_requests, issues, bots }
    }

    pub async fn contributors_health(
        &self,
        repository_id: i64,
    ) -> Result<ContributorsHealthReport> {
        let repository = self.repository(repository_id).await?;
        let roster = self.roster(repository_id).await?;
        let prs = self.pull_requests.list_for_repository(repository_id).await?;
        let issue_rows = self.issues.list_for_repository(repository_id).await?;

        debug!(repository_id, prs = prs.len(), issues = issue_rows.len(), "contributor signals");
        let now = Utc::now();
        contributors::compute(
            &prs,
            &issue_rows,
            &roster,
            self.bots.as_ref(),
            repository.last_synced_at.unwrap_or(now),
            now,
        )
    }

    pub async fn pr_bottlenecks(&self, repository_id: i64) -> Result<PrBottlenecksReport> {
        let repository = self.repository(repository_id).await?;
        let roster = self.roster(repository_id).await?;
        let prs = self.pull_requests.list_for_repository(repository_id).await?;

        debug!(repository_id, prs = prs.len(), "pull request signals");
        pull_requests::compute(&repository, &prs, &roster, Utc::now())
    }

    pub async fn issues_health(&self, repository_id: i64) -> Result<IssuesHealthReport> {
        let repository = self.repository(repository_id).await?;
        let roster = self.roster(repository_id).await?;
        let issue_rows = self.issues.list_for_repository(repository_id).await?;

        debug!(repository_id, issues = issue_rows.len(), "issue signals");
        issues::compute(&repository, &issue_rows, &roster, Utc::now())
    }

    pub async fn overview(&self, repository_id: i64) -> Result<OverviewReport> {
        let repository = self.repository(repository_id).await?;
        let roster = self.roster(repository_id).await?;
        let prs = self.pull_requests.list_for_repository(repository_id).await?;
        let issue_rows = self.issues.list_for_repository(repository_id).await?;

        debug!(repository_id, "overview signals");
        overview::compute(
            &repository,
            &prs,
            &issue_rows,
            &roster,
            self.bots.as_ref(),
            Utc::now(),
        )
    }

    async fn repository(&self, repository_id: i64) -> Result<Repository> {
        self.repositories
            .find_by_id(repository_id)
            .await?
            .ok_or_else(|| RepoPulseError::NotFound(format!("repository {repository_id}")))
    }

    async fn roster(&self, repository_id: i64) -> Result<HashMap<i64, Contributor>> {
        let rows = self.contributors.list_for_repository(repository_id).await?;
        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use repopulse_domain::{
        Issue, IssueState, IssueUpsert, NewContributor, NewRepository, PullRequest,
        PullRequestState, PullRequestUpsert, ReviewState, SyncBegin, SyncStatus,
    };

    use super::super::bots::LoginBotPolicy;
    use super::*;

    struct FixedStores {
        repository: Option<Repository>,
        contributors: Vec<Contributor>,
        prs: Vec<PullRequest>,
        issues: Vec<Issue>,
    }

    #[async_trait]
    impl RepositoryStore for FixedStores {
        async fn find_by_id(&self, id: i64) -> Result<Option<Repository>> {
            Ok(self.repository.clone().filter(|r| r.id == id))
        }

        async fn find_by_external_id(&self, _external_id: i64) -> Result<Option<Repository>> {
            Ok(self.repository.clone())
        }

        async fn find_by_owner_and_name(
            &self,
            _owner: &str,
            _name: &str,
        ) -> Result<Option<Repository>> {
            Ok(self.repository.clone())
        }

        async fn create(&self, _new: &NewRepository) -> Result<Repository> {
            Err(RepoPulseError::Internal("read-only fixture".into()))
        }

        async fn begin_sync(&self, _id: i64, _begin: &SyncBegin) -> Result<Repository> {
            Err(RepoPulseError::Internal("read-only fixture".into()))
        }

        async fn update_progress(&self, _id: i64, _item_count: i64) -> Result<()> {
            Err(RepoPulseError::Internal("read-only fixture".into()))
        }

        async fn update_status(&self, _id: i64, _status: SyncStatus) -> Result<()> {
            Err(RepoPulseError::Internal("read-only fixture".into()))
        }

        async fn mark_sync_complete(
            &self,
            _id: i64,
            _completed_at: DateTime<Utc>,
        ) -> Result<()> {
            Err(RepoPulseError::Internal("read-only fixture".into()))
        }
    }

    #[async_trait]
    impl ContributorStore for FixedStores {
        async fn find_by_external_id(&self, external_id: i64) -> Result<Option<Contributor>> {
            Ok(self.contributors.iter().find(|c| c.external_id == external_id).cloned())
        }

        async fn get_or_create(&self, _new: &NewContributor) -> Result<Contributor> {
            Err(RepoPulseError::Internal("read-only fixture".into()))
        }

        async fn list_for_repository(&self, _repository_id: i64) -> Result<Vec<Contributor>> {
            Ok(self.contributors.clone())
        }
    }

    #[async_trait]
    impl PullRequestStore for FixedStores {
        async fn upsert(&self, _upsert: &PullRequestUpsert) -> Result<()> {
            Err(RepoPulseError::Internal("read-only fixture".into()))
        }

        async fn list_for_repository(&self, _repository_id: i64) -> Result<Vec<PullRequest>> {
            Ok(self.prs.clone())
        }

        async fn count_for_repository(&self, _repository_id: i64) -> Result<i64> {
            Ok(self.prs.len() as i64)
        }
    }

    #[async_trait]
    impl IssueStore for FixedStores {
        async fn upsert(&self, _upsert: &IssueUpsert) -> Result<()> {
            Err(RepoPulseError::Internal("read-only fixture".into()))
        }

        async fn list_for_repository(&self, _repository_id: i64) -> Result<Vec<Issue>> {
            Ok(self.issues.clone())
        }

        async fn count_for_repository(&self, _repository_id: i64) -> Result<i64> {
            Ok(self.issues.len() as i64)
        }
    }

    fn engine(stores: FixedStores) -> SignalEngine {
        let stores = Arc::new(stores);
        SignalEngine::new(
            stores.clone(),
            stores.clone(),
            stores.clone(),
            stores,
            Arc::new(LoginBotPolicy),
        )
    }

    fn repository() -> Repository {
        Repository {
            id: 1,
            external_id: 99,
            name: "signal".into(),
            full_name: "acme/signal".into(),
            owner: "acme".into(),
            url: "https://github.test/acme/signal".into(),
            description: None,
            open_prs_count: 1,
            open_issues_count: 1,
            sync_status: SyncStatus::Completed,
            sync_item_count: 2,
            sync_total_items: 2,
            last_synced_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn unknown_repository_is_not_found() {
        let engine = engine(FixedStores {
            repository: None,
            contributors: Vec::new(),
            prs: Vec::new(),
            issues: Vec::new(),
        });

        for result in [
            engine.overview(7).await.map(|_| ()),
            engine.contributors_health(7).await.map(|_| ()),
            engine.pr_bottlenecks(7).await.map(|_| ()),
            engine.issues_health(7).await.map(|_| ()),
        ] {
            assert!(matches!(result, Err(RepoPulseError::NotFound(_))));
        }
    }

    #[tokio::test]
    async fn dangling_author_reference_degrades_the_report() {
        let created = Utc::now() - Duration::days(1);
        let engine = engine(FixedStores {
            repository: Some(repository()),
            contributors: Vec::new(),
            prs: vec![PullRequest {
                id: 1,
                external_id: 1,
                number: 1,
                title: "pr".into(),
                state: PullRequestState::Open,
                created_at: created,
                updated_at: created,
                closed_at: None,
                merged_at: None,
                repository_id: 1,
                author_id: 42,
                reviews_count: 0,
                review: ReviewState::Unreviewed { wait_hours: 24.0 },
            }],
            issues: Vec::new(),
        });

        let err = engine.pr_bottlenecks(1).await.expect_err("must degrade");
        assert!(matches!(err, RepoPulseError::Computation(_)));
    }

    #[tokio::test]
    async fn empty_repository_yields_an_empty_but_valid_overview() {
        let engine = engine(FixedStores {
            repository: Some(repository()),
            contributors: Vec::new(),
            prs: Vec::new(),
            issues: Vec::new(),
        });

        let report = engine.overview(1).await.expect("report");
        assert_eq!(report.active_contributors, 0);
        assert_eq!(report.open_prs, 0);
        assert_eq!(report.median_review_label, "N/A");
        assert_eq!(report.activity_trend.weeks.len(), 5);

        let contributors = engine.contributors_health(1).await.expect("report");
        assert_eq!(contributors.summary.active, 0);
        assert_eq!(contributors.first_time_experience.median_hours, 0.0);

        let issues = engine.issues_health(1).await.expect("report");
        assert_eq!(issues.summary.median_first_response_hours, None);
    }

    #[tokio::test]
    async fn bot_policy_is_pluggable() {
        struct DenyAll;
        impl BotPolicy for DenyAll {
            fn is_bot(&self, _login: &str) -> bool {
                true
            }
        }

        let created = Utc::now() - Duration::days(1);
        let stores = Arc::new(FixedStores {
            repository: Some(repository()),
            contributors: vec![Contributor {
                id: 1,
                external_id: 10,
                login: "alice".into(),
                avatar_url: String::new(),
                html_url: String::new(),
            }],
            prs: Vec::new(),
            issues: vec![Issue {
                id: 1,
                external_id: 1,
                number: 1,
                title: "issue".into(),
                state: IssueState::Open,
                created_at: created,
                updated_at: created,
                closed_at: None,
                repository_id: 1,
                author_id: 1,
                comments_count: 0,
                has_maintainer_response: false,
                time_to_first_response: None,
            }],
        });

        let engine = SignalEngine::new(
            stores.clone(),
            stores.clone(),
            stores.clone(),
            stores,
            Arc::new(DenyAll),
        );

        let report = engine.contributors_health(1).await.expect("report");
        assert_eq!(report.summary.active, 0);
        assert!(report.active_contributors.is_empty());
    }
}
