//! Wire shapes of the GitHub v3 JSON API
//!
//! Only the fields the sync pipeline reads are declared; everything else
//! in the payload is ignored.

use chrono::{DateTime, Utc};
use repopulse_core::sync::ports::{
    RemoteAccount, RemoteComment, RemoteIssue, RemotePullRequest, RemoteRepository, RemoteReview,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAccount {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
}

impl From<ApiAccount> for RemoteAccount {
    fn from(account: ApiAccount) -> Self {
        Self {
            id: account.id,
            login: account.login,
            avatar_url: account.avatar_url,
            html_url: account.html_url,
        }
    }
}

/// Deleted accounts arrive as null; the ghost stand-in has an empty login,
/// which the bot policy already screens out of contributor signals.
pub(super) fn account_or_ghost(account: Option<ApiAccount>) -> RemoteAccount {
    account.map_or_else(
        || RemoteAccount {
            id: -1,
            login: String::new(),
            avatar_url: String::new(),
            html_url: String::new(),
        },
        RemoteAccount::from,
    )
}

#[derive(Debug, Deserialize)]
pub struct ApiRepository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub open_issues_count: i64,
    pub owner: ApiAccount,
}

impl From<ApiRepository> for RemoteRepository {
    fn from(repo: ApiRepository) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            owner_login: repo.owner.login,
            html_url: repo.html_url,
            description: repo.description,
            open_issues_count: repo.open_issues_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiPullRequest {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub user: Option<ApiAccount>,
}

impl From<ApiPullRequest> for RemotePullRequest {
    fn from(pr: ApiPullRequest) -> Self {
        Self {
            id: pr.id,
            number: pr.number,
            title: pr.title,
            state: pr.state,
            created_at: pr.created_at,
            updated_at: pr.updated_at,
            closed_at: pr.closed_at,
            merged_at: pr.merged_at,
            author: account_or_ghost(pr.user),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiIssue {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: i64,
    pub user: Option<ApiAccount>,
    /// Present on PR-shaped rows in the issues listing; those rows are
    /// filtered out before conversion.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl ApiIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl From<ApiIssue> for RemoteIssue {
    fn from(issue: ApiIssue) -> Self {
        Self {
            id: issue.id,
            number: issue.number,
            title: issue.title,
            state: issue.state,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            closed_at: issue.closed_at,
            comments_count: issue.comments,
            author: account_or_ghost(issue.user),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiReview {
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<ApiReview> for RemoteReview {
    fn from(review: ApiReview) -> Self {
        Self { submitted_at: review.submitted_at }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiComment {
    pub user: Option<ApiAccount>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiComment> for RemoteComment {
    fn from(comment: ApiComment) -> Self {
        Self {
            author_login: comment.user.map(|u| u.login).unwrap_or_default(),
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiSearchResult {
    pub total_count: i64,
}
