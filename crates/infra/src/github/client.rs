//! Reqwest-backed GitHub client

use std::time::Duration;

use async_trait::async_trait;
use repopulse_core::sync::ports::{
    RemoteComment, RemoteIssue, RemotePullRequest, RemoteRepository, RemoteReview,
};
use repopulse_core::CodeHostClient;
use repopulse_domain::constants::SYNC_PAGE_SIZE;
use repopulse_domain::{GithubConfig, RepoPulseError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{ApiComment, ApiIssue, ApiPullRequest, ApiRepository, ApiReview, ApiSearchResult};
use crate::errors::InfraError;

const USER_AGENT: &str = concat!("repopulse/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";

/// GitHub v3 API client. One instance is shared across all sync runs.
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        if config.token.is_none() {
            warn!("no github token configured; unauthenticated rate limits apply");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(InfraError::from)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "github request");

        let mut request = self.http.get(&url).header(ACCEPT, ACCEPT_JSON);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(InfraError::from)?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%url, %status, "github rate limit hit");
            return Err(RepoPulseError::Upstream(format!(
                "github rate limit exceeded (status {status})"
            )));
        }
        if !status.is_success() {
            return Err(RepoPulseError::Upstream(format!(
                "github returned status {status} for {path}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| RepoPulseError::Upstream(format!("malformed github payload: {err}")))
    }
}

#[async_trait]
impl CodeHostClient for GithubClient {
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RemoteRepository> {
        let repo: ApiRepository = self.get_json(&format!("/repos/{owner}/{name}"), &[]).await?;
        Ok(repo.into())
    }

    async fn get_pull_requests(
        &self,
        owner: &str,
        name: &str,
        state: &str,
    ) -> Result<Vec<RemotePullRequest>> {
        // One page of the most recently updated PRs.
        let page_size = SYNC_PAGE_SIZE.to_string();
        let prs: Vec<ApiPullRequest> = self
            .get_json(
                &format!("/repos/{owner}/{name}/pulls"),
                &[
                    ("state", state),
                    ("per_page", &page_size),
                    ("sort", "updated"),
                    ("direction", "desc"),
                ],
            )
            .await?;
        Ok(prs.into_iter().map(Into::into).collect())
    }

    async fn get_issues(&self, owner: &str, name: &str, state: &str) -> Result<Vec<RemoteIssue>> {
        // The issues listing includes PR-shaped rows; drop them here.
        let page_size = SYNC_PAGE_SIZE.to_string();
        let issues: Vec<ApiIssue> = self
            .get_json(
                &format!("/repos/{owner}/{name}/issues"),
                &[
                    ("state", state),
                    ("per_page", &page_size),
                    ("sort", "updated"),
                    ("direction", "desc"),
                ],
            )
            .await?;
        Ok(issues.into_iter().filter(|i| !i.is_pull_request()).map(Into::into).collect())
    }

    async fn get_pr_reviews(
        &self,
        owner: &str,
        name: &str,
        number: i64,
    ) -> Result<Vec<RemoteReview>> {
        let reviews: Vec<ApiReview> =
            self.get_json(&format!("/repos/{owner}/{name}/pulls/{number}/reviews"), &[]).await?;
        Ok(reviews.into_iter().map(Into::into).collect())
    }

    async fn get_issue_comments(
        &self,
        owner: &str,
        name: &str,
        number: i64,
    ) -> Result<Vec<RemoteComment>> {
        let comments: Vec<ApiComment> =
            self.get_json(&format!("/repos/{owner}/{name}/issues/{number}/comments"), &[]).await?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    async fn search_issue_count(&self, query: &str) -> Result<i64> {
        let result: ApiSearchResult =
            self.get_json("/search/issues", &[("q", query), ("per_page", "1")]).await?;
        Ok(result.total_count)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer, token: Option<&str>) -> GithubClient {
        GithubClient::new(&GithubConfig {
            token: token.map(str::to_string),
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .expect("client")
    }

    #[tokio::test]
    async fn repository_fetch_sends_token_and_accept_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/signal"))
            .and(header("authorization", "token secret"))
            .and(header("accept", ACCEPT_JSON))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 99,
                "name": "signal",
                "full_name": "acme/signal",
                "html_url": "https://github.test/acme/signal",
                "description": "dashboard",
                "open_issues_count": 7,
                "owner": {"id": 1, "login": "acme"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret")).await;
        let repo = client.get_repository("acme", "signal").await.expect("repository");

        assert_eq!(repo.id, 99);
        assert_eq!(repo.owner_login, "acme");
        assert_eq!(repo.open_issues_count, 7);
    }

    #[tokio::test]
    async fn issue_listing_drops_pr_shaped_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/signal/issues"))
            .and(query_param("state", "open"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1, "number": 10, "title": "real issue", "state": "open",
                    "created_at": "2025-06-01T00:00:00Z",
                    "updated_at": "2025-06-01T00:00:00Z",
                    "closed_at": null, "comments": 2,
                    "user": {"id": 5, "login": "alice"}
                },
                {
                    "id": 2, "number": 11, "title": "hidden pr", "state": "open",
                    "created_at": "2025-06-01T00:00:00Z",
                    "updated_at": "2025-06-01T00:00:00Z",
                    "closed_at": null, "comments": 0,
                    "user": {"id": 5, "login": "alice"},
                    "pull_request": {"url": "https://api.github.test/pulls/11"}
                }
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let issues = client.get_issues("acme", "signal", "open").await.expect("issues");

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "real issue");
        assert_eq!(issues[0].comments_count, 2);
    }

    #[tokio::test]
    async fn search_count_returns_the_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("q", "repo:acme/signal is:pr is:open"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"total_count": 42, "items": []})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let count =
            client.search_issue_count("repo:acme/signal is:pr is:open").await.expect("count");
        assert_eq!(count, 42);
    }

    #[tokio::test]
    async fn rate_limit_surfaces_as_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/signal"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "API rate limit exceeded"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let err = client.get_repository("acme", "signal").await.expect_err("must fail");
        assert!(matches!(err, RepoPulseError::Upstream(_)));
    }

    #[tokio::test]
    async fn not_found_surfaces_as_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let err = client.get_repository("acme", "missing").await.expect_err("must fail");
        assert!(matches!(err, RepoPulseError::Upstream(_)));
    }

    #[tokio::test]
    async fn reviews_without_timestamps_deserialize() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/signal/pulls/7/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"submitted_at": "2025-06-02T10:00:00Z"},
                {"submitted_at": null}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let reviews = client.get_pr_reviews("acme", "signal", 7).await.expect("reviews");

        assert_eq!(reviews.len(), 2);
        assert!(reviews[0].submitted_at.is_some());
        assert!(reviews[1].submitted_at.is_none());
    }
}
