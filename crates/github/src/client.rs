//! HTTP client for the GitHub REST API, scoped to one repository.

use reqwest::StatusCode;
use serde_json::json;

use crate::models::{Issue, PullRequest, PullRequestFile};

const GITHUB_API_BASE: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;

/// Errors from GitHub API calls.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status.
    #[error("GitHub API error ({status}): {body}")]
    Api { status: StatusCode, body: String },
}

/// Client for one repository's issues and pull requests.
///
/// Requests are authenticated with a bearer token when one is
/// configured; without a token, reads still work against public
/// repositories at a reduced rate limit.
pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
    repo: String,
    base_url: String,
}

impl GitHubClient {
    /// Create a client for `repo` (`owner/name` form).
    pub fn new(token: Option<String>, repo: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            repo,
            base_url: GITHUB_API_BASE.to_string(),
        }
    }

    /// Override the API base URL. Used by tests to point at a local
    /// server.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Repository this client is scoped to.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "issuepilot");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GitHubError::Api { status, body })
        }
    }

    // --- issues ------------------------------------------------------------

    /// Fetch a single issue by number.
    pub async fn get_issue(&self, issue_number: i64) -> Result<Issue, GitHubError> {
        let url = format!("{}/repos/{}/issues/{issue_number}", self.base_url, self.repo);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch open and closed issues for the repository.
    ///
    /// The endpoint also returns pull requests; callers filter them out
    /// via [`Issue::is_pull_request`].
    pub async fn list_issues(&self) -> Result<Vec<Issue>, GitHubError> {
        let mut issues = self.list_issues_with_state("open").await?;
        issues.extend(self.list_issues_with_state("closed").await?);
        Ok(issues)
    }

    async fn list_issues_with_state(&self, state: &str) -> Result<Vec<Issue>, GitHubError> {
        let url = format!("{}/repos/{}/issues", self.base_url, self.repo);
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&[("state", state), ("per_page", &PER_PAGE.to_string())])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    // --- labels ------------------------------------------------------------

    /// Add a label to an issue.
    pub async fn add_label(&self, issue_number: i64, label: &str) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/issues/{issue_number}/labels",
            self.base_url, self.repo
        );
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&json!({ "labels": [label] }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Remove a label from an issue. A 404 is tolerated since the label
    /// may never have been applied.
    pub async fn remove_label(&self, issue_number: i64, label: &str) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/issues/{issue_number}/labels/{label}",
            self.base_url, self.repo
        );
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    // --- pull requests -----------------------------------------------------

    /// Fetch a pull request summary by number.
    pub async fn get_pull_request(&self, pr_number: i64) -> Result<PullRequest, GitHubError> {
        let url = format!("{}/repos/{}/pulls/{pr_number}", self.base_url, self.repo);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch the files changed by a pull request.
    pub async fn get_pull_request_files(
        &self,
        pr_number: i64,
    ) -> Result<Vec<PullRequestFile>, GitHubError> {
        let url = format!(
            "{}/repos/{}/pulls/{pr_number}/files",
            self.base_url, self.repo
        );
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&[("per_page", &PER_PAGE.to_string())])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_payload_deserializes_and_flags_pull_requests() {
        let payload = r#"{
            "id": 1,
            "number": 42,
            "title": "Login broken",
            "body": "details",
            "state": "open",
            "labels": [{"name": "bug"}],
            "html_url": "https://github.com/octo/widgets/issues/42",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-02T00:00:00Z",
            "pull_request": {"url": "https://api.github.com/repos/octo/widgets/pulls/42"}
        }"#;
        let issue: Issue = serde_json::from_str(payload).unwrap();
        assert!(issue.is_pull_request());
        assert_eq!(issue.label_names(), vec!["bug"]);
    }

    #[test]
    fn plain_issue_is_not_a_pull_request() {
        let payload = r#"{
            "id": 2,
            "number": 7,
            "title": "A bug",
            "body": null,
            "state": "open",
            "html_url": "https://github.com/octo/widgets/issues/7",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "pull_request": null
        }"#;
        let issue: Issue = serde_json::from_str(payload).unwrap();
        assert!(!issue.is_pull_request());
        assert!(issue.labels.is_empty());
    }
}
