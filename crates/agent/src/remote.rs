//! Remote execution provider over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::provider::{
    CreatedSession, ExecutionProvider, ProviderError, PullRequestRef, SessionSnapshot,
    SessionStatus,
};

const CREATE_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    session_id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionDetailsResponse {
    #[serde(default)]
    status_enum: String,
    pull_request: Option<WirePullRequest>,
}

#[derive(Debug, Deserialize)]
struct WirePullRequest {
    url: Option<String>,
}

/// Provider backed by a hosted coding-agent sessions API.
///
/// The remote service owns its own workspaces, so
/// [`cleanup_workspace`](ExecutionProvider::cleanup_workspace) is a
/// no-op here.
pub struct RemoteProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn bearer(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::Unconfigured(
                "API key not set. Configure AGENT_API_KEY or use the simulated provider."
                    .to_string(),
            )
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl ExecutionProvider for RemoteProvider {
    async fn create_session(
        &self,
        prompt: &str,
        title: &str,
        tags: &[String],
    ) -> Result<CreatedSession, ProviderError> {
        let key = self.bearer()?;
        let response = self
            .http
            .post(format!("{}/sessions", self.base_url))
            .bearer_auth(key)
            .timeout(CREATE_TIMEOUT)
            .json(&json!({
                "prompt": prompt,
                "title": title,
                "tags": tags,
                "unlisted": false,
            }))
            .send()
            .await?;
        let created: CreateSessionResponse = Self::check(response).await?.json().await?;
        Ok(CreatedSession {
            session_id: created.session_id,
            url: created.url,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionSnapshot, ProviderError> {
        let key = self.bearer()?;
        let response = self
            .http
            .get(format!("{}/sessions/{session_id}", self.base_url))
            .bearer_auth(key)
            .timeout(POLL_TIMEOUT)
            .send()
            .await?;
        let details: SessionDetailsResponse = Self::check(response).await?.json().await?;
        Ok(SessionSnapshot {
            status: SessionStatus::from_wire(&details.status_enum),
            pull_request: details
                .pull_request
                .map(|pr| PullRequestRef { url: pr.url }),
        })
    }

    async fn terminate_session(&self, session_id: &str) -> Result<bool, ProviderError> {
        let key = self.bearer()?;
        let response = self
            .http
            .delete(format!("{}/sessions/{session_id}", self.base_url))
            .bearer_auth(key)
            .timeout(POLL_TIMEOUT)
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    async fn cleanup_workspace(&self, _issue_number: i64) {}
}
