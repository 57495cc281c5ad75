use std::sync::Arc;

use issuepilot_agent::ExecutionProvider;
use issuepilot_github::GitHubClient;

use crate::config::{AutomationConfig, ServerConfig};
use crate::engine::cancel::CancelRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: issuepilot_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// GitHub and execution provider configuration.
    pub automation: Arc<AutomationConfig>,
    /// The configured execution provider, shared by all jobs.
    pub provider: Arc<dyn ExecutionProvider>,
    /// Cancellation tokens for in-flight executions. The only shared
    /// mutable state in the application.
    pub cancellations: Arc<CancelRegistry>,
}

impl AppState {
    /// Build a GitHub client scoped to `repo`, falling back to the
    /// configured default repository.
    pub fn github_for(&self, repo: Option<&str>) -> GitHubClient {
        let repo = repo.unwrap_or(&self.automation.github_repo);
        GitHubClient::new(self.automation.github_token.clone(), repo.to_string())
    }

    /// Resolve the target repository for a request.
    pub fn target_repo(&self, repo: Option<String>) -> String {
        repo.unwrap_or_else(|| self.automation.github_repo.clone())
    }
}
