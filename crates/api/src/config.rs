use std::path::PathBuf;

use issuepilot_agent::ProviderKind;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
        }
    }
}

/// Configuration for the automation integrations: GitHub and the
/// execution provider.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// GitHub API token. Reads against public repositories work without
    /// one; label mutations do not.
    pub github_token: Option<String>,
    /// Default repository (`owner/name`) when a request does not name
    /// one.
    pub github_repo: String,
    /// Base URL of the remote execution provider's sessions API.
    pub agent_api_base: String,
    /// Credential for the remote execution provider.
    pub agent_api_key: Option<String>,
    /// Which execution provider implementation to run.
    pub provider: ProviderKind,
    /// Scratch directory for simulated workspaces.
    pub workspace_root: PathBuf,
}

impl AutomationConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                        |
    /// |----------------------|--------------------------------|
    /// | `GITHUB_TOKEN`       | unset                          |
    /// | `GITHUB_REPO`        | (required)                     |
    /// | `AGENT_API_BASE`     | `https://api.agent.example/v1` |
    /// | `AGENT_API_KEY`      | unset                          |
    /// | `EXECUTION_PROVIDER` | `simulated`                    |
    /// | `WORKSPACE_ROOT`     | `./data/workspaces`            |
    pub fn from_env() -> Self {
        let github_token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());

        let github_repo = std::env::var("GITHUB_REPO").expect("GITHUB_REPO must be set");

        let agent_api_base = std::env::var("AGENT_API_BASE")
            .unwrap_or_else(|_| "https://api.agent.example/v1".into());

        let agent_api_key = std::env::var("AGENT_API_KEY").ok().filter(|k| !k.is_empty());

        let provider = ProviderKind::from_str_value(
            &std::env::var("EXECUTION_PROVIDER").unwrap_or_else(|_| "simulated".into()),
        )
        .expect("EXECUTION_PROVIDER must be 'remote' or 'simulated'");

        let workspace_root =
            PathBuf::from(std::env::var("WORKSPACE_ROOT").unwrap_or_else(|_| "./data/workspaces".into()));

        Self {
            github_token,
            github_repo,
            agent_api_base,
            agent_api_key,
            provider,
            workspace_root,
        }
    }

    /// Whether the configured provider can actually run sessions. The
    /// simulated provider always can; the remote one needs a key.
    pub fn provider_ready(&self) -> bool {
        match self.provider {
            ProviderKind::Simulated => true,
            ProviderKind::Remote => self.agent_api_key.is_some(),
        }
    }
}
