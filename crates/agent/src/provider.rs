//! The execution provider capability.
//!
//! One trait, two implementations: [`crate::remote::RemoteProvider`]
//! talks to a hosted coding-agent API, [`crate::simulated::SimulatedProvider`]
//! runs sessions in-process for demos and tests. Which one the
//! application gets is decided once, at construction time, by
//! [`crate::factory::build_provider`].

use async_trait::async_trait;

/// Wire statuses an execution session can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Working,
    Blocked,
    Finished,
    Expired,
    SuspendRequested,
    /// Any status string we do not recognize; polling continues.
    Other(String),
}

impl SessionStatus {
    /// Parse the provider's status string.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "working" => Self::Working,
            "blocked" => Self::Blocked,
            "finished" => Self::Finished,
            "expired" => Self::Expired,
            "suspend_requested" => Self::SuspendRequested,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Working => "working",
            Self::Blocked => "blocked",
            Self::Finished => "finished",
            Self::Expired => "expired",
            Self::SuspendRequested => "suspend_requested",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of creating a session.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session_id: String,
    /// Human-facing URL for watching the session, when the provider has
    /// one.
    pub url: Option<String>,
}

/// Pull request reference reported by a finished session.
#[derive(Debug, Clone)]
pub struct PullRequestRef {
    pub url: Option<String>,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub pull_request: Option<PullRequestRef>,
}

/// Errors from provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No credential configured for a provider that needs one.
    #[error("Execution provider not configured: {0}")]
    Unconfigured(String),

    /// Transport-level failure.
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Provider API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// A service that runs coding-agent sessions.
///
/// Implementations are stateless beyond their own bookkeeping and safe
/// to share behind an `Arc` across concurrent executions.
#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    /// Start a session for the given task prompt.
    async fn create_session(
        &self,
        prompt: &str,
        title: &str,
        tags: &[String],
    ) -> Result<CreatedSession, ProviderError>;

    /// Fetch the current state of a session.
    async fn get_session(&self, session_id: &str) -> Result<SessionSnapshot, ProviderError>;

    /// Terminate a session. Returns `true` if the provider accepted the
    /// termination.
    async fn terminate_session(&self, session_id: &str) -> Result<bool, ProviderError>;

    /// Release any local workspace held for an issue. Best-effort;
    /// implementations swallow individual failures.
    async fn cleanup_workspace(&self, issue_number: i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_statuses_round_trip() {
        for s in ["working", "blocked", "finished", "expired", "suspend_requested"] {
            assert_eq!(SessionStatus::from_wire(s).as_str(), s);
        }
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status = SessionStatus::from_wire("resumed");
        assert_eq!(status, SessionStatus::Other("resumed".to_string()));
        assert_eq!(status.to_string(), "resumed");
    }
}
