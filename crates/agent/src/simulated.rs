//! In-process execution provider for demos and credential-less setups.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use issuepilot_core::naming;

use crate::provider::{
    CreatedSession, ExecutionProvider, ProviderError, PullRequestRef, SessionSnapshot,
    SessionStatus,
};

/// Polls a simulated session reports `working` before finishing.
const POLLS_UNTIL_FINISHED: u32 = 3;

#[derive(Debug)]
struct SimSession {
    polls: u32,
    issue_number: Option<i64>,
    repo: Option<String>,
}

/// Provider that fabricates sessions locally.
///
/// Sessions advance `working -> finished` after a fixed number of
/// polls and report a fabricated pull request URL, which exercises the
/// whole execution pipeline without any external service. A small
/// scratch workspace is kept on disk per issue so workspace cleanup has
/// something real to tear down.
pub struct SimulatedProvider {
    sessions: Mutex<HashMap<String, SimSession>>,
    workspace_root: PathBuf,
}

impl SimulatedProvider {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            workspace_root,
        }
    }

    /// Issue number parsed from the `issue-{n}` session tag.
    fn issue_from_tags(tags: &[String]) -> Option<i64> {
        tags.iter()
            .find_map(|tag| tag.strip_prefix("issue-"))
            .and_then(|n| n.parse().ok())
    }

    fn worktree_dir(&self, issue_number: i64) -> PathBuf {
        self.workspace_root
            .join("worktrees")
            .join(format!("issue-{issue_number}"))
    }

    fn branch_marker(&self, issue_number: i64) -> PathBuf {
        self.workspace_root
            .join("branches")
            .join(naming::branch_for_issue(issue_number).replace('/', "-"))
    }

    fn scratch_dir(&self, issue_number: i64) -> PathBuf {
        self.workspace_root
            .join("tmp")
            .join(format!("issue-{issue_number}"))
    }

    async fn provision_workspace(&self, issue_number: i64) {
        let worktree = self.worktree_dir(issue_number);
        if let Err(e) = tokio::fs::create_dir_all(&worktree).await {
            tracing::warn!(issue_number, error = %e, "failed to provision simulated worktree");
        }
        let marker = self.branch_marker(issue_number);
        if let Some(parent) = marker.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(e) = tokio::fs::write(&marker, issue_number.to_string()).await {
            tracing::warn!(issue_number, error = %e, "failed to write simulated branch marker");
        }
    }
}

#[async_trait]
impl ExecutionProvider for SimulatedProvider {
    async fn create_session(
        &self,
        _prompt: &str,
        _title: &str,
        tags: &[String],
    ) -> Result<CreatedSession, ProviderError> {
        let session_id = format!("sim-{}", Uuid::new_v4());
        let issue_number = Self::issue_from_tags(tags);
        let repo = tags
            .iter()
            .find(|tag| tag.contains('/'))
            .cloned();

        if let Some(issue) = issue_number {
            self.provision_workspace(issue).await;
        }

        self.sessions.lock().await.insert(
            session_id.clone(),
            SimSession {
                polls: 0,
                issue_number,
                repo,
            },
        );

        Ok(CreatedSession {
            url: Some(format!("sim://sessions/{session_id}")),
            session_id,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionSnapshot, ProviderError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(session_id).ok_or(ProviderError::Api {
            status: 404,
            body: format!("unknown session {session_id}"),
        })?;

        session.polls += 1;
        if session.polls < POLLS_UNTIL_FINISHED {
            return Ok(SessionSnapshot {
                status: SessionStatus::Working,
                pull_request: None,
            });
        }

        let repo = session.repo.as_deref().unwrap_or("simulated/repo");
        let pr_url = session
            .issue_number
            .map(|n| format!("https://github.com/{repo}/pull/{n}"));
        Ok(SessionSnapshot {
            status: SessionStatus::Finished,
            pull_request: Some(PullRequestRef { url: pr_url }),
        })
    }

    async fn terminate_session(&self, session_id: &str) -> Result<bool, ProviderError> {
        Ok(self.sessions.lock().await.remove(session_id).is_some())
    }

    /// Tear down the scratch workspace for an issue.
    ///
    /// Three independent best-effort steps: the worktree directory, the
    /// branch marker, and any residual scratch directory. A failure in
    /// one never stops the others.
    async fn cleanup_workspace(&self, issue_number: i64) {
        if let Err(e) = tokio::fs::remove_dir_all(self.worktree_dir(issue_number)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(issue_number, error = %e, "failed to remove simulated worktree");
            }
        }
        if let Err(e) = tokio::fs::remove_file(self.branch_marker(issue_number)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(issue_number, error = %e, "failed to remove simulated branch marker");
            }
        }
        if let Err(e) = tokio::fs::remove_dir_all(self.scratch_dir(issue_number)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(issue_number, error = %e, "failed to remove simulated scratch dir");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn provider() -> SimulatedProvider {
        SimulatedProvider::new(std::env::temp_dir().join(format!("issuepilot-{}", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn session_finishes_after_fixed_polls_with_pr_url() {
        let provider = provider();
        let tags = vec!["issue-42".to_string(), "octo/widgets".to_string()];
        let session = provider.create_session("prompt", "title", &tags).await.unwrap();

        for _ in 0..POLLS_UNTIL_FINISHED - 1 {
            let snapshot = provider.get_session(&session.session_id).await.unwrap();
            assert_eq!(snapshot.status, SessionStatus::Working);
        }

        let snapshot = provider.get_session(&session.session_id).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Finished);
        let pr = snapshot.pull_request.unwrap();
        assert_eq!(
            pr.url.as_deref(),
            Some("https://github.com/octo/widgets/pull/42")
        );

        provider.cleanup_workspace(42).await;
    }

    #[tokio::test]
    async fn unknown_session_is_an_api_error() {
        let provider = provider();
        let result = provider.get_session("sim-missing").await;
        assert_matches!(result, Err(ProviderError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn terminate_consumes_the_session() {
        let provider = provider();
        let session = provider
            .create_session("prompt", "title", &["issue-7".to_string()])
            .await
            .unwrap();
        assert!(provider.terminate_session(&session.session_id).await.unwrap());
        assert!(!provider.terminate_session(&session.session_id).await.unwrap());
        provider.cleanup_workspace(7).await;
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let provider = provider();
        provider
            .create_session("prompt", "title", &["issue-9".to_string()])
            .await
            .unwrap();
        provider.cleanup_workspace(9).await;
        provider.cleanup_workspace(9).await;
        assert!(!provider.worktree_dir(9).exists());
        assert!(!provider.branch_marker(9).exists());
    }
}
