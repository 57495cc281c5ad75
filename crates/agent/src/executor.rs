//! The job execution state machine.
//!
//! [`execute`] drives a single job: create a session, poll it until it
//! finishes, fails, or times out, and report every state change through
//! the [`ExecutionObserver`]. The executor writes job progress only; it
//! never touches ticket state, which belongs to the orchestration layer
//! behind the observer.
//!
//! Cancellation is checked at the top of each loop iteration and again
//! after each poll, so no progress is reported once a cancel has been
//! signalled. A session that finishes in the same poll as a
//! cancellation request is allowed to complete normally; that race is
//! tolerated by design of the polling cadence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use issuepilot_core::naming;
use issuepilot_core::prompt;
use issuepilot_core::status::JobStatus;

use crate::provider::{ExecutionProvider, SessionStatus};

/// Progress labels for the working phases, indexed by step - 1.
const STEP_MESSAGES: [&str; 3] = [
    "Agent is analyzing the codebase...",
    "Agent is implementing the solution...",
    "Agent is testing and creating a PR...",
];

const CREATING_SESSION_STEP: &str = "Creating execution session...";
const TIMEOUT_MESSAGE: &str = "Execution session timed out after 1 hour";

/// Everything the executor needs to know about the job it is running.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub job_id: Uuid,
    pub ticket_number: i64,
    pub repo: String,
    pub title: String,
    pub body: String,
}

/// Polling cadence. Defaults match the provider's session lifetime: a
/// 30 second interval against a one hour ceiling.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub poll_interval: Duration,
    pub max_poll: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_poll: Duration::from_secs(3600),
        }
    }
}

/// Sink for execution state changes.
///
/// The orchestration layer implements this over the database and
/// GitHub; tests implement it with an in-memory recorder.
#[async_trait]
pub trait ExecutionObserver: Send + Sync {
    /// A job status or step change. `steps_completed` never decreases
    /// while the job is running; a failure resets it to 0.
    async fn on_progress(
        &self,
        job_id: Uuid,
        status: JobStatus,
        current_step: &str,
        steps_completed: i32,
        error_message: Option<&str>,
    );

    /// The session URL and working branch, reported once right after
    /// session creation.
    async fn on_session_info(&self, job_id: Uuid, session_url: Option<&str>, branch_name: &str);

    /// The job finished successfully. `pr_number` is absent when the
    /// session reported no pull request or its URL could not be parsed.
    async fn on_complete(
        &self,
        job_id: Uuid,
        ticket_number: i64,
        pr_number: Option<i64>,
        pr_url: Option<&str>,
        branch_name: &str,
    );
}

enum RunEnd {
    Completed {
        pr_number: Option<i64>,
        pr_url: Option<String>,
    },
    Cancelled,
}

/// Run one job to its end.
///
/// Every outcome is reported through the observer: success via
/// `on_complete`, failure via a `Failed` progress event. A cancelled
/// job produces no further callbacks; the caller that signalled the
/// cancellation owns the job's final state.
pub async fn execute(
    provider: Arc<dyn ExecutionProvider>,
    observer: Arc<dyn ExecutionObserver>,
    cancel: CancellationToken,
    ctx: ExecutionContext,
    cfg: ExecutorConfig,
) {
    let branch = naming::branch_for_issue(ctx.ticket_number);
    match run(provider.as_ref(), observer.as_ref(), &cancel, &ctx, &cfg).await {
        Ok(RunEnd::Completed { pr_number, pr_url }) => {
            tracing::info!(
                job_id = %ctx.job_id,
                ticket_number = ctx.ticket_number,
                pr_number,
                "execution completed"
            );
            observer
                .on_complete(
                    ctx.job_id,
                    ctx.ticket_number,
                    pr_number,
                    pr_url.as_deref(),
                    &branch,
                )
                .await;
        }
        Ok(RunEnd::Cancelled) => {
            tracing::info!(job_id = %ctx.job_id, "execution cancelled");
        }
        Err(message) => {
            tracing::warn!(job_id = %ctx.job_id, error = %message, "execution failed");
            observer
                .on_progress(ctx.job_id, JobStatus::Failed, "Error", 0, Some(&message))
                .await;
        }
    }
}

async fn run(
    provider: &dyn ExecutionProvider,
    observer: &dyn ExecutionObserver,
    cancel: &CancellationToken,
    ctx: &ExecutionContext,
    cfg: &ExecutorConfig,
) -> Result<RunEnd, String> {
    observer
        .on_progress(ctx.job_id, JobStatus::Running, CREATING_SESSION_STEP, 0, None)
        .await;

    if cancel.is_cancelled() {
        return Ok(RunEnd::Cancelled);
    }

    let task_prompt = prompt::execution_prompt(&ctx.repo, ctx.ticket_number, &ctx.title, &ctx.body);
    let session = provider
        .create_session(
            &task_prompt,
            &naming::session_title(ctx.ticket_number, &ctx.title),
            &naming::session_tags(ctx.ticket_number, &ctx.repo),
        )
        .await
        .map_err(|e| e.to_string())?;

    let branch = naming::branch_for_issue(ctx.ticket_number);
    observer
        .on_session_info(ctx.job_id, session.url.as_deref(), &branch)
        .await;
    observer
        .on_progress(ctx.job_id, JobStatus::Running, STEP_MESSAGES[0], 1, None)
        .await;

    let mut elapsed = Duration::ZERO;
    while elapsed < cfg.max_poll {
        if cancel.is_cancelled() {
            terminate_best_effort(provider, ctx.job_id, &session.session_id).await;
            return Ok(RunEnd::Cancelled);
        }

        tokio::time::sleep(cfg.poll_interval).await;
        elapsed += cfg.poll_interval;

        let snapshot = match provider.get_session(&session.session_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Transient poll failures count against the timeout but
                // never fail the job.
                tracing::debug!(job_id = %ctx.job_id, error = %e, "transient poll error");
                continue;
            }
        };

        // A cancel signalled while this poll was under way must not
        // produce another running progress event, or it would overwrite
        // the terminal row the canceller just wrote. A finish observed
        // in the same poll still wins.
        if cancel.is_cancelled() && !matches!(snapshot.status, SessionStatus::Finished) {
            terminate_best_effort(provider, ctx.job_id, &session.session_id).await;
            return Ok(RunEnd::Cancelled);
        }

        match snapshot.status {
            SessionStatus::Working => {
                let step = (1 + elapsed.as_secs() / 60).min(3) as i32;
                let message = STEP_MESSAGES[(step as usize - 1).min(2)];
                observer
                    .on_progress(ctx.job_id, JobStatus::Running, message, step, None)
                    .await;
            }
            SessionStatus::Blocked => {
                let url = session.url.as_deref().unwrap_or("the session");
                observer
                    .on_progress(
                        ctx.job_id,
                        JobStatus::Running,
                        &format!("Agent needs assistance - check {url}"),
                        2,
                        None,
                    )
                    .await;
            }
            SessionStatus::Finished => {
                let pr_url = snapshot.pull_request.and_then(|pr| pr.url);
                let pr_number = pr_url.as_deref().and_then(pr_number_from_url);
                return Ok(RunEnd::Completed { pr_number, pr_url });
            }
            SessionStatus::Expired | SessionStatus::SuspendRequested => {
                return Err(format!(
                    "Execution session ended unexpectedly: {}",
                    snapshot.status
                ));
            }
            SessionStatus::Other(_) => {}
        }
    }

    Err(TIMEOUT_MESSAGE.to_string())
}

/// Best-effort session termination: a failed terminate leaves the
/// session to its own expiry.
async fn terminate_best_effort(provider: &dyn ExecutionProvider, job_id: Uuid, session_id: &str) {
    if let Err(e) = provider.terminate_session(session_id).await {
        tracing::warn!(
            job_id = %job_id,
            error = %e,
            "failed to terminate session on cancel"
        );
    }
}

/// Parse a pull request number from the trailing segment of its URL.
fn pr_number_from_url(url: &str) -> Option<i64> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::provider::{CreatedSession, ProviderError, PullRequestRef, SessionSnapshot};

    // -- test doubles ---------------------------------------------------------

    enum PollScript {
        Snapshot(SessionStatus, Option<&'static str>),
        TransientError,
    }

    struct ScriptedProvider {
        create_result: Option<&'static str>,
        polls: Mutex<VecDeque<PollScript>>,
        repeat_working_when_empty: bool,
        terminations: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(polls: Vec<PollScript>) -> Self {
            Self {
                create_result: None,
                polls: Mutex::new(polls.into()),
                repeat_working_when_empty: false,
                terminations: AtomicUsize::new(0),
            }
        }

        fn failing_create(message: &'static str) -> Self {
            let mut provider = Self::new(Vec::new());
            provider.create_result = Some(message);
            provider
        }

        fn working_forever() -> Self {
            let mut provider = Self::new(Vec::new());
            provider.repeat_working_when_empty = true;
            provider
        }
    }

    #[async_trait]
    impl ExecutionProvider for ScriptedProvider {
        async fn create_session(
            &self,
            _prompt: &str,
            _title: &str,
            _tags: &[String],
        ) -> Result<CreatedSession, ProviderError> {
            if let Some(message) = self.create_result {
                return Err(ProviderError::Unconfigured(message.to_string()));
            }
            Ok(CreatedSession {
                session_id: "sess-1".to_string(),
                url: Some("https://provider.example/sessions/sess-1".to_string()),
            })
        }

        async fn get_session(&self, _session_id: &str) -> Result<SessionSnapshot, ProviderError> {
            let next = self.polls.lock().unwrap().pop_front();
            match next {
                Some(PollScript::Snapshot(status, pr_url)) => Ok(SessionSnapshot {
                    status,
                    pull_request: pr_url.map(|url| PullRequestRef {
                        url: Some(url.to_string()),
                    }),
                }),
                Some(PollScript::TransientError) => Err(ProviderError::Api {
                    status: 502,
                    body: "bad gateway".to_string(),
                }),
                None if self.repeat_working_when_empty => Ok(SessionSnapshot {
                    status: SessionStatus::Working,
                    pull_request: None,
                }),
                None => panic!("unexpected poll"),
            }
        }

        async fn terminate_session(&self, _session_id: &str) -> Result<bool, ProviderError> {
            self.terminations.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn cleanup_workspace(&self, _issue_number: i64) {}
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Progress {
            status: JobStatus,
            step: String,
            steps_completed: i32,
            error: Option<String>,
        },
        SessionInfo {
            url: Option<String>,
            branch: String,
        },
        Complete {
            pr_number: Option<i64>,
            pr_url: Option<String>,
            branch: String,
        },
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn events(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
            self.events.lock().unwrap()
        }
    }

    #[async_trait]
    impl ExecutionObserver for Recorder {
        async fn on_progress(
            &self,
            _job_id: Uuid,
            status: JobStatus,
            current_step: &str,
            steps_completed: i32,
            error_message: Option<&str>,
        ) {
            self.events().push(Event::Progress {
                status,
                step: current_step.to_string(),
                steps_completed,
                error: error_message.map(str::to_string),
            });
        }

        async fn on_session_info(
            &self,
            _job_id: Uuid,
            session_url: Option<&str>,
            branch_name: &str,
        ) {
            self.events().push(Event::SessionInfo {
                url: session_url.map(str::to_string),
                branch: branch_name.to_string(),
            });
        }

        async fn on_complete(
            &self,
            _job_id: Uuid,
            _ticket_number: i64,
            pr_number: Option<i64>,
            pr_url: Option<&str>,
            branch_name: &str,
        ) {
            self.events().push(Event::Complete {
                pr_number,
                pr_url: pr_url.map(str::to_string),
                branch: branch_name.to_string(),
            });
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext {
            job_id: Uuid::new_v4(),
            ticket_number: 42,
            repo: "octo/widgets".to_string(),
            title: "Login broken".to_string(),
            body: "details".to_string(),
        }
    }

    fn config() -> ExecutorConfig {
        ExecutorConfig::default()
    }

    // -- happy path -----------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn finished_session_completes_with_parsed_pr_number() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            PollScript::Snapshot(SessionStatus::Working, None),
            PollScript::Snapshot(
                SessionStatus::Finished,
                Some("https://github.com/octo/widgets/pull/42"),
            ),
        ]));
        let observer = Arc::new(Recorder::default());

        execute(
            provider,
            observer.clone(),
            CancellationToken::new(),
            context(),
            config(),
        )
        .await;

        let events = observer.events();
        assert_eq!(
            events[0],
            Event::Progress {
                status: JobStatus::Running,
                step: CREATING_SESSION_STEP.to_string(),
                steps_completed: 0,
                error: None,
            }
        );
        assert_eq!(
            events[1],
            Event::SessionInfo {
                url: Some("https://provider.example/sessions/sess-1".to_string()),
                branch: "agent/issue-42".to_string(),
            }
        );
        assert_eq!(
            events.last().unwrap(),
            &Event::Complete {
                pr_number: Some(42),
                pr_url: Some("https://github.com/octo/widgets/pull/42".to_string()),
                branch: "agent/issue-42".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn steps_never_decrease_while_running() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            PollScript::Snapshot(SessionStatus::Working, None),
            PollScript::Snapshot(SessionStatus::Working, None),
            PollScript::Snapshot(SessionStatus::Working, None),
            PollScript::Snapshot(SessionStatus::Working, None),
            PollScript::Snapshot(SessionStatus::Working, None),
            PollScript::Snapshot(SessionStatus::Working, None),
            PollScript::Snapshot(SessionStatus::Finished, None),
        ]));
        let observer = Arc::new(Recorder::default());

        execute(
            provider,
            observer.clone(),
            CancellationToken::new(),
            context(),
            config(),
        )
        .await;

        let events = observer.events();
        let mut last_step = 0;
        for event in events.iter() {
            if let Event::Progress {
                status: JobStatus::Running,
                steps_completed,
                ..
            } = event
            {
                assert!(*steps_completed >= last_step);
                assert!(*steps_completed <= 3);
                last_step = *steps_completed;
            }
        }
        // Six working polls cover 3 minutes, enough to reach step 3.
        assert_eq!(last_step, 3);
    }

    // -- failure paths --------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn create_failure_fails_job_without_session_info() {
        let provider = Arc::new(ScriptedProvider::failing_create("API key not set"));
        let observer = Arc::new(Recorder::default());

        execute(
            provider,
            observer.clone(),
            CancellationToken::new(),
            context(),
            config(),
        )
        .await;

        let events = observer.events();
        assert_eq!(events.len(), 2);
        match &events[1] {
            Event::Progress {
                status: JobStatus::Failed,
                step,
                steps_completed: 0,
                error: Some(error),
            } => {
                assert_eq!(step, "Error");
                assert!(error.contains("API key not set"));
            }
            other => panic!("expected failed progress, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_fails_the_job() {
        let provider = Arc::new(ScriptedProvider::new(vec![PollScript::Snapshot(
            SessionStatus::Expired,
            None,
        )]));
        let observer = Arc::new(Recorder::default());

        execute(
            provider,
            observer.clone(),
            CancellationToken::new(),
            context(),
            config(),
        )
        .await;

        let events = observer.events();
        match events.last().unwrap() {
            Event::Progress {
                status: JobStatus::Failed,
                error: Some(error),
                ..
            } => assert!(error.contains("ended unexpectedly: expired")),
            other => panic!("expected failed progress, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn working_past_the_ceiling_times_out() {
        let provider = Arc::new(ScriptedProvider::working_forever());
        let observer = Arc::new(Recorder::default());
        let cfg = ExecutorConfig {
            poll_interval: Duration::from_secs(30),
            max_poll: Duration::from_secs(120),
        };

        execute(
            provider,
            observer.clone(),
            CancellationToken::new(),
            context(),
            cfg,
        )
        .await;

        let events = observer.events();
        match events.last().unwrap() {
            Event::Progress {
                status: JobStatus::Failed,
                steps_completed: 0,
                error: Some(error),
                ..
            } => assert_eq!(error, TIMEOUT_MESSAGE),
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_poll_errors_are_swallowed() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            PollScript::TransientError,
            PollScript::TransientError,
            PollScript::Snapshot(SessionStatus::Finished, None),
        ]));
        let observer = Arc::new(Recorder::default());

        execute(
            provider,
            observer.clone(),
            CancellationToken::new(),
            context(),
            config(),
        )
        .await;

        let events = observer.events();
        assert!(events
            .iter()
            .all(|e| !matches!(e, Event::Progress { status: JobStatus::Failed, .. })));
        assert!(matches!(events.last().unwrap(), Event::Complete { pr_number: None, .. }));
    }

    // -- blocked sessions -----------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn blocked_session_keeps_running_at_step_two() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            PollScript::Snapshot(SessionStatus::Blocked, None),
            PollScript::Snapshot(SessionStatus::Blocked, None),
            PollScript::Snapshot(SessionStatus::Finished, None),
        ]));
        let observer = Arc::new(Recorder::default());

        execute(
            provider,
            observer.clone(),
            CancellationToken::new(),
            context(),
            config(),
        )
        .await;

        let events = observer.events();
        let blocked: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::Progress { step, .. } if step.contains("needs assistance")))
            .collect();
        // Reported every poll while blocked, never escalated or failed.
        assert_eq!(blocked.len(), 2);
        assert!(matches!(events.last().unwrap(), Event::Complete { .. }));
    }

    // -- cancellation ---------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn cancellation_before_session_creation_is_silent() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let observer = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        execute(provider.clone(), observer.clone(), cancel, context(), config()).await;

        let events = observer.events();
        // Only the initial progress event; no session was created, so
        // nothing to terminate.
        assert_eq!(events.len(), 1);
        assert_eq!(provider.terminations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_polling_terminates_session_silently() {
        let provider = Arc::new(ScriptedProvider::working_forever());
        let observer = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(execute(
            provider.clone(),
            observer.clone(),
            cancel.clone(),
            context(),
            config(),
        ));

        // Let one poll land, then cancel between polls.
        tokio::time::sleep(Duration::from_secs(45)).await;
        cancel.cancel();
        handle.await.unwrap();

        let events = observer.events();
        assert_eq!(provider.terminations.load(Ordering::SeqCst), 1);
        assert!(!events.iter().any(|e| matches!(e, Event::Complete { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::Progress { status: JobStatus::Failed, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_progress_from_poll_already_under_way() {
        // Cancel fires at t=45, between the t=30 and t=60 polls. The
        // t=60 poll still returns a working snapshot, but reporting it
        // would overwrite the terminal job row the canceller wrote, so
        // the executor must terminate instead of emitting progress.
        let provider = Arc::new(ScriptedProvider::working_forever());
        let observer = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(execute(
            provider.clone(),
            observer.clone(),
            cancel.clone(),
            context(),
            config(),
        ));

        tokio::time::sleep(Duration::from_secs(45)).await;
        cancel.cancel();
        handle.await.unwrap();

        let events = observer.events();
        // Creating-session progress, session info, step-1 progress, and
        // the t=30 working poll. Nothing after the cancel.
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events.last().unwrap(),
            Event::Progress { status: JobStatus::Running, .. }
        ));
        assert_eq!(provider.terminations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn session_finishing_alongside_cancel_completes_normally() {
        // A session that finishes in the poll already under way wins
        // the race against the cancel and completes the job; only
        // non-finished snapshots defer to the cancellation.
        let provider = Arc::new(ScriptedProvider::new(vec![
            PollScript::Snapshot(SessionStatus::Working, None),
            PollScript::Snapshot(
                SessionStatus::Finished,
                Some("https://github.com/octo/widgets/pull/7"),
            ),
        ]));
        let observer = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(execute(
            provider.clone(),
            observer.clone(),
            cancel.clone(),
            context(),
            config(),
        ));

        tokio::time::sleep(Duration::from_secs(45)).await;
        cancel.cancel();
        handle.await.unwrap();

        let events = observer.events();
        assert!(matches!(
            events.last().unwrap(),
            Event::Complete { pr_number: Some(7), .. }
        ));
        assert_eq!(provider.terminations.load(Ordering::SeqCst), 0);
    }

    // -- PR URL parsing -------------------------------------------------------

    #[test]
    fn pr_number_parses_trailing_segment() {
        assert_eq!(
            pr_number_from_url("https://github.com/octo/widgets/pull/42"),
            Some(42)
        );
        assert_eq!(
            pr_number_from_url("https://github.com/octo/widgets/pull/42/"),
            Some(42)
        );
    }

    #[test]
    fn unparsable_pr_url_yields_none() {
        assert_eq!(pr_number_from_url("https://github.com/octo/widgets/pulls"), None);
        assert_eq!(pr_number_from_url(""), None);
    }
}
