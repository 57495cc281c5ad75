//! Persists executor progress and drives the ticket lifecycle around it.
//!
//! The executor reports through [`ExecutionObserver`]; this module's
//! implementation writes job rows, moves the ticket between statuses,
//! and performs the label choreography on GitHub. Label mutations are
//! always best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use issuepilot_agent::executor::{self, ExecutionContext, ExecutionObserver, ExecutorConfig};
use issuepilot_core::naming::{LABEL_IN_PROGRESS, LABEL_REVIEW};
use issuepilot_core::status::{JobStatus, TicketStatus};
use issuepilot_db::repositories::{JobRepo, TicketRepo};
use issuepilot_db::DbPool;
use issuepilot_github::GitHubClient;

use crate::engine::best_effort;
use crate::state::AppState;

/// Observer that persists execution state for one job.
///
/// Holds the repo and ticket number the job belongs to, since progress
/// events only carry the job ID.
pub struct ExecutionOrchestrator {
    pool: DbPool,
    github: GitHubClient,
    repo: String,
    ticket_number: i64,
}

impl ExecutionOrchestrator {
    pub fn new(pool: DbPool, github: GitHubClient, repo: String, ticket_number: i64) -> Self {
        Self {
            pool,
            github,
            repo,
            ticket_number,
        }
    }

    /// Recovery path: put the ticket back where an operator can retry
    /// it, and drop the in-progress label.
    async fn revert_ticket_to_scoped(&self) {
        if let Err(e) = TicketRepo::update_status(
            &self.pool,
            &self.repo,
            self.ticket_number,
            TicketStatus::Scoped.as_str(),
        )
        .await
        {
            tracing::error!(
                repo = %self.repo,
                ticket_number = self.ticket_number,
                error = %e,
                "failed to revert ticket to scoped"
            );
        }
        best_effort(
            "remove in-progress label",
            self.github.remove_label(self.ticket_number, LABEL_IN_PROGRESS),
        )
        .await;
    }
}

#[async_trait]
impl ExecutionObserver for ExecutionOrchestrator {
    async fn on_progress(
        &self,
        job_id: Uuid,
        status: JobStatus,
        current_step: &str,
        steps_completed: i32,
        error_message: Option<&str>,
    ) {
        if let Err(e) = JobRepo::update_progress(
            &self.pool,
            job_id,
            status,
            Some(current_step),
            Some(steps_completed),
            error_message,
        )
        .await
        {
            tracing::error!(job_id = %job_id, error = %e, "failed to persist job progress");
        }

        if status == JobStatus::Failed {
            self.revert_ticket_to_scoped().await;
        }
    }

    async fn on_session_info(&self, job_id: Uuid, session_url: Option<&str>, branch_name: &str) {
        if let Err(e) =
            JobRepo::update_session_info(&self.pool, job_id, session_url, Some(branch_name)).await
        {
            tracing::error!(job_id = %job_id, error = %e, "failed to persist session info");
        }
    }

    async fn on_complete(
        &self,
        job_id: Uuid,
        ticket_number: i64,
        pr_number: Option<i64>,
        pr_url: Option<&str>,
        _branch_name: &str,
    ) {
        if let Err(e) = JobRepo::update_progress(
            &self.pool,
            job_id,
            JobStatus::Completed,
            Some("Complete"),
            Some(4),
            None,
        )
        .await
        {
            tracing::error!(job_id = %job_id, error = %e, "failed to mark job completed");
        }

        if let Err(e) = TicketRepo::update_status(
            &self.pool,
            &self.repo,
            ticket_number,
            TicketStatus::Review.as_str(),
        )
        .await
        {
            tracing::error!(
                repo = %self.repo,
                ticket_number,
                error = %e,
                "failed to move ticket to review"
            );
        }

        if let Err(e) =
            TicketRepo::set_pull_request(&self.pool, &self.repo, ticket_number, pr_number, pr_url)
                .await
        {
            tracing::error!(
                repo = %self.repo,
                ticket_number,
                error = %e,
                "failed to record pull request"
            );
        }

        best_effort(
            "remove in-progress label",
            self.github.remove_label(ticket_number, LABEL_IN_PROGRESS),
        )
        .await;
        best_effort(
            "add review label",
            self.github.add_label(ticket_number, LABEL_REVIEW),
        )
        .await;
    }
}

/// Spawn a background execution for a job.
///
/// Registers a cancellation token for the job, runs the executor on a
/// fresh task, and drops the registry entry when the task ends whatever
/// the outcome.
pub fn spawn_execution(state: &AppState, repo: String, ctx: ExecutionContext) {
    let token = state.cancellations.register(ctx.job_id);
    let observer = Arc::new(ExecutionOrchestrator::new(
        state.pool.clone(),
        state.github_for(Some(&repo)),
        repo,
        ctx.ticket_number,
    ));
    let provider = Arc::clone(&state.provider);
    let registry = Arc::clone(&state.cancellations);
    let job_id = ctx.job_id;

    tokio::spawn(async move {
        executor::execute(provider, observer, token, ctx, ExecutorConfig::default()).await;
        registry.deregister(job_id);
    });
}
