//! Handlers for the `/tickets` resource.
//!
//! Tickets are GitHub issues merged with the orchestrator's stored
//! lifecycle state. GitHub stays the source of truth for issue content;
//! the database owns status, analysis, and job history.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use issuepilot_agent::executor::ExecutionContext;
use issuepilot_core::error::CoreError;
use issuepilot_core::naming::{self, LABEL_IMPLEMENTED, LABEL_IN_PROGRESS, LABEL_REVIEW};
use issuepilot_core::scoring::{self, ConfidenceScore, TicketAnalysis};
use issuepilot_core::status::{JobStatus, TicketStatus};
use issuepilot_core::types::DbId;
use issuepilot_db::models::job::Job;
use issuepilot_db::models::ticket::Ticket;
use issuepilot_db::repositories::{JobRepo, TicketRepo};
use issuepilot_github::Issue;

use crate::engine::{best_effort, spawn_execution};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Optional repository override, `owner/name` form.
#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub repo: Option<String>,
}

/// A GitHub issue merged with stored orchestration state.
#[derive(Debug, Serialize)]
pub struct TicketView {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    pub status: String,
    pub labels: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub html_url: String,
    pub confidence_score: Option<ConfidenceScore>,
    pub analysis: Option<TicketAnalysis>,
    pub pr_number: Option<i64>,
    pub pr_url: Option<String>,
    pub branch_name: Option<String>,
    pub job: Option<JobView>,
}

/// Job progress as exposed over the API.
#[derive(Debug, Serialize)]
pub struct JobView {
    pub id: Uuid,
    pub ticket_id: DbId,
    pub status: String,
    pub current_step: Option<String>,
    pub steps_completed: i32,
    pub total_steps: i32,
    pub error_message: Option<String>,
    pub session_url: Option<String>,
    pub branch_name: Option<String>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            ticket_id: job.ticket_id,
            status: job.status,
            current_step: job.current_step,
            steps_completed: job.steps_completed,
            total_steps: job.total_steps,
            error_message: job.error_message,
            session_url: job.session_url,
            branch_name: job.branch_name,
        }
    }
}

/// Response payload for scoping a ticket.
#[derive(Debug, Serialize)]
pub struct ScopePayload {
    pub ticket_number: i64,
    pub title: String,
    pub analysis: TicketAnalysis,
}

/// Response payload for starting an execution.
#[derive(Debug, Serialize)]
pub struct ExecutionStarted {
    pub job_id: Uuid,
    pub status: &'static str,
    pub branch_name: String,
}

/// Pull request summary for the review screen.
#[derive(Debug, Serialize)]
pub struct PrSummaryView {
    pub pr_number: i64,
    pub pr_url: String,
    pub pr_state: String,
    pub title: String,
    pub branch_name: String,
    pub summary: PrDigest,
}

#[derive(Debug, Serialize)]
pub struct PrDigest {
    pub problem: String,
    pub solution: String,
    pub files_changed: Vec<FileChangeView>,
}

#[derive(Debug, Serialize)]
pub struct FileChangeView {
    pub filename: String,
    pub additions: i64,
    pub deletions: i64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a stored status string, treating corruption as an internal
/// error rather than a client fault.
fn parse_status(raw: &str) -> AppResult<TicketStatus> {
    TicketStatus::from_str_value(raw).map_err(AppError::InternalError)
}

fn parse_analysis(scope_data: &serde_json::Value) -> Option<TicketAnalysis> {
    serde_json::from_value(scope_data.clone()).ok()
}

/// Find the stored ticket for an issue, 404 when it was never scoped.
async fn find_ticket(
    pool: &issuepilot_db::DbPool,
    repo: &str,
    issue_number: i64,
) -> AppResult<Ticket> {
    TicketRepo::find_by_repo_and_number(pool, repo, issue_number)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Ticket",
            id: issue_number,
        }))
}

/// Merge a GitHub issue with stored state into the API view.
///
/// Stored status wins once the ticket has been scoped through this
/// service; an untracked issue is always `new`, whatever its labels
/// say, so the execute action only unlocks after a real analysis.
fn ticket_view(issue: Issue, stored: Option<&Ticket>, job: Option<Job>) -> TicketView {
    let status = stored
        .and_then(|t| TicketStatus::from_str_value(&t.status).ok())
        .filter(TicketStatus::has_scope_data)
        .unwrap_or(TicketStatus::New);

    let analysis = stored
        .and_then(|t| t.scope_data.as_ref())
        .and_then(parse_analysis);

    let branch_name = matches!(
        status,
        TicketStatus::InProgress | TicketStatus::Review | TicketStatus::Complete
    )
    .then(|| naming::branch_for_issue(issue.number));

    TicketView {
        id: issue.id,
        number: issue.number,
        title: issue.title.clone(),
        body: issue.body.clone(),
        status: status.as_str().to_string(),
        labels: issue.label_names(),
        created_at: issue.created_at,
        updated_at: issue.updated_at,
        html_url: issue.html_url,
        confidence_score: analysis.as_ref().map(|a| a.confidence_score.clone()),
        analysis,
        pr_number: stored.and_then(|t| t.pr_number),
        pr_url: stored.and_then(|t| t.pr_url.clone()),
        branch_name,
        job: job.map(JobView::from),
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/tickets
///
/// All issues of the repository (open and closed, pull requests
/// excluded) merged with stored lifecycle state. Tickets currently in
/// progress carry their latest job.
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<RepoQuery>,
) -> AppResult<impl IntoResponse> {
    let repo = state.target_repo(params.repo);
    let github = state.github_for(Some(&repo));

    let issues = github.list_issues().await?;
    let stored = TicketRepo::list_for_repo(&state.pool, &repo).await?;
    let by_number: HashMap<i64, Ticket> =
        stored.into_iter().map(|t| (t.issue_number, t)).collect();

    let mut tickets = Vec::new();
    for issue in issues {
        if issue.is_pull_request() {
            continue;
        }
        let db_ticket = by_number.get(&issue.number);
        let job = match db_ticket {
            Some(t) if t.status == TicketStatus::InProgress.as_str() => {
                JobRepo::find_latest_for_ticket(&state.pool, t.id).await?
            }
            _ => None,
        };
        tickets.push(ticket_view(issue, db_ticket, job));
    }

    Ok(Json(DataResponse { data: tickets }))
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// GET /api/v1/tickets/{number}/scope
///
/// Analyze the issue and persist the result: root issue, action plan,
/// and confidence score. Re-scoping replaces the previous analysis.
/// Rejected while the ticket is being executed or once it has passed
/// review.
pub async fn scope_ticket(
    State(state): State<AppState>,
    Path(ticket_number): Path<i64>,
    Query(params): Query<RepoQuery>,
) -> AppResult<impl IntoResponse> {
    let repo = state.target_repo(params.repo);
    let github = state.github_for(Some(&repo));

    let issue = github.get_issue(ticket_number).await?;

    let ticket = TicketRepo::upsert(&state.pool, &repo, ticket_number).await?;
    let current = parse_status(&ticket.status)?;

    if current == TicketStatus::InProgress {
        return Err(AppError::Core(CoreError::Conflict(
            "Ticket is being executed; cancel the job before rescoping".into(),
        )));
    }
    if !current.can_transition(TicketStatus::Scoped) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Cannot rescope a ticket in '{}' status",
            current.as_str()
        ))));
    }

    let analysis = scoring::analyze(
        &issue.title,
        issue.body.as_deref().unwrap_or(""),
        &issue.label_names(),
    );
    let scope_data =
        serde_json::to_value(&analysis).map_err(|e| AppError::InternalError(e.to_string()))?;

    TicketRepo::update_scope_data(&state.pool, &repo, ticket_number, &scope_data).await?;
    TicketRepo::update_status(&state.pool, &repo, ticket_number, TicketStatus::Scoped.as_str())
        .await?;

    tracing::info!(
        repo = %repo,
        ticket_number,
        total = analysis.confidence_score.total,
        "Ticket scoped",
    );

    Ok(Json(DataResponse {
        data: ScopePayload {
            ticket_number,
            title: issue.title,
            analysis,
        },
    }))
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

/// POST /api/v1/tickets/{number}/execute
///
/// Start execution of a scoped ticket: create a running job, move the
/// ticket to `in_progress`, and hand the work to a background task.
/// The in-progress label is cosmetic and applied best-effort.
pub async fn execute_ticket(
    State(state): State<AppState>,
    Path(ticket_number): Path<i64>,
    Query(params): Query<RepoQuery>,
) -> AppResult<impl IntoResponse> {
    if !state.automation.provider_ready() {
        return Err(AppError::BadRequest(
            "Execution provider is not configured. Set AGENT_API_KEY or select the simulated provider."
                .into(),
        ));
    }

    let repo = state.target_repo(params.repo);
    let ticket = find_ticket(&state.pool, &repo, ticket_number).await?;

    if parse_status(&ticket.status)? != TicketStatus::Scoped {
        return Err(AppError::Core(CoreError::Conflict(
            "Ticket must be in 'scoped' status to execute".into(),
        )));
    }

    let github = state.github_for(Some(&repo));
    let issue = github.get_issue(ticket_number).await?;

    let job = JobRepo::create(&state.pool, ticket.id).await?;
    TicketRepo::update_status(
        &state.pool,
        &repo,
        ticket_number,
        TicketStatus::InProgress.as_str(),
    )
    .await?;

    best_effort(
        "add in-progress label",
        github.add_label(ticket_number, LABEL_IN_PROGRESS),
    )
    .await;

    let branch_name = naming::branch_for_issue(ticket_number);
    let ctx = ExecutionContext {
        job_id: job.id,
        ticket_number,
        repo: repo.clone(),
        title: issue.title,
        body: issue.body.unwrap_or_default(),
    };

    tracing::info!(job_id = %job.id, repo = %repo, ticket_number, "Execution started");
    spawn_execution(&state, repo, ctx);

    Ok(Json(DataResponse {
        data: ExecutionStarted {
            job_id: job.id,
            status: "started",
            branch_name,
        },
    }))
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// GET /api/v1/tickets/{number}/job
///
/// The latest job for a ticket.
pub async fn get_ticket_job(
    State(state): State<AppState>,
    Path(ticket_number): Path<i64>,
    Query(params): Query<RepoQuery>,
) -> AppResult<impl IntoResponse> {
    let repo = state.target_repo(params.repo);
    let ticket = find_ticket(&state.pool, &repo, ticket_number).await?;

    let job = JobRepo::find_latest_for_ticket(&state.pool, ticket.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: ticket.id,
        }))?;

    Ok(Json(DataResponse {
        data: JobView::from(job),
    }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// A cancel request acts on the latest job while it is still running or
/// already failed. A cancelled running job is force-marked failed,
/// which the guard still accepts, so the cancel action stays
/// repeatable.
fn job_cancellable(status: &str) -> bool {
    status == JobStatus::Running.as_str() || status == JobStatus::Failed.as_str()
}

/// POST /api/v1/tickets/{number}/cancel
///
/// Cancel a running job, or clear a failed one, and put the ticket back
/// to `scoped` so it can be retried. A running job gets its token
/// fired, its session terminated by the executor, and a terminal
/// `failed` row with "Cancelled by user".
pub async fn cancel_ticket_job(
    State(state): State<AppState>,
    Path(ticket_number): Path<i64>,
    Query(params): Query<RepoQuery>,
) -> AppResult<impl IntoResponse> {
    let repo = state.target_repo(params.repo);
    let ticket = find_ticket(&state.pool, &repo, ticket_number).await?;

    let job = JobRepo::find_latest_for_ticket(&state.pool, ticket.id).await?;
    let job = match job {
        Some(job) if job_cancellable(&job.status) => job,
        _ => {
            return Err(AppError::BadRequest(
                "No running or failed job to cancel".into(),
            ))
        }
    };

    if job.status == JobStatus::Running.as_str() {
        let signalled = state.cancellations.cancel(job.id);
        if !signalled {
            tracing::warn!(job_id = %job.id, "no live execution task for running job");
        }
        JobRepo::update_progress(
            &state.pool,
            job.id,
            JobStatus::Failed,
            None,
            None,
            Some("Cancelled by user"),
        )
        .await?;
    }

    TicketRepo::update_status(&state.pool, &repo, ticket_number, TicketStatus::Scoped.as_str())
        .await?;

    let github = state.github_for(Some(&repo));
    best_effort(
        "remove in-progress label",
        github.remove_label(ticket_number, LABEL_IN_PROGRESS),
    )
    .await;

    tracing::info!(job_id = %job.id, repo = %repo, ticket_number, "Execution cancelled");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "status": "cancelled" }),
    }))
}

// ---------------------------------------------------------------------------
// Pull request
// ---------------------------------------------------------------------------

/// GET /api/v1/tickets/{number}/pr
///
/// Summary of the pull request produced for a ticket, built from live
/// GitHub data plus the stored root-issue analysis.
pub async fn get_ticket_pr(
    State(state): State<AppState>,
    Path(ticket_number): Path<i64>,
    Query(params): Query<RepoQuery>,
) -> AppResult<impl IntoResponse> {
    let repo = state.target_repo(params.repo);
    let ticket = find_ticket(&state.pool, &repo, ticket_number).await?;

    let pr_number = ticket.pr_number.ok_or(AppError::Core(CoreError::NotFound {
        entity: "Pull request",
        id: ticket_number,
    }))?;

    let github = state.github_for(Some(&repo));
    let pr = github.get_pull_request(pr_number).await?;
    let files = github.get_pull_request_files(pr_number).await?;

    let problem = ticket
        .scope_data
        .as_ref()
        .and_then(parse_analysis)
        .map(|a| a.root_issue)
        .unwrap_or_else(|| "Issue description".to_string());
    let problem = problem.chars().take(80).collect();

    let solution = match pr.body.as_deref() {
        Some(body) if !body.is_empty() => body.chars().take(200).collect(),
        _ => format!("Implemented fix for issue #{ticket_number}"),
    };

    let files_changed = files
        .into_iter()
        .take(10)
        .map(|f| FileChangeView {
            filename: f.filename,
            additions: f.additions,
            deletions: f.deletions,
        })
        .collect();

    let branch_name = pr
        .head
        .map(|h| h.branch)
        .unwrap_or_else(|| naming::branch_for_issue(ticket_number));

    Ok(Json(DataResponse {
        data: PrSummaryView {
            pr_number: pr.number,
            pr_url: pr.html_url,
            pr_state: pr.state,
            title: pr.title,
            branch_name,
            summary: PrDigest {
                problem,
                solution,
                files_changed,
            },
        },
    }))
}

// ---------------------------------------------------------------------------
// Complete
// ---------------------------------------------------------------------------

/// POST /api/v1/tickets/{number}/complete
///
/// Accept a reviewed ticket: move it to `complete`, swap the review
/// label for implemented, and release any workspace held for the issue.
/// Label and cleanup steps are best-effort.
pub async fn complete_ticket(
    State(state): State<AppState>,
    Path(ticket_number): Path<i64>,
    Query(params): Query<RepoQuery>,
) -> AppResult<impl IntoResponse> {
    let repo = state.target_repo(params.repo);
    let ticket = find_ticket(&state.pool, &repo, ticket_number).await?;

    if parse_status(&ticket.status)? != TicketStatus::Review {
        return Err(AppError::Core(CoreError::Conflict(
            "Ticket must be in 'review' status to mark complete".into(),
        )));
    }

    TicketRepo::update_status(
        &state.pool,
        &repo,
        ticket_number,
        TicketStatus::Complete.as_str(),
    )
    .await?;

    let github = state.github_for(Some(&repo));
    best_effort(
        "remove review label",
        github.remove_label(ticket_number, LABEL_REVIEW),
    )
    .await;
    best_effort(
        "add implemented label",
        github.add_label(ticket_number, LABEL_IMPLEMENTED),
    )
    .await;

    state.provider.cleanup_workspace(ticket_number).await;

    tracing::info!(repo = %repo, ticket_number, "Ticket completed");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "status": "complete" }),
    }))
}
