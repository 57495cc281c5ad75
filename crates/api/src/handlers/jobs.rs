//! Handlers for the `/jobs` resource.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use issuepilot_core::error::CoreError;
use issuepilot_core::status::JobStatus;
use issuepilot_db::models::job::Job;
use issuepilot_db::repositories::{JobRepo, TicketRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::tickets::JobView;
use crate::response::DataResponse;
use crate::state::AppState;

async fn find_job(pool: &issuepilot_db::DbPool, job_id: Uuid) -> AppResult<Job> {
    JobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Job {job_id} not found")))
}

/// GET /api/v1/jobs/{id}
///
/// Current status of a job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state.pool, job_id).await?;
    Ok(Json(DataResponse {
        data: JobView::from(job),
    }))
}

/// POST /api/v1/jobs/{id}/cleanup
///
/// Release the workspace held for a terminal job's issue. Useful when
/// automatic cleanup failed.
pub async fn cleanup_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state.pool, job_id).await?;

    let terminal = JobStatus::from_str_value(&job.status)
        .map_err(AppError::InternalError)?
        .is_terminal();
    if !terminal {
        return Err(AppError::Core(CoreError::Conflict(
            "Can only clean up completed, failed, or cancelled jobs".into(),
        )));
    }

    let ticket = TicketRepo::find_by_id(&state.pool, job.ticket_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Ticket",
            id: job.ticket_id,
        }))?;

    state.provider.cleanup_workspace(ticket.issue_number).await;

    tracing::info!(job_id = %job_id, issue_number = ticket.issue_number, "Workspace cleaned up");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "status": "cleaned", "job_id": job_id }),
    }))
}
