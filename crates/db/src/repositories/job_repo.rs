//! Repository for the `jobs` table.

use sqlx::PgPool;
use uuid::Uuid;

use issuepilot_core::status::JobStatus;
use issuepilot_core::types::DbId;

use crate::models::job::Job;

/// Column list for jobs queries.
const COLUMNS: &str = "id, ticket_id, status, current_step, steps_completed, total_steps, \
    error_message, session_url, branch_name, started_at, completed_at";

/// CRUD operations for execution jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a job for a ticket, already in running status since the
    /// execution task is spawned in the same request.
    pub async fn create(pool: &PgPool, ticket_id: DbId) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (id, ticket_id, status)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(Uuid::new_v4())
            .bind(ticket_id)
            .bind(JobStatus::Running.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all jobs for a ticket, newest first.
    pub async fn list_for_ticket(pool: &PgPool, ticket_id: DbId) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs
             WHERE ticket_id = $1
             ORDER BY started_at DESC"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(ticket_id)
            .fetch_all(pool)
            .await
    }

    /// Find the most recent job for a ticket.
    pub async fn find_latest_for_ticket(
        pool: &PgPool,
        ticket_id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs
             WHERE ticket_id = $1
             ORDER BY started_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(ticket_id)
            .fetch_optional(pool)
            .await
    }

    /// Update job status and progress. `None` fields keep their current
    /// value; `completed_at` is stamped exactly when the new status is
    /// terminal. A terminal row is never replaced by a non-terminal
    /// status: a cancel landing between two polls would otherwise be
    /// overwritten by the running progress event already under way.
    /// Returns `true` if a row was updated.
    pub async fn update_progress(
        pool: &PgPool,
        id: Uuid,
        status: JobStatus,
        current_step: Option<&str>,
        steps_completed: Option<i32>,
        error_message: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET
                status = $2,
                current_step = COALESCE($3, current_step),
                steps_completed = COALESCE($4, steps_completed),
                error_message = COALESCE($5, error_message),
                completed_at = CASE WHEN $6 THEN now() ELSE completed_at END
             WHERE id = $1
               AND NOT (status IN ('completed', 'failed', 'cancelled') AND NOT $6)",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(current_step)
        .bind(steps_completed)
        .bind(error_message)
        .bind(status.is_terminal())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the session URL and working branch for a job. Returns
    /// `true` if a row was updated.
    pub async fn update_session_info(
        pool: &PgPool,
        id: Uuid,
        session_url: Option<&str>,
        branch_name: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET session_url = $1, branch_name = $2
             WHERE id = $3",
        )
        .bind(session_url)
        .bind(branch_name)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
