//! Execution job row model.

use issuepilot_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `jobs` table: one execution attempt for a ticket.
///
/// `completed_at` is set exactly when the job enters a terminal status
/// (completed, failed, or cancelled).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub ticket_id: DbId,
    pub status: String,
    pub current_step: Option<String>,
    pub steps_completed: i32,
    pub total_steps: i32,
    pub error_message: Option<String>,
    pub session_url: Option<String>,
    pub branch_name: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}
