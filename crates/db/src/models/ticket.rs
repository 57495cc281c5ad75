//! Ticket row model.

use issuepilot_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `tickets` table.
///
/// Only orchestration state lives here; issue title, body, and labels
/// are fetched from GitHub on demand. `scope_data` holds the serialized
/// analysis produced when the ticket was last scoped.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Ticket {
    pub id: DbId,
    pub repo: String,
    pub issue_number: i64,
    pub status: String,
    pub scope_data: Option<serde_json::Value>,
    pub pr_number: Option<i64>,
    pub pr_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
