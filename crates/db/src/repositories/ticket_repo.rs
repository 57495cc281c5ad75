//! Repository for the `tickets` table.

use sqlx::PgPool;

use issuepilot_core::types::DbId;

use crate::models::ticket::Ticket;

/// Column list for tickets queries.
const COLUMNS: &str =
    "id, repo, issue_number, status, scope_data, pr_number, pr_url, created_at, updated_at";

/// CRUD operations for ticket orchestration state.
///
/// Tickets are keyed by `(repo, issue_number)`; every update targets
/// that pair and reports whether a row was touched.
pub struct TicketRepo;

impl TicketRepo {
    /// Insert a ticket for an issue, or touch `updated_at` if one
    /// already exists. Returns the stored row either way.
    pub async fn upsert(
        pool: &PgPool,
        repo: &str,
        issue_number: i64,
    ) -> Result<Ticket, sqlx::Error> {
        let query = format!(
            "INSERT INTO tickets (repo, issue_number)
             VALUES ($1, $2)
             ON CONFLICT (repo, issue_number) DO UPDATE SET updated_at = now()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(repo)
            .bind(issue_number)
            .fetch_one(pool)
            .await
    }

    /// Find a ticket by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1");
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a ticket by repository and issue number.
    pub async fn find_by_repo_and_number(
        pool: &PgPool,
        repo: &str,
        issue_number: i64,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE repo = $1 AND issue_number = $2");
        sqlx::query_as::<_, Ticket>(&query)
            .bind(repo)
            .bind(issue_number)
            .fetch_optional(pool)
            .await
    }

    /// List all tickets tracked for a repository.
    pub async fn list_for_repo(pool: &PgPool, repo: &str) -> Result<Vec<Ticket>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE repo = $1");
        sqlx::query_as::<_, Ticket>(&query)
            .bind(repo)
            .fetch_all(pool)
            .await
    }

    /// Update a ticket's status. Returns `true` if a row was updated.
    pub async fn update_status(
        pool: &PgPool,
        repo: &str,
        issue_number: i64,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tickets SET status = $1, updated_at = now()
             WHERE repo = $2 AND issue_number = $3",
        )
        .bind(status)
        .bind(repo)
        .bind(issue_number)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a ticket's stored analysis. Returns `true` if a row was
    /// updated.
    pub async fn update_scope_data(
        pool: &PgPool,
        repo: &str,
        issue_number: i64,
        scope_data: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tickets SET scope_data = $1, updated_at = now()
             WHERE repo = $2 AND issue_number = $3",
        )
        .bind(scope_data)
        .bind(repo)
        .bind(issue_number)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the pull request produced for a ticket. Returns `true` if
    /// a row was updated.
    pub async fn set_pull_request(
        pool: &PgPool,
        repo: &str,
        issue_number: i64,
        pr_number: Option<i64>,
        pr_url: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tickets SET pr_number = $1, pr_url = $2, updated_at = now()
             WHERE repo = $3 AND issue_number = $4",
        )
        .bind(pr_number)
        .bind(pr_url)
        .bind(repo)
        .bind(issue_number)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
