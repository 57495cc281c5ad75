//! Ticket and job lifecycle statuses with transition rules.
//!
//! Statuses are stored as text in the database; the enums here provide
//! the string mapping plus the transition graph the orchestration layer
//! enforces. The `core` crate never mutates state itself -- callers ask
//! [`TicketStatus::can_transition`] before writing.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TICKET_STATUS_NEW: &str = "new";
pub const TICKET_STATUS_SCOPED: &str = "scoped";
pub const TICKET_STATUS_IN_PROGRESS: &str = "in_progress";
pub const TICKET_STATUS_REVIEW: &str = "review";
pub const TICKET_STATUS_COMPLETE: &str = "complete";

/// All valid ticket status strings.
pub const VALID_TICKET_STATUSES: &[&str] = &[
    TICKET_STATUS_NEW,
    TICKET_STATUS_SCOPED,
    TICKET_STATUS_IN_PROGRESS,
    TICKET_STATUS_REVIEW,
    TICKET_STATUS_COMPLETE,
];

pub const JOB_STATUS_PENDING: &str = "pending";
pub const JOB_STATUS_RUNNING: &str = "running";
pub const JOB_STATUS_COMPLETED: &str = "completed";
pub const JOB_STATUS_FAILED: &str = "failed";
pub const JOB_STATUS_CANCELLED: &str = "cancelled";

/// All valid job status strings.
pub const VALID_JOB_STATUSES: &[&str] = &[
    JOB_STATUS_PENDING,
    JOB_STATUS_RUNNING,
    JOB_STATUS_COMPLETED,
    JOB_STATUS_FAILED,
    JOB_STATUS_CANCELLED,
];

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a tracked ticket.
///
/// ```text
/// new -> scoped -> in_progress -> review -> complete
///           ^           |
///           +-----------+   (execution failure or cancel)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    Scoped,
    InProgress,
    Review,
    Complete,
}

impl TicketStatus {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            TICKET_STATUS_NEW => Ok(Self::New),
            TICKET_STATUS_SCOPED => Ok(Self::Scoped),
            TICKET_STATUS_IN_PROGRESS => Ok(Self::InProgress),
            TICKET_STATUS_REVIEW => Ok(Self::Review),
            TICKET_STATUS_COMPLETE => Ok(Self::Complete),
            _ => Err(format!(
                "Invalid ticket status '{s}'. Must be one of: {}",
                VALID_TICKET_STATUSES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => TICKET_STATUS_NEW,
            Self::Scoped => TICKET_STATUS_SCOPED,
            Self::InProgress => TICKET_STATUS_IN_PROGRESS,
            Self::Review => TICKET_STATUS_REVIEW,
            Self::Complete => TICKET_STATUS_COMPLETE,
        }
    }

    /// Whether this ticket carries a stored analysis.
    ///
    /// `scope_data` is present iff the ticket has been scoped at least
    /// once and has not been reset to `new`.
    pub fn has_scope_data(&self) -> bool {
        !matches!(self, Self::New)
    }

    /// Whether the transition `self -> to` is an edge of the lifecycle
    /// graph.
    ///
    /// `Scoped -> Scoped` is permitted: a fresh scope request replaces
    /// the prior analysis. `InProgress -> Scoped` is the recovery edge
    /// taken on execution failure or explicit cancellation.
    pub fn can_transition(&self, to: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, to),
            (New, Scoped)
                | (Scoped, Scoped)
                | (Scoped, InProgress)
                | (InProgress, Review)
                | (InProgress, Scoped)
                | (Review, Complete)
        )
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Status of a single execution attempt.
///
/// `pending -> running -> {completed | failed | cancelled}`; the three
/// right-hand states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            JOB_STATUS_PENDING => Ok(Self::Pending),
            JOB_STATUS_RUNNING => Ok(Self::Running),
            JOB_STATUS_COMPLETED => Ok(Self::Completed),
            JOB_STATUS_FAILED => Ok(Self::Failed),
            JOB_STATUS_CANCELLED => Ok(Self::Cancelled),
            _ => Err(format!(
                "Invalid job status '{s}'. Must be one of: {}",
                VALID_JOB_STATUSES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => JOB_STATUS_PENDING,
            Self::Running => JOB_STATUS_RUNNING,
            Self::Completed => JOB_STATUS_COMPLETED,
            Self::Failed => JOB_STATUS_FAILED,
            Self::Cancelled => JOB_STATUS_CANCELLED,
        }
    }

    /// Terminal states never transition again; `completed_at` is set
    /// exactly when a job enters one of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// At most one active (pending or running) job may exist per ticket.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- TicketStatus string mapping ------------------------------------------

    #[test]
    fn ticket_status_round_trips_through_strings() {
        for status in &[
            TicketStatus::New,
            TicketStatus::Scoped,
            TicketStatus::InProgress,
            TicketStatus::Review,
            TicketStatus::Complete,
        ] {
            assert_eq!(
                TicketStatus::from_str_value(status.as_str()).unwrap(),
                *status
            );
        }
    }

    #[test]
    fn ticket_status_invalid_string_rejected() {
        let result = TicketStatus::from_str_value("todo");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid ticket status"));
    }

    // -- Ticket transition graph ----------------------------------------------

    #[test]
    fn happy_path_edges_allowed() {
        assert!(TicketStatus::New.can_transition(TicketStatus::Scoped));
        assert!(TicketStatus::Scoped.can_transition(TicketStatus::InProgress));
        assert!(TicketStatus::InProgress.can_transition(TicketStatus::Review));
        assert!(TicketStatus::Review.can_transition(TicketStatus::Complete));
    }

    #[test]
    fn recovery_edge_allowed() {
        assert!(TicketStatus::InProgress.can_transition(TicketStatus::Scoped));
    }

    #[test]
    fn rescope_allowed() {
        assert!(TicketStatus::Scoped.can_transition(TicketStatus::Scoped));
    }

    #[test]
    fn execute_requires_scoped() {
        assert!(!TicketStatus::New.can_transition(TicketStatus::InProgress));
        assert!(!TicketStatus::Review.can_transition(TicketStatus::InProgress));
        assert!(!TicketStatus::Complete.can_transition(TicketStatus::InProgress));
    }

    #[test]
    fn complete_is_terminal() {
        for to in &[
            TicketStatus::New,
            TicketStatus::Scoped,
            TicketStatus::InProgress,
            TicketStatus::Review,
            TicketStatus::Complete,
        ] {
            assert!(!TicketStatus::Complete.can_transition(*to));
        }
    }

    #[test]
    fn no_skipping_review() {
        assert!(!TicketStatus::InProgress.can_transition(TicketStatus::Complete));
        assert!(!TicketStatus::Scoped.can_transition(TicketStatus::Complete));
    }

    #[test]
    fn scope_data_presence_follows_status() {
        assert!(!TicketStatus::New.has_scope_data());
        assert!(TicketStatus::Scoped.has_scope_data());
        assert!(TicketStatus::InProgress.has_scope_data());
        assert!(TicketStatus::Review.has_scope_data());
        assert!(TicketStatus::Complete.has_scope_data());
    }

    // -- JobStatus ------------------------------------------------------------

    #[test]
    fn job_status_round_trips_through_strings() {
        for status in &[
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::from_str_value(status.as_str()).unwrap(), *status);
        }
    }

    #[test]
    fn terminal_and_active_partition_job_statuses() {
        assert!(JobStatus::Pending.is_active());
        assert!(JobStatus::Running.is_active());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        for status in VALID_JOB_STATUSES {
            let parsed = JobStatus::from_str_value(status).unwrap();
            assert!(parsed.is_terminal() != parsed.is_active());
        }
    }
}
