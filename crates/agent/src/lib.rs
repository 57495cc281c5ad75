//! Execution provider integration and the job execution state machine.
//!
//! A provider runs coding-agent sessions against GitHub issues; the
//! executor drives one session per job through create, poll, and
//! completion, reporting every state change through an
//! [`ExecutionObserver`]. The executor owns job progress only -- ticket
//! state transitions stay with the orchestration layer.

pub mod executor;
pub mod factory;
pub mod provider;
pub mod remote;
pub mod simulated;

pub use executor::{execute, ExecutionContext, ExecutionObserver, ExecutorConfig};
pub use factory::{build_provider, ProviderKind, ProviderSettings};
pub use provider::{
    CreatedSession, ExecutionProvider, ProviderError, PullRequestRef, SessionSnapshot,
    SessionStatus,
};
