//! Background execution wiring: cancellation registry, best-effort
//! side effects, and the observer that persists executor progress.

pub mod best_effort;
pub mod cancel;
pub mod orchestrator;

pub use best_effort::best_effort;
pub use orchestrator::spawn_execution;
