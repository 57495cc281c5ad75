//! Cancellation registry for in-flight executions.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Maps running job IDs to their cancellation tokens.
///
/// An entry exists exactly while the job's execution task is alive:
/// registered before the task is spawned, removed either by a cancel
/// request (which consumes the entry and fires the token) or by the
/// task itself when it ends.
#[derive(Default)]
pub struct CancelRegistry {
    inner: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl CancelRegistry {
    /// Create and register a token for a job.
    pub fn register(&self, job_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job_id, token.clone());
        token
    }

    /// Signal cancellation for a job, consuming its entry. Returns
    /// `false` if no execution is registered for the job.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        let token = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&job_id);
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop a job's entry without signalling, called when its task
    /// ends.
    pub fn deregister(&self, job_id: Uuid) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_fires_the_registered_token_once() {
        let registry = CancelRegistry::default();
        let job_id = Uuid::new_v4();
        let token = registry.register(job_id);

        assert!(!token.is_cancelled());
        assert!(registry.cancel(job_id));
        assert!(token.is_cancelled());
        // The entry was consumed.
        assert!(!registry.cancel(job_id));
    }

    #[test]
    fn cancel_of_unknown_job_is_a_noop() {
        let registry = CancelRegistry::default();
        assert!(!registry.cancel(Uuid::new_v4()));
    }

    #[test]
    fn deregister_prevents_later_cancellation() {
        let registry = CancelRegistry::default();
        let job_id = Uuid::new_v4();
        let token = registry.register(job_id);

        registry.deregister(job_id);
        assert!(!registry.cancel(job_id));
        assert!(!token.is_cancelled());
    }
}
