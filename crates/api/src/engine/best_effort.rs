//! Best-effort side effects.

use std::future::Future;

/// Await a fallible side effect, log on failure, and move on.
///
/// Used for every cosmetic mutation (label add/remove, workspace
/// cleanup) so an upstream hiccup never blocks or masks the primary
/// transition.
pub async fn best_effort<T, E: std::fmt::Display>(
    what: &str,
    fut: impl Future<Output = Result<T, E>>,
) {
    if let Err(e) = fut.await {
        tracing::warn!(error = %e, "best-effort step failed: {what}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_are_swallowed() {
        best_effort("test step", async { Err::<(), _>("boom") }).await;
        best_effort("test step", async { Ok::<_, String>(42) }).await;
    }
}
