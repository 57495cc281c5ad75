//! Route definitions for inbound webhooks.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`.
///
/// ```text
/// POST   /github          -> github_webhook
/// POST   /agent           -> agent_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/github", post(webhooks::github_webhook))
        .route("/agent", post(webhooks::agent_webhook))
}
