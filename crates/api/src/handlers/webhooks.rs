//! Handlers for inbound webhooks.
//!
//! Both endpoints acknowledge receipt without mutating state; polling
//! remains the source of truth for session progress. Wiring these into
//! ticket/job updates requires signature verification first.

use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// POST /api/v1/webhooks/github
///
/// Acknowledge a GitHub event (issues, pull_request).
pub async fn github_webhook(headers: HeaderMap, _body: Json<serde_json::Value>) -> impl IntoResponse {
    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(event_type = %event_type, "GitHub webhook received");

    Json(json!({
        "status": "received",
        "event_type": event_type,
    }))
}

/// POST /api/v1/webhooks/agent
///
/// Acknowledge an execution provider event.
pub async fn agent_webhook(_body: Json<serde_json::Value>) -> impl IntoResponse {
    tracing::debug!("Agent webhook received");

    Json(json!({ "status": "received" }))
}
