pub mod health;
pub mod jobs;
pub mod tickets;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /tickets                          list (GitHub merged with state)
/// /tickets/{number}/scope           analyze + persist (GET)
/// /tickets/{number}/execute         start execution (POST)
/// /tickets/{number}/job             latest job (GET)
/// /tickets/{number}/cancel          cancel running/failed job (POST)
/// /tickets/{number}/pr              pull request summary (GET)
/// /tickets/{number}/complete        accept reviewed ticket (POST)
///
/// /jobs/{id}                        job status (GET)
/// /jobs/{id}/cleanup                release workspace (POST)
///
/// /webhooks/github                  acknowledged pass-through (POST)
/// /webhooks/agent                   acknowledged pass-through (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tickets", tickets::router())
        .nest("/jobs", jobs::router())
        .nest("/webhooks", webhooks::router())
}
