//! Route definitions for the `/tickets` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tickets;
use crate::state::AppState;

/// Routes mounted at `/tickets`.
///
/// ```text
/// GET    /                        -> list_tickets
/// GET    /{number}/scope          -> scope_ticket
/// POST   /{number}/execute        -> execute_ticket
/// GET    /{number}/job            -> get_ticket_job
/// POST   /{number}/cancel         -> cancel_ticket_job
/// GET    /{number}/pr             -> get_ticket_pr
/// POST   /{number}/complete       -> complete_ticket
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tickets::list_tickets))
        .route("/{number}/scope", get(tickets::scope_ticket))
        .route("/{number}/execute", post(tickets::execute_ticket))
        .route("/{number}/job", get(tickets::get_ticket_job))
        .route("/{number}/cancel", post(tickets::cancel_ticket_job))
        .route("/{number}/pr", get(tickets::get_ticket_pr))
        .route("/{number}/complete", post(tickets::complete_ticket))
}
