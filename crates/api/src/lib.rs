//! HTTP surface and orchestration wiring for the ticket execution
//! service.
//!
//! Handlers are thin: they enforce lifecycle guards, call repositories
//! and clients, and delegate long-running execution to the engine,
//! which runs jobs on background tasks and reports progress back
//! through the database.

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
