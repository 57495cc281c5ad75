//! Pure domain logic for the ticket automation platform.
//!
//! This crate contains no I/O: scoring, status transition rules,
//! branch/session naming, and prompt synthesis are all deterministic
//! functions over data the caller has already loaded.

pub mod error;
pub mod naming;
pub mod prompt;
pub mod scoring;
pub mod status;
pub mod types;
