//! GitHub REST client for the issue and pull request surface the
//! orchestrator needs.
//!
//! All GitHub traffic goes through [`GitHubClient`]; handlers never
//! build API URLs themselves. The client is scoped to one repository
//! and is cheap to construct per request.

pub mod client;
pub mod models;

pub use client::{GitHubClient, GitHubError};
pub use models::{Issue, Label, PullRequest, PullRequestFile};
