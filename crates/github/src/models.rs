//! Serde models for the GitHub API payloads we consume.
//!
//! Only the fields the orchestrator reads are declared; everything else
//! in the payload is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// A GitHub issue (the issues endpoint also returns pull requests,
/// distinguished by the `pull_request` marker).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Issue {
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub html_url: String,
    pub created_at: String,
    pub updated_at: String,
    /// Present iff this "issue" is actually a pull request.
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    /// Whether this entry is a pull request rather than a real issue.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Label names, in API order.
    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }
}

/// An issue label.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Label {
    pub name: String,
}

/// A pull request summary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PullRequest {
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub additions: i64,
    #[serde(default)]
    pub deletions: i64,
    #[serde(default)]
    pub changed_files: i64,
    pub head: Option<PrHead>,
}

/// The source branch of a pull request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrHead {
    #[serde(rename = "ref")]
    pub branch: String,
}

/// One file touched by a pull request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PullRequestFile {
    pub filename: String,
    pub status: String,
    pub additions: i64,
    pub deletions: i64,
    pub patch: Option<String>,
}
