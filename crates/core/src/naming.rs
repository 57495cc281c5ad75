//! Deterministic branch and session naming.
//!
//! Every execution attempt for an issue works on the same branch name,
//! derived purely from the issue number. This gives at-most-one logical
//! workspace per ticket: retries reuse the name, and cleanup can find
//! leftovers from a previous attempt without any stored state.

/// Branch namespace for automated fixes.
pub const BRANCH_PREFIX: &str = "agent";

/// Label applied while a ticket is being executed.
pub const LABEL_IN_PROGRESS: &str = "in-progress";

/// Label applied when execution produced a PR awaiting review.
pub const LABEL_REVIEW: &str = "review";

/// Label applied when a reviewed ticket is marked complete.
pub const LABEL_IMPLEMENTED: &str = "implemented";

/// Maximum length of the issue title fragment in a session title.
const SESSION_TITLE_MAX_TITLE_CHARS: usize = 50;

/// Deterministic branch name for an issue, stable across retries.
pub fn branch_for_issue(issue_number: i64) -> String {
    format!("{BRANCH_PREFIX}/issue-{issue_number}")
}

/// Human-readable title for an execution session.
pub fn session_title(issue_number: i64, issue_title: &str) -> String {
    let truncated: String = issue_title
        .chars()
        .take(SESSION_TITLE_MAX_TITLE_CHARS)
        .collect();
    format!("Fix issue #{issue_number}: {truncated}")
}

/// Tags attached to an execution session for later lookup.
pub fn session_tags(issue_number: i64, repo: &str) -> Vec<String> {
    vec![format!("issue-{issue_number}"), repo.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_is_deterministic() {
        assert_eq!(branch_for_issue(42), "agent/issue-42");
        assert_eq!(branch_for_issue(42), branch_for_issue(42));
    }

    #[test]
    fn session_title_truncates_long_titles() {
        let long = "x".repeat(80);
        let title = session_title(7, &long);
        assert_eq!(title, format!("Fix issue #7: {}", "x".repeat(50)));
    }

    #[test]
    fn session_tags_reference_issue_and_repo() {
        assert_eq!(
            session_tags(9, "octo/widgets"),
            vec!["issue-9".to_string(), "octo/widgets".to_string()]
        );
    }
}
