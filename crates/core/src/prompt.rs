//! Task prompt synthesis for execution sessions.

/// Build the task prompt handed to the execution provider.
///
/// The prompt carries the full issue text plus explicit instructions to
/// open a pull request whose description references the issue number,
/// so the completed session can be reconciled back to the ticket.
pub fn execution_prompt(repo: &str, issue_number: i64, title: &str, body: &str) -> String {
    format!(
        "Please fix the following GitHub issue in the repository {repo}:\n\
         \n\
         Issue #{issue_number}: {title}\n\
         \n\
         {body}\n\
         \n\
         Instructions:\n\
         1. Clone the repository {repo}\n\
         2. Analyze the issue and understand what needs to be fixed\n\
         3. Implement the fix with proper code changes\n\
         4. Create a pull request with your changes\n\
         5. Make sure the PR description references issue #{issue_number}\n\
         \n\
         Please create a PR when you're done."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_references_repo_and_issue() {
        let prompt = execution_prompt("octo/widgets", 42, "Login broken", "Details here");
        assert!(prompt.contains("repository octo/widgets"));
        assert!(prompt.contains("Issue #42: Login broken"));
        assert!(prompt.contains("Details here"));
        assert!(prompt.contains("references issue #42"));
    }
}
