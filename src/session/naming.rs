//! Session naming.

/// Session name for a worktree: `<prefix>-<repo>-<branch>`.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `-`; tmux rejects `.` and
/// `:` in session names.
pub fn session_name(prefix: &str, repo: &str, branch: &str) -> String {
    let raw = format!("{}-{}-{}", prefix, repo, branch);
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_name_sanitizes() {
        assert_eq!(
            session_name("arbor", "my.repo", "feature/login"),
            "arbor-my-repo-feature-login"
        );
        assert_eq!(session_name("arbor", "repo", "fix:1"), "arbor-repo-fix-1");
        assert_eq!(session_name("x", "r", "b_2"), "x-r-b_2");
    }
}
