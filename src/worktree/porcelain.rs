//! Parser for `git worktree list --porcelain`.

use std::path::PathBuf;

/// One record of porcelain output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PorcelainEntry {
    pub path: PathBuf,
    /// HEAD commit id; empty for a bare entry.
    pub head: String,
    /// Short branch name, `None` when detached.
    pub branch: Option<String>,
    pub detached: bool,
    pub bare: bool,
    pub locked: bool,
    /// Git considers the registration dangling (checkout directory is gone).
    pub prunable: bool,
}

/// Parse porcelain output into entries, in git's order (main worktree first).
///
/// Unknown attribute lines are ignored so newer git versions keep parsing.
pub fn parse_porcelain(output: &str) -> Vec<PorcelainEntry> {
    let mut entries = Vec::new();
    let mut current: Option<PorcelainEntry> = None;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = Some(PorcelainEntry {
                path: PathBuf::from(path),
                ..PorcelainEntry::default()
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };

        if let Some(sha) = line.strip_prefix("HEAD ") {
            entry.head = sha.to_string();
        } else if let Some(branch_ref) = line.strip_prefix("branch ") {
            // Branch ref is like "refs/heads/branch-name"
            entry.branch = Some(
                branch_ref
                    .strip_prefix("refs/heads/")
                    .unwrap_or(branch_ref)
                    .to_string(),
            );
        } else if line == "detached" {
            entry.detached = true;
            entry.branch = None;
        } else if line == "bare" {
            entry.bare = true;
        } else if line == "locked" || line.starts_with("locked ") {
            entry.locked = true;
        } else if line == "prunable" || line.starts_with("prunable ") {
            entry.prunable = true;
        }
    }

    if let Some(entry) = current {
        entries.push(entry);
    }

    entries
}
