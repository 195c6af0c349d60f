//! Branch operations (create, check existence, delete, list).

use crate::error::{ArborError, Result};
use crate::git::Git;
use std::collections::HashSet;
use std::path::Path;

/// Check if a branch exists locally.
pub fn branch_exists<P: AsRef<Path>>(git: &Git, repo_root: P, branch: &str) -> Result<bool> {
    if branch.is_empty() {
        return Ok(false);
    }
    git.check(
        repo_root,
        &["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", branch)],
    )
}

/// Create a new branch at the specified commit.
pub fn create_branch<P: AsRef<Path>>(
    git: &Git,
    repo_root: P,
    branch: &str,
    base: &str,
) -> Result<()> {
    git.run(repo_root, &["branch", branch, base]).map_err(|e| {
        ArborError::GitError(format!(
            "failed to create branch '{}' at {}: {}",
            branch, base, e
        ))
    })?;
    Ok(())
}

/// Delete a branch.
///
/// Uses `git branch -d` (requires fully merged) unless `force` is set, in
/// which case `-D` is used.
pub fn delete_branch<P: AsRef<Path>>(
    git: &Git,
    repo_root: P,
    branch: &str,
    force: bool,
) -> Result<()> {
    let delete_flag = if force { "-D" } else { "-d" };

    git.run(repo_root, &["branch", delete_flag, branch]).map_err(|e| {
        let force_hint = if !force {
            "\n\nIf the branch is not fully merged and you want to delete it anyway,\n\
             re-run with --force."
        } else {
            ""
        };

        ArborError::GitError(format!(
            "failed to delete branch '{}': {}{}",
            branch, e, force_hint
        ))
    })?;

    Ok(())
}

/// Every local branch name, read once with `for-each-ref`.
pub fn local_branches<P: AsRef<Path>>(git: &Git, repo_root: P) -> Result<HashSet<String>> {
    let output = git.run(
        repo_root,
        &["for-each-ref", "--format=%(refname:short)", "refs/heads/"],
    )?;
    Ok(output.lines().into_iter().map(str::to_string).collect())
}

/// Local branches git reports as fully merged into `target`, excluding `target` itself.
pub fn merged_branches<P: AsRef<Path>>(
    git: &Git,
    repo_root: P,
    target: &str,
) -> Result<HashSet<String>> {
    let output = git.run(
        repo_root,
        &["branch", "--merged", target, "--format=%(refname:short)"],
    )?;
    Ok(output
        .lines()
        .into_iter()
        .filter(|b| *b != target)
        .map(str::to_string)
        .collect())
}
