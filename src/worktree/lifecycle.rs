//! Creating and removing worktrees.

use super::branch::{branch_exists, delete_branch};
use super::inventory::Inventory;
use super::model::Worktree;
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::events::{self, Event, EventAction};
use crate::session::{SessionBackend, SessionStore};
use serde_json::json;
use std::path::{Path, PathBuf};

/// How the branch for a new worktree is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateMode {
    /// Create the branch, starting at `base` (default branch when `None`).
    NewBranch { base: Option<String> },
    /// Check out a branch that already exists.
    ExistingBranch,
}

/// Result of creating or reusing a worktree.
#[derive(Debug, Clone)]
pub struct CreatedWorktree {
    pub path: PathBuf,
    pub branch: String,
    /// An existing worktree for the branch was returned instead of a new one.
    pub reused: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    /// Remove even with uncommitted changes or a lock; force-delete the branch.
    pub force: bool,
    pub delete_branch: bool,
}

/// What a removal did beyond removing the checkout.
#[derive(Debug, Clone, Default)]
pub struct RemovalReport {
    pub path: PathBuf,
    pub branch_deleted: bool,
    /// Session metadata records deleted with the worktree.
    pub sessions_removed: Vec<String>,
    /// Follow-up steps that failed after the checkout itself was removed.
    pub warnings: Vec<String>,
}

/// Create a worktree for `branch` under the configured worktrees directory.
///
/// A worktree already bound to the branch is reused rather than duplicated.
pub fn create_worktree(
    ctx: &RepoContext,
    inventory: &Inventory,
    branch: &str,
    mode: &CreateMode,
) -> Result<CreatedWorktree> {
    let git = inventory.git();

    if branch.is_empty()
        || !git.check(&ctx.repo_root, &["check-ref-format", "--branch", branch])?
    {
        return Err(ArborError::UserError(format!(
            "'{}' is not a valid branch name",
            branch
        )));
    }

    if let Some(existing) = inventory.get_for_branch(branch)? {
        return Ok(CreatedWorktree {
            path: existing.path,
            branch: branch.to_string(),
            reused: true,
        });
    }

    let worktree_path = ctx.worktree_path_for_branch(branch);
    if worktree_path.exists() {
        return Err(ArborError::UserError(format!(
            "path '{}' already exists but is not a worktree for '{}'.\n\n\
             Remove the directory manually or run `arbor health-check --all`.",
            worktree_path.display(),
            branch
        )));
    }

    std::fs::create_dir_all(&ctx.worktrees_dir).map_err(|e| {
        ArborError::UserError(format!(
            "failed to create worktrees directory '{}': {}",
            ctx.worktrees_dir.display(),
            e
        ))
    })?;

    let path_str = worktree_path.to_string_lossy().to_string();
    let exists = branch_exists(git, &ctx.repo_root, branch)?;

    match mode {
        CreateMode::NewBranch { base } => {
            if exists {
                return Err(ArborError::UserError(format!(
                    "branch '{}' already exists. Use --existing to check it out.",
                    branch
                )));
            }
            let base = match base {
                Some(b) => b.clone(),
                None => inventory.default_branch()?,
            };
            git.run(
                &ctx.repo_root,
                &["worktree", "add", "-b", branch, &path_str, &base],
            )
            .map_err(|e| {
                ArborError::GitError(format!(
                    "failed to create worktree at '{}' for new branch '{}': {}",
                    path_str, branch, e
                ))
            })?;
        }
        CreateMode::ExistingBranch => {
            if !exists {
                return Err(ArborError::UserError(format!(
                    "branch '{}' does not exist. Drop --existing to create it.",
                    branch
                )));
            }
            git.run(&ctx.repo_root, &["worktree", "add", &path_str, branch])
                .map_err(|e| {
                    ArborError::GitError(format!(
                        "failed to create worktree at '{}' for branch '{}': {}",
                        path_str, branch, e
                    ))
                })?;
        }
    }

    let path = worktree_path.canonicalize().unwrap_or(worktree_path);
    events::record(
        ctx,
        Event::new(EventAction::WorktreeCreate)
            .with_worktree(&path)
            .with_details(json!({
                "branch": branch,
                "new_branch": matches!(mode, CreateMode::NewBranch { .. }),
            })),
    );

    Ok(CreatedWorktree {
        path,
        branch: branch.to_string(),
        reused: false,
    })
}

/// Remove a secondary worktree and everything bound to it.
///
/// The checkout is removed first; only then are live sessions killed and
/// session metadata deleted. A checkout that is already gone from disk is
/// handled by pruning its registration.
pub fn remove_worktree(
    ctx: &RepoContext,
    inventory: &Inventory,
    target: &Worktree,
    opts: RemoveOptions,
    store: &SessionStore,
    backend: Option<&dyn SessionBackend>,
) -> Result<RemovalReport> {
    if target.is_main {
        return Err(ArborError::UserError(format!(
            "refusing to remove the main worktree '{}'",
            target.path.display()
        )));
    }
    if target.locked && !opts.force {
        return Err(ArborError::UserError(format!(
            "worktree '{}' is locked. Unlock it with `git worktree unlock` or pass --force.",
            target.path.display()
        )));
    }

    let git = inventory.git();
    let path_str = target.path.to_string_lossy().to_string();

    if target.path.exists() {
        let mut args = vec!["worktree", "remove"];
        if opts.force {
            args.push("--force");
            if target.locked {
                args.push("--force");
            }
        }
        args.push(&path_str);

        git.run(&ctx.repo_root, &args).map_err(|e| {
            let force_hint = if !opts.force {
                "\n\nIf the worktree has uncommitted changes and you want to remove it anyway,\n\
                 re-run with --force (review the changes first)."
            } else {
                ""
            };
            ArborError::GitError(format!(
                "failed to remove worktree '{}': {}{}",
                path_str, e, force_hint
            ))
        })?;
    } else {
        git.run(&ctx.repo_root, &["worktree", "prune"])?;
    }

    let mut report = RemovalReport {
        path: target.path.clone(),
        ..RemovalReport::default()
    };

    remove_bound_sessions(ctx, &target.path, store, backend, &mut report);

    if opts.delete_branch && !target.branch.is_empty() {
        match branch_exists(git, &ctx.repo_root, &target.branch) {
            Ok(true) => match delete_branch(git, &ctx.repo_root, &target.branch, opts.force) {
                Ok(()) => report.branch_deleted = true,
                Err(e) => report.warnings.push(e.to_string()),
            },
            Ok(false) => {}
            Err(e) => report.warnings.push(e.to_string()),
        }
    }

    events::record(
        ctx,
        Event::new(EventAction::WorktreeRemove)
            .with_worktree(&target.path)
            .with_details(json!({
                "branch": target.branch,
                "force": opts.force,
                "branch_deleted": report.branch_deleted,
                "sessions_removed": report.sessions_removed,
            })),
    );

    Ok(report)
}

fn remove_bound_sessions(
    ctx: &RepoContext,
    worktree: &Path,
    store: &SessionStore,
    backend: Option<&dyn SessionBackend>,
    report: &mut RemovalReport,
) {
    let bound = match store.list_for_worktree(worktree) {
        Ok(bound) => bound,
        Err(e) => {
            report
                .warnings
                .push(format!("could not read session metadata: {}", e));
            return;
        }
    };

    for meta in bound {
        let name = meta.session_name;
        if let Some(backend) = backend
            && backend.has_session(&name).unwrap_or(false)
            && let Err(e) = backend.kill_session(&name)
        {
            report
                .warnings
                .push(format!("failed to stop session '{}': {}", name, e));
        }

        match store.delete(&name) {
            Ok(()) => {
                events::record(
                    ctx,
                    Event::new(EventAction::SessionRemove)
                        .with_session(&name)
                        .with_worktree(worktree),
                );
                report.sessions_removed.push(name);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => report
                .warnings
                .push(format!("failed to delete session metadata '{}': {}", name, e)),
        }
    }
}

/// Check if two paths refer to the same location, resolving symlinks when both exist.
pub fn paths_equivalent(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a_canon), Ok(b_canon)) => a_canon == b_canon,
        _ => a == b,
    }
}
