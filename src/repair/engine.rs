//! Applies repair actions.

use super::{RepairAction, RepairKind, RepairResult};
use crate::config::Config;
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::events::{self, Event, EventAction};
use crate::git::Git;
use crate::locks::{self, LockDetector, ProcessProbe, SystemProbe};
use crate::worktree::{parse_porcelain, paths_equivalent};
use serde_json::json;
use std::fs;
use std::path::Path;

pub struct RepairEngine {
    ctx: RepoContext,
    git: Git,
    detector: LockDetector,
}

impl RepairEngine {
    pub fn new(ctx: &RepoContext, config: &Config) -> Self {
        Self::with_probe(ctx, config, Box::new(SystemProbe))
    }

    pub fn with_probe(ctx: &RepoContext, config: &Config, probe: Box<dyn ProcessProbe>) -> Self {
        Self {
            ctx: ctx.clone(),
            git: Git::with_timeout(config.command_timeout()),
            detector: LockDetector::with_probe(config, probe),
        }
    }

    /// Apply every action independently.
    ///
    /// Returns one result per action in input order; a failed action does not
    /// stop the ones after it.
    pub fn apply(&self, actions: &[RepairAction]) -> Vec<RepairResult> {
        actions
            .iter()
            .map(|action| {
                let result = match self.run(&action.kind) {
                    Ok(message) => RepairResult::ok(message),
                    Err(e) => {
                        tracing::warn!(action = action.kind.name(), error = %e, "repair failed");
                        RepairResult::failed(action.description.clone(), e)
                    }
                };
                self.log(action, &result);
                result
            })
            .collect()
    }

    fn run(&self, kind: &RepairKind) -> Result<String> {
        match kind {
            RepairKind::RemoveStaleLock { path } => self.remove_stale_lock(path),
            RepairKind::PruneRegistrations => {
                self.git.run(&self.ctx.repo_root, &["worktree", "prune"])?;
                Ok("Pruned dangling worktree registrations".to_string())
            }
            RepairKind::RecreateBranchRef { branch, commit } => {
                self.recreate_branch_ref(branch, commit)
            }
            RepairKind::RemoveOrphanDirectory { path } => self.remove_orphan_directory(path),
        }
    }

    fn remove_stale_lock(&self, path: &Path) -> Result<String> {
        // Re-probe: the owner may have come back since the health check.
        let Some(lock) = self.detector.inspect(path) else {
            return Ok(format!("Lock {} already gone", path.display()));
        };

        if lock.process_alive {
            return Err(ArborError::LockError(format!(
                "{} is now held by a running process; left in place",
                path.display()
            )));
        }

        locks::remove(&lock)?;
        Ok(format!("Removed stale lock {}", path.display()))
    }

    fn recreate_branch_ref(&self, branch: &str, commit: &str) -> Result<String> {
        let full_ref = format!("refs/heads/{}", branch);
        if self.git.check(
            &self.ctx.repo_root,
            &["rev-parse", "--verify", "--quiet", &full_ref],
        )? {
            return Ok(format!("Branch '{}' already exists", branch));
        }

        // Empty old value: only create, never overwrite.
        self.git.run(
            &self.ctx.repo_root,
            &["update-ref", "-m", "arbor repair", &full_ref, commit, ""],
        )?;
        Ok(format!("Recreated branch '{}' at {}", branch, commit))
    }

    fn remove_orphan_directory(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Ok(format!("{} already removed", path.display()));
        }

        let inside = match (path.canonicalize(), self.ctx.worktrees_dir.canonicalize()) {
            (Ok(p), Ok(root)) => p.starts_with(&root) && p != root,
            _ => false,
        };
        if !inside {
            return Err(ArborError::UserError(format!(
                "refusing to delete {}: not inside {}",
                path.display(),
                self.ctx.worktrees_dir.display()
            )));
        }

        let listing = self
            .git
            .run(&self.ctx.repo_root, &["worktree", "list", "--porcelain"])?;
        if parse_porcelain(&listing.stdout)
            .iter()
            .any(|e| paths_equivalent(&e.path, path))
        {
            return Err(ArborError::UserError(format!(
                "refusing to delete {}: it is a registered worktree",
                path.display()
            )));
        }

        fs::remove_dir_all(path).map_err(|e| {
            ArborError::UserError(format!("failed to delete {}: {}", path.display(), e))
        })?;
        Ok(format!("Deleted {}", path.display()))
    }

    fn log(&self, action: &RepairAction, result: &RepairResult) {
        let mut event = Event::new(EventAction::Repair).with_details(json!({
            "kind": action.kind.name(),
            "description": action.description,
            "safe": action.safe,
            "success": result.success,
            "message": result.message,
            "error": result.error,
        }));
        if let Some(target) = &action.target {
            event = event.with_worktree(target);
        }
        events::record(&self.ctx, event);
    }
}
