//! Repair Engine for arbor.
//!
//! Turns health-check issues into repair actions, splits them into safe and
//! unsafe sets, and applies them one by one.
//!
//! - Safe actions cannot lose user data (stale lock removal, pruning dangling
//!   registrations, re-pointing a deleted branch at its last commit). Callers
//!   may apply them without asking.
//! - Unsafe actions (deleting an unregistered checkout directory) must only be
//!   handed to [`RepairEngine::apply`] after the user confirmed them. The
//!   engine itself never prompts.
//!
//! Every action is idempotent: repairing a condition that is already healthy
//! succeeds without changing anything.

mod engine;

#[cfg(test)]
mod tests;

use crate::health::HealthCheckResult;
use std::collections::HashSet;
use std::path::PathBuf;

pub use engine::RepairEngine;

/// Which remediation routine applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RepairKind {
    /// Delete a lock file whose owner is gone.
    RemoveStaleLock { path: PathBuf },
    /// `git worktree prune`; repository-wide.
    PruneRegistrations,
    /// Point a deleted branch ref back at its last known commit.
    RecreateBranchRef { branch: String, commit: String },
    /// Delete a checkout directory git no longer knows about.
    RemoveOrphanDirectory { path: PathBuf },
}

impl RepairKind {
    /// Whether the action can run without confirmation.
    pub fn is_safe(&self) -> bool {
        match self {
            RepairKind::RemoveStaleLock { .. }
            | RepairKind::PruneRegistrations
            | RepairKind::RecreateBranchRef { .. } => true,
            RepairKind::RemoveOrphanDirectory { .. } => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RepairKind::RemoveStaleLock { .. } => "remove_stale_lock",
            RepairKind::PruneRegistrations => "prune_registrations",
            RepairKind::RecreateBranchRef { .. } => "recreate_branch_ref",
            RepairKind::RemoveOrphanDirectory { .. } => "remove_orphan_directory",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RepairKind::RemoveStaleLock { path } => {
                format!("Remove stale lock {}", path.display())
            }
            RepairKind::PruneRegistrations => "Prune dangling worktree registrations".to_string(),
            RepairKind::RecreateBranchRef { branch, commit } => {
                format!("Recreate branch '{}' at {}", branch, short_sha(commit))
            }
            RepairKind::RemoveOrphanDirectory { path } => {
                format!("Delete unregistered directory {}", path.display())
            }
        }
    }
}

/// A proposed remediation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairAction {
    pub kind: RepairKind,
    pub description: String,
    /// Worktree the action targets; `None` for repository-wide actions.
    pub target: Option<PathBuf>,
    pub safe: bool,
}

impl RepairAction {
    pub fn new(kind: RepairKind, target: Option<PathBuf>) -> Self {
        Self {
            description: kind.describe(),
            safe: kind.is_safe(),
            target,
            kind,
        }
    }
}

/// Outcome of one applied action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairResult {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

impl RepairResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.to_string()),
        }
    }
}

/// One action per repairable issue, deduplicated, in issue order.
pub fn plan_actions(results: &[HealthCheckResult]) -> Vec<RepairAction> {
    let mut seen: HashSet<&RepairKind> = HashSet::new();
    let mut actions = Vec::new();

    for result in results {
        for issue in &result.issues {
            let Some(kind) = &issue.repair else {
                continue;
            };
            if !seen.insert(kind) {
                continue;
            }
            let target = match kind {
                RepairKind::PruneRegistrations => None,
                _ if result.repository => None,
                _ => Some(result.path.clone()),
            };
            actions.push(RepairAction::new(kind.clone(), target));
        }
    }

    actions
}

/// Split actions into `(safe, unsafe)`, keeping their order.
pub fn partition(actions: Vec<RepairAction>) -> (Vec<RepairAction>, Vec<RepairAction>) {
    actions.into_iter().partition(|a| a.safe)
}

fn short_sha(commit: &str) -> &str {
    commit.get(..10).unwrap_or(commit)
}
