//! The worktree model and its derived predicates.

use crate::config::IssueProviderKind;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Issue or pull-request status reported by an external provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    pub provider: IssueProviderKind,
    /// Provider-side identifier (PR/MR number).
    pub id: String,
    pub closed: bool,
    /// Merged (PR/MR) or completed (issue).
    pub completed: bool,
}

/// One checked-out working copy with its git-derived facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    /// Absolute path of the checkout.
    pub path: PathBuf,
    /// Branch name; empty when detached.
    pub branch: String,
    /// HEAD commit id.
    pub head: String,
    /// Directory creation time (modification time where creation is unsupported).
    pub created: Option<DateTime<Utc>>,
    /// Commits on this worktree not present upstream (or on the default branch).
    pub ahead: u32,
    pub behind: u32,
    pub has_upstream: bool,
    pub is_detached: bool,
    /// Fully merged into the default branch according to `git branch --merged`.
    pub is_branch_merged: bool,
    pub is_main: bool,
    /// Locked with `git worktree lock`.
    pub locked: bool,
    /// Git reports the registration as prunable.
    pub prunable: bool,
    pub path_exists: bool,
    /// The branch ref still resolves. Always true for detached worktrees.
    pub branch_ref_exists: bool,
    pub issue_status: Option<IssueStatus>,
}

impl Worktree {
    /// A worktree record with only its identity filled in.
    pub fn new(path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        let branch = branch.into();
        Self {
            path: path.into(),
            is_detached: branch.is_empty(),
            branch,
            head: String::new(),
            created: None,
            ahead: 0,
            behind: 0,
            has_upstream: false,
            is_branch_merged: false,
            is_main: false,
            locked: false,
            prunable: false,
            path_exists: true,
            branch_ref_exists: true,
            issue_status: None,
        }
    }

    /// Time since creation. Zero when the creation time is unknown.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        self.created
            .map(|created| now.signed_duration_since(created))
            .unwrap_or_else(Duration::zero)
    }

    pub fn age(&self) -> Duration {
        self.age_at(Utc::now())
    }

    /// Old enough, nothing unpushed, and not the main worktree.
    pub fn is_stale(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        !self.is_main && self.created.is_some() && self.ahead == 0 && self.age_at(now) > threshold
    }

    /// Merged by git, or the provider reports the bound PR/issue completed.
    pub fn is_merged(&self) -> bool {
        self.is_branch_merged || self.provider_completed()
    }

    /// The administrative entry exists but the checkout or its branch is gone.
    pub fn is_orphaned(&self) -> bool {
        !self.is_main && (self.prunable || !self.path_exists || !self.branch_ref_exists)
    }

    /// Short display reason, by priority: merged, branch merged, stale, no changes.
    pub fn cleanup_reason(&self, threshold: Duration, now: DateTime<Utc>) -> Option<&'static str> {
        if self.provider_completed() {
            Some("merged")
        } else if self.is_branch_merged {
            Some("branch merged")
        } else if self.is_stale(threshold, now) {
            Some("stale")
        } else if self.ahead == 0 {
            Some("no changes")
        } else {
            None
        }
    }

    /// Branch name, or `(detached)`.
    pub fn display_branch(&self) -> &str {
        if self.branch.is_empty() {
            "(detached)"
        } else {
            &self.branch
        }
    }

    fn provider_completed(&self) -> bool {
        self.issue_status.as_ref().is_some_and(|s| s.completed)
    }
}
