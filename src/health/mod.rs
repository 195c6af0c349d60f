//! Health Checker for arbor.
//!
//! Runs a fixed battery of independent checks against one worktree or every
//! secondary worktree of the repository:
//!
//! - Administrative locks (stale locks are repairable; live ones are reported only)
//! - Detached HEAD
//! - Branch reference integrity
//! - Registered-but-missing checkouts and unregistered checkout directories
//!
//! Results are computed fresh on every call and never persisted.

mod checks;


use crate::repair::RepairKind;
use std::path::PathBuf;

pub use checks::HealthChecker;

/// Issue categories.
pub mod category {
    pub const LOCK: &str = "lock";
    pub const DETACHED_HEAD: &str = "detached-head";
    pub const MISSING_REF: &str = "missing-ref";
    pub const MISSING_DIRECTORY: &str = "missing-directory";
    pub const UNREGISTERED_DIRECTORY: &str = "unregistered-directory";
    pub const CHECK_FAILED: &str = "check-failed";
}

/// Severity level for issues, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueSeverity {
    Ok,
    Warning,
    Error,
    Critical,
}

impl IssueSeverity {
    pub fn icon(&self) -> &'static str {
        match self {
            IssueSeverity::Ok => "✓",
            IssueSeverity::Warning => "!",
            IssueSeverity::Error => "✗",
            IssueSeverity::Critical => "✗✗",
        }
    }
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Ok => write!(f, "OK"),
            IssueSeverity::Warning => write!(f, "WARNING"),
            IssueSeverity::Error => write!(f, "ERROR"),
            IssueSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A diagnosed problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: IssueSeverity,
    /// Category of the issue, one of [`category`].
    pub category: String,
    pub description: String,
    /// Manual remediation text.
    pub hint: Option<String>,
    /// Remediation the repair engine can apply.
    pub repair: Option<RepairKind>,
}

impl Issue {
    pub fn new(severity: IssueSeverity, category: &str, description: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.to_string(),
            description: description.into(),
            hint: None,
            repair: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_repair(mut self, repair: RepairKind) -> Self {
        self.repair = Some(repair);
        self
    }

    pub fn repairable(&self) -> bool {
        self.repair.is_some()
    }
}

/// Outcome of diagnosing one worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub path: PathBuf,
    /// Branch the worktree has checked out, when known.
    pub branch: Option<String>,
    pub issues: Vec<Issue>,
    /// Covers the repository as a whole rather than one worktree.
    pub repository: bool,
}

impl HealthCheckResult {
    pub fn new(path: impl Into<PathBuf>, branch: Option<String>) -> Self {
        Self {
            path: path.into(),
            branch,
            issues: Vec::new(),
            repository: false,
        }
    }

    /// Result for repository-wide state kept in the git common dir.
    pub fn repository(common_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository: true,
            ..Self::new(common_dir, None)
        }
    }

    pub fn healthy(&self) -> bool {
        self.issues.is_empty()
    }

    /// Highest severity among the issues, `Ok` when there are none.
    pub fn max_severity(&self) -> IssueSeverity {
        self.issues
            .iter()
            .map(|i| i.severity)
            .max()
            .unwrap_or(IssueSeverity::Ok)
    }

    pub fn repairable_count(&self) -> usize {
        self.issues.iter().filter(|i| i.repairable()).count()
    }

    /// Label for output: the branch when there is one, else the path.
    pub fn label(&self) -> String {
        if self.repository {
            return format!("repository ({})", self.path.display());
        }
        match &self.branch {
            Some(branch) => branch.clone(),
            None => self.path.display().to_string(),
        }
    }
}
