//! Repository context resolution for arbor.
//!
//! Finds the main worktree and the shared git administrative directory from any
//! working directory inside the repository (main checkout or a linked worktree),
//! and derives every path arbor reads or writes from them.

use crate::config::Config;
use crate::error::{ArborError, Result};
use crate::git::Git;
use std::env;
use std::path::{Path, PathBuf};

/// Per-repository directory (inside the main worktree) holding `config.yaml`.
pub const CONFIG_DIR: &str = ".arbor";

/// Directory inside the git common dir holding arbor's own state.
pub const STATE_DIR: &str = "arbor";

/// Resolved paths for one repository. All paths are absolute.
#[derive(Debug, Clone)]
pub struct RepoContext {
    /// Absolute path to the main worktree (original clone location).
    pub repo_root: PathBuf,

    /// Absolute path to git's shared administrative directory (usually `{repo_root}/.git`).
    pub common_dir: PathBuf,

    /// Absolute path to arbor's state directory (`{common_dir}/arbor`).
    pub state_dir: PathBuf,

    /// Absolute path to the session metadata store (`{state_dir}/sessions`).
    pub sessions_dir: PathBuf,

    /// Absolute path under which new worktrees are created.
    pub worktrees_dir: PathBuf,
}

impl RepoContext {
    /// Resolve the repository root from the current working directory.
    pub fn locate_repo_root(git: &Git) -> Result<PathBuf> {
        let cwd = env::current_dir().map_err(|e| {
            ArborError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        // Fails with a user error outside a repository.
        git.repo_root(&cwd)?;
        git.main_worktree(&cwd)
    }

    /// Resolve the context from a directory inside the repository.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P, config: &Config) -> Result<Self> {
        Self::resolve_with(&Git::with_timeout(config.command_timeout()), cwd, config)
    }

    pub fn resolve_with<P: AsRef<Path>>(git: &Git, cwd: P, config: &Config) -> Result<Self> {
        let cwd = cwd.as_ref();

        git.repo_root(cwd)?;
        let main = git.main_worktree(cwd)?;
        let repo_root = main.canonicalize().unwrap_or(main);
        let common_dir = git.common_dir(cwd)?;

        let state_dir = common_dir.join(STATE_DIR);
        let sessions_dir = state_dir.join("sessions");
        let worktrees_dir = repo_root.join(&config.worktrees_dir);

        Ok(Self {
            repo_root,
            common_dir,
            state_dir,
            sessions_dir,
            worktrees_dir,
        })
    }

    /// Path to the config file for a repository root.
    pub fn config_path_for(repo_root: &Path) -> PathBuf {
        repo_root.join(CONFIG_DIR).join("config.yaml")
    }

    pub fn config_path(&self) -> PathBuf {
        Self::config_path_for(&self.repo_root)
    }

    /// Get the path to the audit log.
    pub fn events_file(&self) -> PathBuf {
        self.state_dir.join("events.ndjson")
    }

    /// Directory holding git's per-worktree administrative files.
    pub fn worktree_admin_root(&self) -> PathBuf {
        self.common_dir.join("worktrees")
    }

    /// Default checkout location for a branch.
    pub fn worktree_path_for_branch(&self, branch: &str) -> PathBuf {
        self.worktrees_dir.join(sanitize_branch_for_path(branch))
    }

    /// Repository name used in session names.
    pub fn repo_name(&self) -> String {
        self.repo_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repo".to_string())
    }
}

/// Turn a branch name into a single path component.
///
/// Slashes become dashes so `feature/login` lands at `.worktrees/feature-login`.
pub fn sanitize_branch_for_path(branch: &str) -> String {
    let cleaned: String = branch
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' => '-',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    if cleaned.is_empty() {
        "worktree".to_string()
    } else {
        cleaned.to_string()
    }
}
