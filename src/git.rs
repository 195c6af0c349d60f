//! Git command runner for arbor.
//!
//! Provides a wrapper around git commands with captured stdout/stderr and
//! structured error handling. All git operations go through [`Git`], which
//! carries the timeout and cancellation applied to every invocation.

use crate::error::{ArborError, Result};
use crate::exec::{CommandOutput, ExecOptions, run_command};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: CommandOutput) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }

    /// Returns stdout lines as a vector.
    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }
}

/// Git invoker bound to a set of execution options.
#[derive(Debug, Clone, Default)]
pub struct Git {
    opts: ExecOptions,
}

impl Git {
    pub fn new(opts: ExecOptions) -> Self {
        Self { opts }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(ExecOptions::with_timeout(timeout))
    }

    pub fn options(&self) -> &ExecOptions {
        &self.opts
    }

    /// Run a git command in `cwd`.
    ///
    /// # Returns
    ///
    /// * `Ok(GitOutput)` - On exit code 0
    /// * `Err(ArborError::GitError)` - On non-zero exit code
    /// * `Err(ArborError::CommandTimeout | Canceled)` - When the deadline or cancel fires
    pub fn run<P: AsRef<Path>>(&self, cwd: P, args: &[&str]) -> Result<GitOutput> {
        let output = self.raw(cwd, args)?;

        if output.success() {
            Ok(GitOutput::from_output(output))
        } else {
            Err(ArborError::GitError(format!(
                "git {} failed (exit code {}): {}",
                args.first().unwrap_or(&""),
                output.code.unwrap_or(-1),
                output.failure_message()
            )))
        }
    }

    /// Run a git command and hand back the raw output regardless of exit status.
    pub fn raw<P: AsRef<Path>>(&self, cwd: P, args: &[&str]) -> Result<CommandOutput> {
        run_command("git", args, cwd.as_ref(), &self.opts).map_err(|e| match e {
            ArborError::UserError(msg) => {
                ArborError::GitError(format!("{} (is git installed?)", msg))
            }
            other => other,
        })
    }

    /// Run a git command used as a predicate: exit 0 means true.
    pub fn check<P: AsRef<Path>>(&self, cwd: P, args: &[&str]) -> Result<bool> {
        Ok(self.raw(cwd, args)?.success())
    }

    /// Get the repository root directory using `git rev-parse --show-toplevel`.
    ///
    /// Returns a `UserError` (not a `GitError`) when `cwd` is not inside a
    /// repository, so "wrong directory" reads as a user mistake.
    pub fn repo_root<P: AsRef<Path>>(&self, cwd: P) -> Result<PathBuf> {
        let output = self.run_for_repo_detection(cwd.as_ref(), &["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(output.stdout))
    }

    /// Absolute path to the repository's shared administrative directory.
    pub fn common_dir<P: AsRef<Path>>(&self, cwd: P) -> Result<PathBuf> {
        let cwd = cwd.as_ref();
        let output = self.run_for_repo_detection(cwd, &["rev-parse", "--git-common-dir"])?;
        let path = PathBuf::from(output.stdout);
        let absolute = if path.is_absolute() {
            path
        } else {
            cwd.join(path)
        };
        Ok(absolute.canonicalize().unwrap_or(absolute))
    }

    /// Get the path to the main worktree (the original clone location).
    pub fn main_worktree<P: AsRef<Path>>(&self, cwd: P) -> Result<PathBuf> {
        let cwd = cwd.as_ref();
        let output = self.run(cwd, &["worktree", "list", "--porcelain"])?;

        // The main worktree is always listed first.
        for line in output.stdout.lines() {
            if let Some(path) = line.strip_prefix("worktree ") {
                return Ok(PathBuf::from(path));
            }
        }

        self.repo_root(cwd)
    }

    /// Check if the working directory has uncommitted changes, untracked files included.
    pub fn has_uncommitted_changes<P: AsRef<Path>>(&self, cwd: P) -> Result<bool> {
        let output = self.run(cwd, &["status", "--porcelain"])?;
        Ok(!output.is_empty())
    }

    /// Resolve the repository's default branch.
    ///
    /// Order: configured name, `origin/HEAD`, then `main`, then `master`, then
    /// whatever the main worktree has checked out.
    pub fn default_branch<P: AsRef<Path>>(
        &self,
        repo_root: P,
        configured: Option<&str>,
    ) -> Result<String> {
        let repo_root = repo_root.as_ref();

        if let Some(name) = configured.filter(|n| !n.is_empty()) {
            return Ok(name.to_string());
        }

        if let Ok(out) = self.run(
            repo_root,
            &["symbolic-ref", "--quiet", "--short", "refs/remotes/origin/HEAD"],
        ) && let Some(name) = out.stdout.strip_prefix("origin/")
        {
            return Ok(name.to_string());
        }

        for candidate in ["main", "master"] {
            if self.check(
                repo_root,
                &["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", candidate)],
            )? {
                return Ok(candidate.to_string());
            }
        }

        let head = self.run(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(head.stdout)
    }

    /// Internal helper that returns a UserError instead of GitError for repo detection.
    fn run_for_repo_detection(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput> {
        let output = run_command("git", args, cwd, &self.opts).map_err(|e| match e {
            ArborError::UserError(msg) => {
                ArborError::UserError(format!("{} (is git installed?)", msg))
            }
            other => other,
        })?;

        if output.success() {
            return Ok(GitOutput::from_output(output));
        }

        let stderr = &output.stderr;
        if stderr.contains("not a git repository") || stderr.contains("fatal:") {
            Err(ArborError::UserError(format!(
                "not inside a git repository: {}\n\
                 Run this command from within a git repository.",
                cwd.display()
            )))
        } else {
            Err(ArborError::UserError(format!(
                "git command failed: {}",
                output.failure_message()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_repo, git};
    use tempfile::TempDir;

    #[test]
    fn test_run_git_success() {
        let temp_dir = create_test_repo();
        let result = Git::default().run(temp_dir.path(), &["status", "--porcelain"]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_run_git_failure_returns_git_error() {
        let temp_dir = create_test_repo();
        let err = Git::default()
            .run(temp_dir.path(), &["checkout", "nonexistent-branch"])
            .unwrap_err();
        assert!(matches!(err, ArborError::GitError(_)));
    }

    #[test]
    fn test_repo_root_from_subdirectory() {
        let temp_dir = create_test_repo();
        let subdir = temp_dir.path().join("subdir").join("nested");
        std::fs::create_dir_all(&subdir).unwrap();

        let root = Git::default().repo_root(&subdir).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_repo_root_outside_repo_returns_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = Git::default().repo_root(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ArborError::UserError(_)));
        assert!(err.to_string().contains("not inside a git repository"));
    }

    #[test]
    fn test_common_dir_is_shared_by_linked_worktrees() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let linked = path.join("linked");
        git(path, &["worktree", "add", "-b", "feature", linked.to_str().unwrap()]);

        let g = Git::default();
        let from_main = g.common_dir(path).unwrap();
        let from_linked = g.common_dir(&linked).unwrap();
        assert_eq!(from_main, from_linked);
        assert!(from_main.ends_with(".git"));
    }

    #[test]
    fn test_main_worktree_from_linked_worktree() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let linked = path.join("linked");
        git(path, &["worktree", "add", "-b", "feature", linked.to_str().unwrap()]);

        let main = Git::default().main_worktree(&linked).unwrap();
        assert_eq!(
            main.canonicalize().unwrap(),
            path.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_has_uncommitted_changes() {
        let temp_dir = create_test_repo();
        let g = Git::default();
        assert!(!g.has_uncommitted_changes(temp_dir.path()).unwrap());

        std::fs::write(temp_dir.path().join("README.md"), "# Modified\n").unwrap();
        assert!(g.has_uncommitted_changes(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_default_branch_prefers_configured_then_main() {
        let temp_dir = create_test_repo();
        let g = Git::default();
        assert_eq!(
            g.default_branch(temp_dir.path(), Some("trunk")).unwrap(),
            "trunk"
        );
        assert_eq!(g.default_branch(temp_dir.path(), None).unwrap(), "main");
    }

    #[test]
    fn test_git_output_lines() {
        let output = GitOutput {
            stdout: "line1\nline2\nline3".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.lines(), vec!["line1", "line2", "line3"]);

        let empty = GitOutput {
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(empty.lines().is_empty());
        assert!(empty.is_empty());
    }
}
