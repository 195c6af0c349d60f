//! Individual health checks and the checker that runs them.

use super::{HealthCheckResult, Issue, IssueSeverity, category};
use crate::config::Config;
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::git::Git;
use crate::locks::{LockDetector, LockFile, ProcessProbe, SystemProbe};
use crate::repair::RepairKind;
use crate::worktree::{PorcelainEntry, parse_porcelain, paths_equivalent};
use std::fs;
use std::path::{Path, PathBuf};

/// Runs the diagnostic battery.
pub struct HealthChecker {
    ctx: RepoContext,
    git: Git,
    detector: LockDetector,
}

impl HealthChecker {
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

    pub fn with_git(mut self, git: Git) -> Self {
        self.git = git;
        self
    }

    /// Diagnose the worktree at `path`.
    ///
    /// `path` may also be an unregistered checkout directory under the
    /// worktrees dir. Anything else is `NotFound`.
    pub fn check(&self, path: &Path) -> Result<HealthCheckResult> {
        let entries = self.registered()?;

        if let Some(entry) = entries.iter().find(|e| paths_equivalent(&e.path, path)) {
            return Ok(self.check_entry(entry));
        }

        if self.is_checkout_dir(path) {
            return Ok(unregistered_result(path));
        }

        Err(ArborError::NotFound(format!(
            "no worktree registered at {}",
            path.display()
        )))
    }

    /// Diagnose every secondary worktree, in git's listing order, followed by
    /// unregistered checkout directories and, when it has issues, a
    /// repository-wide result for locks in the common dir.
    ///
    /// A failing check becomes an issue on that worktree's result. Only a
    /// failure to list the repository's worktrees aborts the call.
    pub fn check_all(&self) -> Result<Vec<HealthCheckResult>> {
        let entries = self.registered()?;
        let secondary: Vec<&PorcelainEntry> = entries
            .iter()
            .filter(|e| !e.bare && !self.is_main(e))
            .collect();

        let mut results: Vec<HealthCheckResult> =
            secondary.iter().map(|e| self.check_entry(e)).collect();

        for dir in self.unregistered_dirs(&entries) {
            results.push(unregistered_result(&dir));
        }

        let repository = self.repository_result(&secondary);
        if !repository.healthy() {
            results.push(repository);
        }

        Ok(results)
    }

    /// Repository-wide locks, minus the branch ref locks already reported
    /// against the secondary worktree that has the branch checked out.
    fn repository_result(&self, secondary: &[&PorcelainEntry]) -> HealthCheckResult {
        let attributed: Vec<PathBuf> = secondary
            .iter()
            .filter_map(|e| e.branch.as_deref())
            .map(|b| self.branch_lock_path(b))
            .collect();

        let mut result = HealthCheckResult::repository(self.ctx.common_dir.clone());
        let outcome: Result<Vec<Issue>> = self
            .detector
            .detect_repository(&self.ctx.common_dir)
            .map(|locks| {
                locks
                    .iter()
                    .filter(|l| !attributed.contains(&l.path))
                    .map(lock_issue)
                    .collect()
            });
        absorb(&mut result, outcome);
        result
    }

    fn branch_lock_path(&self, branch: &str) -> PathBuf {
        self.ctx
            .common_dir
            .join("refs")
            .join("heads")
            .join(format!("{}.lock", branch))
    }

    fn registered(&self) -> Result<Vec<PorcelainEntry>> {
        let output = self
            .git
            .run(&self.ctx.repo_root, &["worktree", "list", "--porcelain"])?;
        Ok(parse_porcelain(&output.stdout))
    }

    fn check_entry(&self, entry: &PorcelainEntry) -> HealthCheckResult {
        tracing::debug!(path = %entry.path.display(), "checking worktree health");

        let mut result = HealthCheckResult::new(&entry.path, entry.branch.clone());
        let admin_dir = self.admin_dir_for(entry);

        absorb(&mut result, Ok(check_directory(entry)));
        absorb(&mut result, self.check_locks(entry, admin_dir.as_deref()));
        absorb(&mut result, Ok(check_detached(entry)));
        absorb(&mut result, self.check_branch_ref(entry, admin_dir.as_deref()));

        result
    }

    fn check_locks(&self, entry: &PorcelainEntry, admin_dir: Option<&Path>) -> Result<Vec<Issue>> {
        let mut locks: Vec<LockFile> = Vec::new();

        if self.is_main(entry) {
            locks.extend(self.detector.detect_repository(&self.ctx.common_dir)?);
        } else if let Some(admin_dir) = admin_dir {
            locks.extend(self.detector.detect(admin_dir)?);
        }

        if let Some(branch) = &entry.branch {
            let ref_lock = self.branch_lock_path(branch);
            if let Some(lock) = self.detector.inspect(&ref_lock)
                && !locks.iter().any(|l| l.path == lock.path)
            {
                locks.push(lock);
            }
        }

        Ok(locks.iter().map(lock_issue).collect())
    }

    fn check_branch_ref(
        &self,
        entry: &PorcelainEntry,
        admin_dir: Option<&Path>,
    ) -> Result<Vec<Issue>> {
        let Some(branch) = &entry.branch else {
            return Ok(Vec::new());
        };

        let full_ref = format!("refs/heads/{}", branch);
        if self.git.check(
            &self.ctx.repo_root,
            &["rev-parse", "--verify", "--quiet", &full_ref],
        )? {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        if is_real_commit_id(&entry.head) {
            candidates.push(entry.head.clone());
        }
        if let Some(sha) = admin_dir.and_then(last_reflog_commit) {
            candidates.push(sha);
        }

        for commit in candidates {
            let spec = format!("{}^{{commit}}", commit);
            if self.git.check(&self.ctx.repo_root, &["cat-file", "-e", &spec])? {
                return Ok(vec![
                    Issue::new(
                        IssueSeverity::Error,
                        category::MISSING_REF,
                        format!("branch '{}' no longer exists", branch),
                    )
                    .with_hint(format!("git branch {} {}", branch, commit))
                    .with_repair(RepairKind::RecreateBranchRef {
                        branch: branch.clone(),
                        commit,
                    }),
                ]);
            }
        }

        Ok(vec![
            Issue::new(
                IssueSeverity::Critical,
                category::MISSING_REF,
                format!(
                    "branch '{}' no longer exists and its last commit is unreachable",
                    branch
                ),
            )
            .with_hint(format!(
                "Check out another branch in the worktree:\n\
                 git -C {} switch -c {} <start-point>",
                entry.path.display(),
                branch
            )),
        ])
    }

    fn is_main(&self, entry: &PorcelainEntry) -> bool {
        paths_equivalent(&entry.path, &self.ctx.repo_root)
    }

    /// Locate git's administrative directory for a worktree.
    fn admin_dir_for(&self, entry: &PorcelainEntry) -> Option<PathBuf> {
        if self.is_main(entry) {
            return Some(self.ctx.common_dir.clone());
        }

        if let Some(dir) = gitdir_from_marker(&entry.path) {
            return Some(dir);
        }

        // The checkout is gone; match on the back-pointer git keeps instead.
        let admin_root = self.ctx.worktree_admin_root();
        let entries = fs::read_dir(&admin_root).ok()?;
        for admin in entries.flatten() {
            let Ok(content) = fs::read_to_string(admin.path().join("gitdir")) else {
                continue;
            };
            let marker = PathBuf::from(content.trim());
            if let Some(checkout) = marker.parent()
                && (checkout == entry.path || paths_equivalent(checkout, &entry.path))
            {
                return Some(admin.path());
            }
        }
        None
    }

    fn is_checkout_dir(&self, path: &Path) -> bool {
        let under_root = match (path.canonicalize(), self.ctx.worktrees_dir.canonicalize()) {
            (Ok(p), Ok(root)) => p.starts_with(root),
            _ => false,
        };
        under_root && fs::symlink_metadata(path.join(".git")).is_ok()
    }

    /// Directories under the worktrees dir that carry a `.git` marker but are
    /// not registered with git.
    fn unregistered_dirs(&self, entries: &[PorcelainEntry]) -> Vec<PathBuf> {
        let Ok(read) = fs::read_dir(&self.ctx.worktrees_dir) else {
            return Vec::new();
        };

        let mut dirs: Vec<PathBuf> = read
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter(|p| fs::symlink_metadata(p.join(".git")).is_ok())
            .filter(|p| !entries.iter().any(|e| paths_equivalent(&e.path, p)))
            .collect();
        dirs.sort();
        dirs
    }
}

fn absorb(result: &mut HealthCheckResult, outcome: Result<Vec<Issue>>) {
    match outcome {
        Ok(issues) => result.issues.extend(issues),
        Err(e) => {
            tracing::warn!(path = %result.path.display(), error = %e, "health check failed");
            result.issues.push(Issue::new(
                IssueSeverity::Error,
                category::CHECK_FAILED,
                format!("check could not run: {}", e),
            ));
        }
    }
}

fn check_directory(entry: &PorcelainEntry) -> Vec<Issue> {
    if entry.path.exists() {
        return Vec::new();
    }

    let issue = Issue::new(
        IssueSeverity::Critical,
        category::MISSING_DIRECTORY,
        "registered worktree directory is missing on disk",
    );

    // `git worktree prune` leaves locked registrations alone.
    if entry.locked {
        vec![issue.with_hint(format!(
            "git worktree unlock {} && git worktree prune",
            entry.path.display()
        ))]
    } else {
        vec![
            issue
                .with_hint("git worktree prune")
                .with_repair(RepairKind::PruneRegistrations),
        ]
    }
}

fn check_detached(entry: &PorcelainEntry) -> Vec<Issue> {
    if !entry.detached {
        return Vec::new();
    }

    vec![
        Issue::new(
            IssueSeverity::Warning,
            category::DETACHED_HEAD,
            "HEAD is detached; commits made here belong to no branch",
        )
        .with_hint(format!(
            "git -C {} switch <branch>",
            entry.path.display()
        )),
    ]
}

fn lock_issue(lock: &LockFile) -> Issue {
    let owner = match lock.pid {
        Some(pid) => format!("pid {}", pid),
        None => format!("no owner, age {}", lock.age_string()),
    };

    if lock.is_stale() {
        Issue::new(
            IssueSeverity::Warning,
            category::LOCK,
            format!("stale lock {} ({})", lock.path.display(), owner),
        )
        .with_hint(format!("rm {}", lock.path.display()))
        .with_repair(RepairKind::RemoveStaleLock {
            path: lock.path.clone(),
        })
    } else {
        Issue::new(
            IssueSeverity::Warning,
            category::LOCK,
            format!("lock {} is held by a running process ({})", lock.path.display(), owner),
        )
        .with_hint("wait for the git process to finish")
    }
}

fn unregistered_result(path: &Path) -> HealthCheckResult {
    let mut result = HealthCheckResult::new(path, None);
    result.issues.push(
        Issue::new(
            IssueSeverity::Critical,
            category::UNREGISTERED_DIRECTORY,
            "directory looks like a worktree but git has no registration for it",
        )
        .with_hint(format!(
            "Check it for uncommitted work, then delete it:\nrm -rf {}",
            path.display()
        ))
        .with_repair(RepairKind::RemoveOrphanDirectory {
            path: path.to_path_buf(),
        }),
    );
    result
}

/// Read the `gitdir:` pointer from a linked worktree's `.git` file.
fn gitdir_from_marker(checkout: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(checkout.join(".git")).ok()?;
    let target = content.trim().strip_prefix("gitdir:")?.trim();
    let path = PathBuf::from(target);
    let absolute = if path.is_absolute() {
        path
    } else {
        checkout.join(path)
    };
    absolute.canonicalize().ok()
}

/// New-value commit id of the last entry in a worktree's HEAD reflog.
fn last_reflog_commit(admin_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(admin_dir.join("logs").join("HEAD")).ok()?;
    let line = content.lines().rev().find(|l| !l.trim().is_empty())?;
    let sha = line.split_whitespace().nth(1)?;
    is_real_commit_id(sha).then(|| sha.to_string())
}

fn is_real_commit_id(id: &str) -> bool {
    (id.len() == 40 || id.len() == 64)
        && id.chars().all(|c| c.is_ascii_hexdigit())
        && id.chars().any(|c| c != '0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_real_commit_id() {
        assert!(is_real_commit_id("3f2a9c1d0e8b7a6f5e4d3c2b1a0f9e8d7c6b5a49"));
        assert!(!is_real_commit_id("0000000000000000000000000000000000000000"));
        assert!(!is_real_commit_id("abc123"));
        assert!(!is_real_commit_id(""));
    }

    #[test]
    fn test_last_reflog_commit_reads_new_value() {
        let temp = tempfile::TempDir::new().unwrap();
        let logs = temp.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(
            logs.join("HEAD"),
            "0000000000000000000000000000000000000000 1111111111111111111111111111111111111111 A <a@b> 1 +0000\tclone\n\
             1111111111111111111111111111111111111111 2222222222222222222222222222222222222222 A <a@b> 2 +0000\tcommit: x\n\n",
        )
        .unwrap();

        assert_eq!(
            last_reflog_commit(temp.path()).as_deref(),
            Some("2222222222222222222222222222222222222222")
        );
    }

    #[test]
    fn test_failed_check_becomes_error_issue() {
        let mut result = HealthCheckResult::new("/tmp/wt", Some("feature".to_string()));
        absorb(
            &mut result,
            Err(ArborError::CommandTimeout("git rev-parse (after 30s)".to_string())),
        );
        absorb(&mut result, Ok(Vec::new()));

        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].category, category::CHECK_FAILED);
        assert_eq!(result.max_severity(), IssueSeverity::Error);
    }

    #[test]
    fn test_missing_directory_on_locked_entry_is_not_repairable() {
        let entry = PorcelainEntry {
            path: PathBuf::from("/nonexistent/arbor/wt"),
            branch: Some("feature".to_string()),
            locked: true,
            ..PorcelainEntry::default()
        };
        let issues = check_directory(&entry);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Critical);
        assert!(!issues[0].repairable());
    }
}
