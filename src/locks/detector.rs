//! Lock file discovery and classification.

use super::probe::{ProcessProbe, SystemProbe};
use super::types::LockFile;
use crate::config::Config;
use crate::error::{ArborError, Result};
use chrono::{DateTime, Duration, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Directories under the admin dir that never hold git's lock files.
const SKIP_DIRS: &[&str] = &["objects", "arbor"];

/// As `SKIP_DIRS`, plus the per-worktree admin dirs.
const REPOSITORY_SKIP_DIRS: &[&str] = &["objects", "arbor", "worktrees"];

/// How much of a lock file is read when looking for a pid.
const MAX_PID_BYTES: u64 = 4096;

/// Scans an administrative directory for `*.lock` files.
pub struct LockDetector {
    probe: Box<dyn ProcessProbe>,
    unattributed_threshold: Duration,
}

impl LockDetector {
    pub fn new(config: &Config) -> Self {
        Self::with_probe(config, Box::new(SystemProbe))
    }

    pub fn with_probe(config: &Config, probe: Box<dyn ProcessProbe>) -> Self {
        Self {
            probe,
            unattributed_threshold: config.lock_stale_threshold(),
        }
    }

    /// Find and classify every lock file under `admin_dir`.
    ///
    /// A missing directory yields an empty list; a path that exists but is not
    /// a directory is an error. Files that disappear while scanning are
    /// skipped.
    pub fn detect(&self, admin_dir: &Path) -> Result<Vec<LockFile>> {
        self.detect_at(admin_dir, Utc::now())
    }

    pub fn detect_at(&self, admin_dir: &Path, now: DateTime<Utc>) -> Result<Vec<LockFile>> {
        self.scan(admin_dir, SKIP_DIRS, now)
    }

    /// Locks guarding the whole repository: every lock under the common dir
    /// except those in per-worktree admin dirs (`config.lock`,
    /// `packed-refs.lock`, the main `index.lock`, ref locks, ...).
    pub fn detect_repository(&self, common_dir: &Path) -> Result<Vec<LockFile>> {
        self.scan(common_dir, REPOSITORY_SKIP_DIRS, Utc::now())
    }

    fn scan(&self, admin_dir: &Path, skip: &[&str], now: DateTime<Utc>) -> Result<Vec<LockFile>> {
        if !admin_dir.exists() {
            return Ok(Vec::new());
        }
        if !admin_dir.is_dir() {
            return Err(ArborError::LockError(format!(
                "{} is not a directory",
                admin_dir.display()
            )));
        }

        let matcher = lock_matcher()?;
        let mut found = Vec::new();
        collect_lock_paths(admin_dir, admin_dir, skip, &matcher, &mut found);
        found.sort();

        Ok(found
            .iter()
            .filter_map(|path| self.inspect_at(path, now))
            .collect())
    }

    /// Classify a single lock file, `None` when it does not exist.
    pub fn inspect(&self, path: &Path) -> Option<LockFile> {
        self.inspect_at(path, Utc::now())
    }

    pub fn inspect_at(&self, path: &Path, now: DateTime<Utc>) -> Option<LockFile> {
        let metadata = fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        let modified: Option<DateTime<Utc>> = metadata.modified().ok().map(DateTime::from);
        let age = modified
            .map(|m| now.signed_duration_since(m))
            .filter(|d| *d > Duration::zero())
            .unwrap_or_else(Duration::zero);

        let pid = read_pid(path);
        let process_alive = match pid {
            Some(pid) => match self.probe.is_alive(pid) {
                Some(alive) => alive,
                None => {
                    tracing::debug!(
                        pid,
                        path = %path.display(),
                        "process liveness indeterminate, assuming alive"
                    );
                    true
                }
            },
            None => age <= self.unattributed_threshold,
        };

        Some(LockFile {
            path: path.to_path_buf(),
            pid,
            process_alive,
            modified,
            age,
        })
    }

    /// Re-probe a previously detected lock.
    ///
    /// Returns `None` once the file is gone.
    pub fn refresh(&self, lock: &LockFile) -> Option<LockFile> {
        self.inspect(&lock.path)
    }
}

/// Keep only the locks whose owner is gone.
pub fn get_stale(locks: &[LockFile]) -> Vec<LockFile> {
    locks.iter().filter(|l| !l.process_alive).cloned().collect()
}

/// Delete a stale lock file.
///
/// Refuses a lock still classified as active. A file that is already gone
/// counts as removed.
pub fn remove(lock: &LockFile) -> Result<()> {
    if lock.process_alive {
        return Err(ArborError::LockError(format!(
            "refusing to remove active lock {}",
            lock.path.display()
        )));
    }

    match fs::remove_file(&lock.path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ArborError::LockError(format!(
            "failed to remove {}: {}",
            lock.path.display(),
            e
        ))),
    }
}

/// Extract an owning pid from lock file content.
///
/// Recognizes a JSON object with a `pid` field, a bare number, `pid=N` /
/// `pid: N`, and git's `gc.pid` layout (`N hostname`). Binary content such as
/// an in-progress index yields `None`.
pub fn parse_pid(content: &str) -> Option<u32> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        return value
            .get("pid")
            .and_then(|p| p.as_u64())
            .and_then(|p| u32::try_from(p).ok())
            .filter(|p| *p != 0);
    }

    let first_line = trimmed.lines().next()?;
    let caps = pid_line_regex()?.captures(first_line)?;
    caps.get(1)?
        .as_str()
        .parse::<u32>()
        .ok()
        .filter(|p| *p != 0)
}

fn pid_line_regex() -> Option<&'static Regex> {
    static PID_LINE: OnceLock<Option<Regex>> = OnceLock::new();
    PID_LINE
        .get_or_init(|| Regex::new(r"^\s*(?:pid\s*[:=]\s*)?(\d{1,10})(?:\s+\S+)?\s*$").ok())
        .as_ref()
}

fn read_pid(path: &Path) -> Option<u32> {
    let file = fs::File::open(path).ok()?;
    let mut buf = Vec::new();
    file.take(MAX_PID_BYTES).read_to_end(&mut buf).ok()?;
    let text = std::str::from_utf8(&buf).ok()?;
    parse_pid(text)
}

fn lock_matcher() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let glob = Glob::new("**/*.lock")
        .map_err(|e| ArborError::LockError(format!("invalid lock pattern: {}", e)))?;
    builder.add(glob);
    builder
        .build()
        .map_err(|e| ArborError::LockError(format!("failed to build lock matcher: {}", e)))
}

fn collect_lock_paths(
    root: &Path,
    dir: &Path,
    skip_dirs: &[&str],
    matcher: &GlobSet,
    out: &mut Vec<PathBuf>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            let skip = dir == root
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| skip_dirs.contains(&name));
            if !skip {
                collect_lock_paths(root, &path, skip_dirs, matcher, out);
            }
        } else if file_type.is_file()
            && let Ok(relative) = path.strip_prefix(root)
            && matcher.is_match(relative)
        {
            out.push(path);
        }
    }
}
