//! Worktree Inventory: every worktree of a repository with git-derived facts.

use super::branch::{local_branches, merged_branches};
use super::model::Worktree;
use super::porcelain::{PorcelainEntry, parse_porcelain};
use super::provider::{IssueProvider, provider_for};
use crate::config::Config;
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::git::Git;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Enumerates worktrees and attaches per-worktree facts.
pub struct Inventory {
    repo_root: PathBuf,
    default_branch: Option<String>,
    git: Git,
    provider: Option<Box<dyn IssueProvider>>,
}

/// Facts shared by every worktree in one listing.
struct RepoFacts {
    branches: HashSet<String>,
    default_branch: Option<String>,
    merged: HashSet<String>,
}

impl Inventory {
    /// Inventory for `ctx`, with the issue provider the config selects.
    pub fn new(ctx: &RepoContext, config: &Config) -> Self {
        let git = Git::with_timeout(config.command_timeout());
        let provider = provider_for(config.issue_provider, git.options().clone());
        Self {
            repo_root: ctx.repo_root.clone(),
            default_branch: config.default_branch.clone(),
            git,
            provider,
        }
    }

    pub fn with_git(mut self, git: Git) -> Self {
        self.git = git;
        self
    }

    pub fn with_provider(mut self, provider: Option<Box<dyn IssueProvider>>) -> Self {
        self.provider = provider;
        self
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// The configured default branch, or the detected one.
    pub fn default_branch(&self) -> Result<String> {
        self.git
            .default_branch(&self.repo_root, self.default_branch.as_deref())
    }

    /// Every worktree, main first, with identity and existence facts.
    pub fn list(&self) -> Result<Vec<Worktree>> {
        self.collect(false)
    }

    /// Every secondary worktree.
    pub fn list_excluding_main(&self) -> Result<Vec<Worktree>> {
        Ok(self.list()?.into_iter().filter(|wt| !wt.is_main).collect())
    }

    /// Secondary worktrees with ahead/behind counts, merge status and issue status.
    pub fn list_with_merge_status(&self) -> Result<Vec<Worktree>> {
        Ok(self
            .collect(true)?
            .into_iter()
            .filter(|wt| !wt.is_main)
            .collect())
    }

    /// Exact match on the branch name. Detached worktrees never match.
    pub fn get_for_branch(&self, branch: &str) -> Result<Option<Worktree>> {
        if branch.is_empty() {
            return Ok(None);
        }
        Ok(self.list()?.into_iter().find(|wt| wt.branch == branch))
    }

    /// The worktree registered at `path`, if any.
    pub fn get_for_path(&self, path: &Path) -> Result<Option<Worktree>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|wt| super::paths_equivalent(&wt.path, path)))
    }

    /// Resolve a user-supplied target: a branch name first, then a path.
    pub fn resolve_target(&self, target: &str) -> Result<Worktree> {
        if let Some(wt) = self.get_for_branch(target)? {
            return Ok(wt);
        }
        let path = Path::new(target);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        self.get_for_path(&absolute)?.ok_or_else(|| {
            ArborError::NotFound(format!("no worktree for branch or path '{}'", target))
        })
    }

    fn collect(&self, with_merge_status: bool) -> Result<Vec<Worktree>> {
        let output = self
            .git
            .run(&self.repo_root, &["worktree", "list", "--porcelain"])?;
        let entries = parse_porcelain(&output.stdout);

        let facts = self.repo_facts(with_merge_status)?;

        let mut worktrees = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            if entry.bare {
                continue;
            }
            let path = entry.path.clone();
            match self.build(entry, index == 0, &facts, with_merge_status) {
                Ok(wt) => worktrees.push(wt),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable worktree");
                }
            }
        }

        Ok(worktrees)
    }

    fn repo_facts(&self, with_merge_status: bool) -> Result<RepoFacts> {
        let branches = local_branches(&self.git, &self.repo_root)?;

        if !with_merge_status {
            return Ok(RepoFacts {
                branches,
                default_branch: None,
                merged: HashSet::new(),
            });
        }

        let default_branch = self.default_branch()?;
        let merged = merged_branches(&self.git, &self.repo_root, &default_branch).unwrap_or_else(|e| {
            tracing::warn!(branch = %default_branch, error = %e, "could not read merged branches");
            HashSet::new()
        });

        Ok(RepoFacts {
            branches,
            default_branch: Some(default_branch),
            merged,
        })
    }

    fn build(
        &self,
        entry: PorcelainEntry,
        is_main: bool,
        facts: &RepoFacts,
        with_merge_status: bool,
    ) -> Result<Worktree> {
        let branch = entry.branch.unwrap_or_default();
        let path_exists = entry.path.is_dir();

        let mut wt = Worktree::new(entry.path, branch);
        wt.head = entry.head;
        wt.is_main = is_main;
        wt.locked = entry.locked;
        wt.prunable = entry.prunable;
        wt.path_exists = path_exists;
        wt.branch_ref_exists = wt.is_detached || facts.branches.contains(&wt.branch);
        wt.created = if path_exists {
            creation_time(&wt.path)
        } else {
            None
        };

        if !with_merge_status || is_main || wt.is_orphaned() {
            return Ok(wt);
        }

        self.fill_ahead_behind(&mut wt, facts.default_branch.as_deref())?;
        wt.is_branch_merged = !wt.is_detached && facts.merged.contains(&wt.branch);

        if let Some(provider) = &self.provider
            && !wt.is_detached
        {
            match provider.status_for_branch(&self.repo_root, &wt.branch) {
                Ok(status) => wt.issue_status = status,
                Err(e) => {
                    tracing::warn!(branch = %wt.branch, error = %e, "issue status unavailable");
                }
            }
        }

        Ok(wt)
    }

    /// Ahead/behind against the upstream, or the default branch when there is none.
    fn fill_ahead_behind(&self, wt: &mut Worktree, default_branch: Option<&str>) -> Result<()> {
        if !wt.is_detached {
            let upstream = self.git.raw(
                &wt.path,
                &["rev-list", "--left-right", "--count", "@{upstream}...HEAD"],
            )?;
            if upstream.success() {
                let (behind, ahead) = parse_left_right(&upstream.stdout)?;
                wt.has_upstream = true;
                wt.ahead = ahead;
                wt.behind = behind;
                return Ok(());
            }
        }

        let Some(base) = default_branch else {
            return Ok(());
        };
        let range = format!("{}...{}", base, wt.head);
        let output = self
            .git
            .run(&self.repo_root, &["rev-list", "--left-right", "--count", &range])?;
        let (behind, ahead) = parse_left_right(&output.stdout)?;
        wt.ahead = ahead;
        wt.behind = behind;
        Ok(())
    }
}

/// Parse `rev-list --left-right --count` output: `<left>\t<right>`.
fn parse_left_right(stdout: &str) -> Result<(u32, u32)> {
    let mut parts = stdout.split_whitespace().map(str::parse::<u32>);
    match (parts.next(), parts.next()) {
        (Some(Ok(left)), Some(Ok(right))) => Ok((left, right)),
        _ => Err(ArborError::GitError(format!(
            "unexpected rev-list output: '{}'",
            stdout
        ))),
    }
}

fn creation_time(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).ok()?;
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}
