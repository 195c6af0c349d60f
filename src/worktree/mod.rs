//! Worktree inventory and lifecycle for arbor.
//!
//! This module provides everything arbor knows about the repository's
//! worktrees:
//!
//! - Parsing `git worktree list --porcelain`
//! - The [`Worktree`] model and its derived predicates (age, stale, merged)
//! - The [`Inventory`], which attaches git-derived facts to each worktree
//! - Branch helpers
//! - Creating and removing worktrees
//! - Optional issue-tracker status via [`IssueProvider`]
//!
//! All git failures are mapped to exit code 3 (ArborError::GitError).

mod branch;
mod inventory;
mod lifecycle;
mod model;
mod porcelain;
mod provider;


pub use branch::{branch_exists, create_branch, delete_branch, local_branches, merged_branches};
pub use inventory::Inventory;
pub use lifecycle::{
    CreateMode, CreatedWorktree, RemovalReport, RemoveOptions, create_worktree, paths_equivalent,
    remove_worktree,
};
pub use model::{IssueStatus, Worktree};
pub use porcelain::{PorcelainEntry, parse_porcelain};
pub use provider::{GitHubProvider, GitLabProvider, IssueProvider, provider_for};
