//! Configuration types and defaults for arbor.
//!
//! This module defines enums and default value functions used by the Config struct.

use serde::{Deserialize, Serialize};

/// Which issue tracker decorates worktrees with issue/PR status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueProviderKind {
    /// No provider; issue status stays unset.
    #[default]
    None,
    /// GitHub pull requests via the `gh` CLI.
    Github,
    /// GitLab merge requests via the `glab` CLI.
    Gitlab,
}

pub(crate) fn default_worktrees_dir() -> String {
    ".worktrees".to_string()
}

pub(crate) fn default_stale_after_days() -> u32 {
    14
}

pub(crate) fn default_lock_stale_minutes() -> u32 {
    30
}

pub(crate) fn default_command_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_monitor_interval_secs() -> u64 {
    60
}

pub(crate) fn default_session_prefix() -> String {
    "arbor".to_string()
}

pub(crate) fn default_attention_patterns() -> Vec<String> {
    vec![
        r"(?i)\[y/n\]|\(y/n\)".to_string(),
        r"(?i)do you want to (proceed|continue)".to_string(),
        r"(?i)press enter to continue".to_string(),
        r"(?i)waiting for (your )?input".to_string(),
    ]
}
