//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for one repository.
///
/// This struct represents the contents of `.arbor/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Worktree settings
    // =========================================================================
    /// Directory, relative to the repo root, where new worktrees are created.
    #[serde(default = "default_worktrees_dir")]
    pub worktrees_dir: String,

    /// Branch that merge status is measured against (unset: detected).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,

    /// Days after which a worktree without unpushed work is considered stale.
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes after which a lock file that names no owning process is stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    // =========================================================================
    // Execution settings
    // =========================================================================
    /// Deadline applied to every external command.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Default interval between `monitor` ticks.
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    // =========================================================================
    // Session settings
    // =========================================================================
    /// Prefix for generated multiplexer session names.
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,

    /// Command started inside new sessions (unset: the login shell).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_command: Option<String>,

    /// Install project dependencies before starting a new session.
    #[serde(default)]
    pub auto_install_dependencies: bool,

    /// Regexes matched against a session's last output lines; a match means
    /// the tool inside is waiting for input.
    #[serde(default = "default_attention_patterns")]
    pub attention_patterns: Vec<String>,

    // =========================================================================
    // Integrations
    // =========================================================================
    /// Issue tracker used to decorate worktrees.
    #[serde(default)]
    pub issue_provider: IssueProviderKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worktrees_dir: default_worktrees_dir(),
            default_branch: None,
            stale_after_days: default_stale_after_days(),
            lock_stale_minutes: default_lock_stale_minutes(),
            command_timeout_secs: default_command_timeout_secs(),
            monitor_interval_secs: default_monitor_interval_secs(),
            session_prefix: default_session_prefix(),
            session_command: None,
            auto_install_dependencies: false,
            attention_patterns: default_attention_patterns(),
            issue_provider: IssueProviderKind::default(),
        }
    }
}
