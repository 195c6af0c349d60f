//! Session metadata record and its status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Observed state of a background session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session exists and its process is active.
    Running,
    /// Session exists but nobody is attached.
    Paused,
    /// Session exists with no recent activity.
    Idle,
    /// The tool inside appears to be waiting on input.
    NeedsAttention,
    /// The tool inside exited abnormally.
    Failed,
    Unknown,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Idle => "idle",
            SessionStatus::NeedsAttention => "needs_attention",
            SessionStatus::Failed => "failed",
            SessionStatus::Unknown => "unknown",
        }
    }

    /// Single-character marker for listings.
    pub fn icon(&self) -> &'static str {
        match self {
            SessionStatus::Running => "●",
            SessionStatus::Paused => "◐",
            SessionStatus::Idle => "○",
            SessionStatus::NeedsAttention => "!",
            SessionStatus::Failed => "✗",
            SessionStatus::Unknown => "?",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which multiplexer implementation created a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Tmux,
    #[serde(other)]
    Unknown,
}

/// Dependency installation performed when the session was set up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

/// Durable record describing one background session bound to a worktree.
///
/// Fields written by newer versions are kept in `extra` and written back
/// unchanged, so an older binary never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Unique key; also the multiplexer session name.
    pub session_name: String,
    pub session_id: String,
    pub backend: BackendKind,
    pub worktree_path: PathBuf,
    pub branch: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default)]
    pub window_count: u32,
    #[serde(default)]
    pub pane_count: u32,
    #[serde(default)]
    pub dependencies: DependencyInfo,
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SessionMetadata {
    /// A fresh record for a session just created by `backend`.
    pub fn new(
        session_name: impl Into<String>,
        backend: BackendKind,
        worktree_path: impl Into<PathBuf>,
        branch: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_name: session_name.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            backend,
            worktree_path: worktree_path.into(),
            branch: branch.into(),
            created_at: now,
            last_accessed_at: now,
            status: SessionStatus::Unknown,
            window_count: 1,
            pane_count: 1,
            dependencies: DependencyInfo::default(),
            custom: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}
