//! Audit log for arbor.
//!
//! Every mutating operation (worktree create/remove, session lifecycle, repair,
//! cleanup) appends one event to `<git-common-dir>/arbor/events.ndjson`. The log
//! is append-only NDJSON: one JSON object per line.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: the action performed (`worktree_create`, `repair`, ...)
//! - `actor`: the owner string (e.g., `user@HOST`)
//! - `worktree`: optional worktree path
//! - `session`: optional session name
//! - `details`: freeform object with action-specific details
//!
//! The log is a record, not state. [`record`] downgrades a failed append to a
//! warning so the operation being logged still succeeds.

use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    WorktreeCreate,
    WorktreeRemove,
    SessionCreate,
    SessionAttach,
    SessionRemove,
    SessionPrune,
    Repair,
    Cleanup,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::WorktreeCreate => write!(f, "worktree_create"),
            EventAction::WorktreeRemove => write!(f, "worktree_remove"),
            EventAction::SessionCreate => write!(f, "session_create"),
            EventAction::SessionAttach => write!(f, "session_attach"),
            EventAction::SessionRemove => write!(f, "session_remove"),
            EventAction::SessionPrune => write!(f, "session_prune"),
            EventAction::Repair => write!(f, "repair"),
            EventAction::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Worktree the action applied to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<String>,

    /// Session the action applied to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and actor.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            worktree: None,
            session: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_worktree(mut self, path: &Path) -> Self {
        self.worktree = Some(path.display().to_string());
        self
    }

    pub fn with_session(mut self, name: impl Into<String>) -> Self {
        self.session = Some(name.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ArborError::StoreError(format!("failed to serialize event: {}", e)))
    }
}

/// Owner string for event metadata: `USER@HOSTNAME`.
pub fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the audit log, creating the file and its directory on demand.
pub fn append_event(ctx: &RepoContext, event: &Event) -> Result<()> {
    let events_file = ctx.events_file();
    let json_line = event.to_ndjson_line()?;

    if !ctx.state_dir.exists() {
        fs::create_dir_all(&ctx.state_dir).map_err(|e| {
            ArborError::StoreError(format!(
                "failed to create state directory '{}': {}",
                ctx.state_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            ArborError::StoreError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        ArborError::StoreError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        ArborError::StoreError(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

/// Append an event, logging (not returning) any failure.
pub fn record(ctx: &RepoContext, event: Event) {
    if let Err(e) = append_event(ctx, &event) {
        tracing::warn!(action = %event.action, error = %e, "failed to append audit event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_repo, test_context};
    use serde_json::json;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::Repair);

        assert_eq!(event.action, EventAction::Repair);
        assert!(!event.actor.is_empty());
        assert!(event.worktree.is_none());
        assert!(event.session.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_serialization_is_single_line() {
        let event = Event::new(EventAction::SessionCreate)
            .with_session("arbor-repo-feature")
            .with_worktree(Path::new("/tmp/wt"))
            .with_details(json!({"command": "bash"}));

        let json_line = event.to_ndjson_line().unwrap();
        assert!(!json_line.contains('\n'));

        let parsed: Event = serde_json::from_str(&json_line).unwrap();
        assert_eq!(parsed.action, EventAction::SessionCreate);
        assert_eq!(parsed.session.as_deref(), Some("arbor-repo-feature"));
        assert_eq!(parsed.worktree.as_deref(), Some("/tmp/wt"));
        assert_eq!(parsed.details["command"], "bash");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let json_line = Event::new(EventAction::Cleanup).to_ndjson_line().unwrap();
        let parsed: Value = serde_json::from_str(&json_line).unwrap();
        assert!(parsed.get("worktree").is_none());
        assert!(parsed.get("session").is_none());
        assert_eq!(parsed["action"], "cleanup");
    }

    #[test]
    fn test_append_event_creates_file_and_appends() {
        let temp_dir = create_test_repo();
        let ctx = test_context(temp_dir.path());
        assert!(!ctx.events_file().exists());

        append_event(&ctx, &Event::new(EventAction::WorktreeCreate)).unwrap();
        append_event(&ctx, &Event::new(EventAction::WorktreeRemove)).unwrap();

        let content = fs::read_to_string(ctx.events_file()).unwrap();
        assert!(content.ends_with('\n'));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Event = serde_json::from_str(lines[0]).unwrap();
        let second: Event = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.action, EventAction::WorktreeCreate);
        assert_eq!(second.action, EventAction::WorktreeRemove);
    }

    #[test]
    fn test_event_action_display_matches_serde() {
        for action in [
            EventAction::WorktreeCreate,
            EventAction::WorktreeRemove,
            EventAction::SessionCreate,
            EventAction::SessionAttach,
            EventAction::SessionRemove,
            EventAction::SessionPrune,
            EventAction::Repair,
            EventAction::Cleanup,
        ] {
            let serialized = serde_json::to_value(action).unwrap();
            assert_eq!(serialized, Value::String(action.to_string()));
        }
    }

    #[test]
    fn test_actor_string() {
        assert!(actor_string().contains('@'));
    }
}
