//! Session Manager capability.
//!
//! The core never talks to a multiplexer directly. It depends on
//! [`SessionBackend`] for existence, listing, creation, and attach, plus a
//! best-effort [`SessionProbe`] used for status inference.

use super::metadata::BackendKind;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Point-in-time observation of a live session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProbe {
    /// At least one client is attached.
    pub attached: bool,
    pub last_activity: Option<DateTime<Utc>>,
    /// The session's active pane has exited but is kept open.
    pub pane_dead: bool,
    /// Exit status of the dead pane's process.
    pub exit_status: Option<i32>,
    /// Last lines of visible pane output.
    pub tail: String,
    pub windows: u32,
    pub panes: u32,
}

/// A terminal multiplexer that hosts background sessions.
pub trait SessionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Whether the multiplexer is installed and usable.
    fn is_available(&self) -> bool;

    fn has_session(&self, name: &str) -> Result<bool>;

    /// Names of every live session.
    fn list_sessions(&self) -> Result<Vec<String>>;

    /// Start a detached session in `working_dir` running `command` (a login shell when `None`).
    fn create_session(&self, name: &str, working_dir: &Path, command: Option<&str>) -> Result<()>;

    /// Attach the current terminal to `name`. Returns once the client detaches.
    fn attach_to_session(&self, name: &str) -> Result<()>;

    fn kill_session(&self, name: &str) -> Result<()>;

    /// Observe a session. `Ok(None)` when it does not exist.
    fn probe(&self, name: &str) -> Result<Option<SessionProbe>>;
}
