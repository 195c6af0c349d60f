//! Lock file description.

use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;

/// One `*.lock` artifact and its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFile {
    pub path: PathBuf,

    /// Owning process id, when the file content names one.
    pub pid: Option<u32>,

    /// Whether the owner is considered alive. Stale locks have this false.
    pub process_alive: bool,

    /// Last modification time of the file.
    pub modified: Option<DateTime<Utc>>,

    /// Age at detection time, from the modification time.
    pub age: Duration,
}

impl LockFile {
    pub fn is_stale(&self) -> bool {
        !self.process_alive
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let minutes = self.age.num_minutes();
        let hours = self.age.num_hours();
        let days = self.age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }
}

impl std::fmt::Display for LockFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let owner = match self.pid {
            Some(pid) => format!("pid {}", pid),
            None => "no pid".to_string(),
        };
        write!(
            f,
            "{} ({}, age: {}{})",
            self.path.display(),
            owner,
            self.age_string(),
            if self.is_stale() { ", STALE" } else { "" }
        )
    }
}
