//! Session status inference from a backend probe.

use super::backend::SessionProbe;
use super::metadata::SessionStatus;
use crate::config::Config;
use crate::error::{ArborError, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

/// A detached session with no output for this long is idle.
pub const IDLE_AFTER_MINUTES: i64 = 10;

/// Only the last few non-empty lines decide whether a tool is waiting on input.
const PROMPT_WINDOW_LINES: usize = 5;

/// Compiled attention patterns, built once per run.
pub struct StatusInference {
    patterns: Vec<Regex>,
    idle_after: Duration,
}

impl StatusInference {
    pub fn from_config(config: &Config) -> Result<Self> {
        let patterns = config
            .attention_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    ArborError::UserError(format!(
                        "invalid regex pattern in attention_patterns: '{}' - {}",
                        p, e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            idle_after: Duration::minutes(IDLE_AFTER_MINUTES),
        })
    }

    /// Map an observation to a status.
    ///
    /// Precedence: failed, needs attention, running (attached), paused
    /// (recent activity), idle. No observation means unknown.
    pub fn infer(&self, probe: Option<&SessionProbe>, now: DateTime<Utc>) -> SessionStatus {
        let Some(probe) = probe else {
            return SessionStatus::Unknown;
        };

        if probe.pane_dead {
            return match probe.exit_status {
                Some(0) => SessionStatus::Idle,
                _ => SessionStatus::Failed,
            };
        }

        if self.waiting_for_input(&probe.tail) {
            return SessionStatus::NeedsAttention;
        }

        if probe.attached {
            return SessionStatus::Running;
        }

        match probe.last_activity {
            Some(at) if now.signed_duration_since(at) <= self.idle_after => SessionStatus::Paused,
            _ => SessionStatus::Idle,
        }
    }

    fn waiting_for_input(&self, tail: &str) -> bool {
        let lines: Vec<&str> = tail.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(PROMPT_WINDOW_LINES);
        lines[start..]
            .iter()
            .any(|line| self.patterns.iter().any(|re| re.is_match(line)))
    }
}
