//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{ArborError, Result};
use chrono::Duration as ChronoDuration;
use std::path::{Component, Path};
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ArborError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content).map_err(|e| {
            ArborError::UserError(format!("{} (in '{}')", e, path.display()))
        })
    }

    /// Load config if the file exists, otherwise return defaults.
    ///
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to null, which means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| ArborError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ArborError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("stale_after_days", u64::from(self.stale_after_days)),
            ("lock_stale_minutes", u64::from(self.lock_stale_minutes)),
            ("command_timeout_secs", self.command_timeout_secs),
            ("monitor_interval_secs", self.monitor_interval_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ArborError::UserError(format!(
                    "config validation failed: {} must be greater than 0",
                    name
                )));
            }
        }

        let dir = Path::new(&self.worktrees_dir);
        if self.worktrees_dir.is_empty()
            || dir.is_absolute()
            || dir.components().any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ArborError::UserError(format!(
                "config validation failed: worktrees_dir must be a relative path without '..' (found '{}')",
                self.worktrees_dir
            )));
        }

        if self.session_prefix.is_empty() {
            return Err(ArborError::UserError(
                "config validation failed: session_prefix must be non-empty".to_string(),
            ));
        }

        for pattern in &self.attention_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                ArborError::UserError(format!(
                    "invalid regex pattern in attention_patterns: '{}' - {}\n\
                     Fix: edit .arbor/config.yaml and correct or remove this pattern.",
                    pattern, e
                ))
            })?;
        }

        Ok(())
    }

    /// Age beyond which a worktree with no unpushed work is stale.
    pub fn stale_threshold(&self) -> ChronoDuration {
        ChronoDuration::days(i64::from(self.stale_after_days))
    }

    /// Age beyond which a lock without an owning pid is stale.
    pub fn lock_stale_threshold(&self) -> ChronoDuration {
        ChronoDuration::minutes(i64::from(self.lock_stale_minutes))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}
