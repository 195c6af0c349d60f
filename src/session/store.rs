//! Session Metadata Store.
//!
//! One JSON document per session in `<git-common-dir>/arbor/sessions/`, named
//! after the percent-encoded session name. Every write goes through
//! [`atomic_write`], so concurrent writers resolve to last-writer-wins and
//! readers never see a partial record.

use super::metadata::{SessionMetadata, SessionStatus};
use crate::error::{ArborError, Result};
use crate::fs::atomic::{atomic_write, is_temp_file};
use crate::worktree::paths_equivalent;
use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";

/// Outcome of scanning the store: readable records plus the files that were not.
#[derive(Debug, Default)]
pub struct StoreScan {
    pub records: Vec<SessionMetadata>,
    pub unreadable: Vec<(PathBuf, ArborError)>,
}

/// File-backed store, one record per session name.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the store directory. Failure here is fatal to the caller.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            ArborError::StoreError(format!(
                "failed to create session store '{}': {}",
                self.dir.display(),
                e
            ))
        })
    }

    /// Storage location for a session name.
    pub fn path_for(&self, session_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_name(session_name), RECORD_EXTENSION))
    }

    /// Persist `meta`, refreshing `last_accessed_at` to now.
    pub fn save(&self, meta: &mut SessionMetadata) -> Result<()> {
        meta.last_accessed_at = Utc::now();
        self.write(meta)
    }

    /// Load one record.
    ///
    /// Returns `NotFound` when no record exists and `DecodeError` when one
    /// exists but cannot be parsed or belongs to a different name.
    pub fn load(&self, session_name: &str) -> Result<SessionMetadata> {
        let path = self.path_for(session_name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArborError::NotFound(format!("session '{}'", session_name)));
            }
            Err(e) => {
                return Err(ArborError::StoreError(format!(
                    "failed to read '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let meta = decode(&path, &content)?;
        if meta.session_name != session_name {
            return Err(ArborError::DecodeError(format!(
                "'{}' holds session '{}', expected '{}'",
                path.display(),
                meta.session_name,
                session_name
            )));
        }
        Ok(meta)
    }

    /// Delete one record. `NotFound` when there is nothing to delete.
    pub fn delete(&self, session_name: &str) -> Result<()> {
        let path = self.path_for(session_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ArborError::NotFound(format!("session '{}'", session_name)))
            }
            Err(e) => Err(ArborError::StoreError(format!(
                "failed to delete '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn exists(&self, session_name: &str) -> bool {
        self.path_for(session_name).is_file()
    }

    /// Every readable record, sorted by session name. Unreadable records are skipped.
    pub fn list_all(&self) -> Result<Vec<SessionMetadata>> {
        let scan = self.scan()?;
        for (path, error) in &scan.unreadable {
            tracing::warn!(file = %path.display(), error = %error, "skipping unreadable session record");
        }
        Ok(scan.records)
    }

    /// Every record file, split into readable records and failures.
    pub fn scan(&self) -> Result<StoreScan> {
        let mut scan = StoreScan::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(scan),
            Err(e) => {
                return Err(ArborError::StoreError(format!(
                    "failed to read session store '{}': {}",
                    self.dir.display(),
                    e
                )));
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if is_temp_file(&path)
                || path.extension().and_then(|s| s.to_str()) != Some(RECORD_EXTENSION)
            {
                continue;
            }

            let result = fs::read_to_string(&path)
                .map_err(|e| {
                    ArborError::StoreError(format!("failed to read '{}': {}", path.display(), e))
                })
                .and_then(|content| decode(&path, &content));

            match result {
                Ok(meta) => scan.records.push(meta),
                Err(e) => scan.unreadable.push((path, e)),
            }
        }

        scan.records
            .sort_by(|a, b| a.session_name.cmp(&b.session_name));
        scan.unreadable.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(scan)
    }

    /// Records bound to the worktree at `path`.
    pub fn list_for_worktree(&self, path: &Path) -> Result<Vec<SessionMetadata>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|m| paths_equivalent(&m.worktree_path, path))
            .collect())
    }

    /// Change the status of an existing record, leaving `last_accessed_at` alone.
    pub fn update_status(&self, session_name: &str, status: SessionStatus) -> Result<()> {
        self.update(session_name, |meta| meta.status = status)
    }

    /// Apply `change` to an existing record and write it back when anything
    /// differs. `last_accessed_at` is left alone.
    pub fn update<F>(&self, session_name: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut SessionMetadata),
    {
        let before = self.load(session_name)?;
        let mut after = before.clone();
        change(&mut after);
        if after == before {
            return Ok(());
        }
        self.write(&after)
    }

    fn write(&self, meta: &SessionMetadata) -> Result<()> {
        if meta.session_name.is_empty() {
            return Err(ArborError::UserError(
                "session name must not be empty".to_string(),
            ));
        }
        self.ensure_dir()?;

        let mut json = serde_json::to_string_pretty(meta).map_err(|e| {
            ArborError::StoreError(format!(
                "failed to serialize session '{}': {}",
                meta.session_name, e
            ))
        })?;
        json.push('\n');

        atomic_write(self.path_for(&meta.session_name), json.as_bytes())
    }
}

fn decode(path: &Path, content: &str) -> Result<SessionMetadata> {
    let meta: SessionMetadata = serde_json::from_str(content)
        .map_err(|e| ArborError::DecodeError(format!("'{}': {}", path.display(), e)))?;
    if meta.session_name.is_empty() {
        return Err(ArborError::DecodeError(format!(
            "'{}': empty session name",
            path.display()
        )));
    }
    Ok(meta)
}

/// Encode a session name as a single file-name component.
///
/// `[A-Za-z0-9_-]` pass through; every other byte becomes `%XX`. Encoded names
/// never start with `.`, so they cannot collide with in-flight temp files.
fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("arbor-repo-feat_1"), "arbor-repo-feat_1");
        assert_eq!(encode_name("a/b"), "a%2Fb");
        assert_eq!(encode_name(".hidden"), "%2Ehidden");
        assert_eq!(encode_name("é"), "%C3%A9");
    }

    #[test]
    fn test_distinct_names_get_distinct_paths() {
        let store = SessionStore::new("/tmp/sessions");
        assert_ne!(store.path_for("a/b"), store.path_for("a-b"));
        assert_ne!(store.path_for("a.b"), store.path_for("a_b"));
    }
}
