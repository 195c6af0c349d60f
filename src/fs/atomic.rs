//! Atomic file replacement.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a uniquely named temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! # Cross-Platform Behavior
//!
//! - **POSIX**: `rename()` is atomic when source and destination share a
//!   filesystem, which the same-directory temp file guarantees. The parent
//!   directory is synced afterwards so the new entry survives a crash.
//! - **Other platforms**: `rename()` is tried first. If it fails, the target is
//!   replaced by copying under an exclusive `.{filename}.lock` file. That path
//!   only excludes other arbor writers: a reader racing the copy can observe a
//!   partially written file.
//!
//! Temp files are named `.{filename}.{pid}.{seq}.tmp`, so concurrent writers in
//! different processes never share one. A crash between steps 1 and 3 can leave
//! a temp file behind; readers ignore `.tmp` files.

use crate::error::{ArborError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Suffix of in-flight temporary files.
pub const TEMP_SUFFIX: &str = ".tmp";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Atomically write bytes to a file.
///
/// The target is never observable in a partial state: readers see either the
/// previous content or the new content.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            ArborError::StoreError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    atomic_replace(&temp_path, path)?;

    Ok(())
}

/// True for names produced by [`generate_temp_path`].
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(TEMP_SUFFIX))
}

fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ArborError::StoreError(format!("invalid file path '{}'", target.display()))
        })?;

    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{}.{}.{}{}", filename, std::process::id(), seq, TEMP_SUFFIX);
    Ok(parent.join(temp_name))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        ArborError::StoreError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        ArborError::StoreError(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        ArborError::StoreError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

#[cfg(unix)]
fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        ArborError::StoreError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

#[cfg(not(unix))]
fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }

    let lock_path = copy_lock_path(target);
    let lock = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
        .map_err(|e| {
            let _ = fs::remove_file(source);
            ArborError::StoreError(format!(
                "failed to lock '{}' for replacement: {}",
                target.display(),
                e
            ))
        })?;

    let copied = fs::copy(source, target)
        .and_then(|_| File::open(target))
        .and_then(|f| f.sync_all());

    drop(lock);
    let _ = fs::remove_file(&lock_path);
    let _ = fs::remove_file(source);

    copied.map_err(|e| {
        ArborError::StoreError(format!("failed to replace '{}': {}", target.display(), e))
    })
}

#[cfg(not(unix))]
fn copy_lock_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.lock", name))
}
