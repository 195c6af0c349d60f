//! Project detection and dependency installation for new sessions.

use super::metadata::DependencyInfo;
use crate::error::{ArborError, Result};
use crate::exec::{ExecOptions, run_command};
use chrono::Utc;
use std::path::Path;

/// A detected project and how to install its dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectKind {
    pub project_type: &'static str,
    pub package_manager: &'static str,
    pub install: &'static [&'static str],
}

/// Marker file to project kind, checked in order. Lockfiles come before manifests.
const MARKERS: &[(&str, ProjectKind)] = &[
    ("Cargo.lock", ProjectKind { project_type: "rust", package_manager: "cargo", install: &["cargo", "fetch"] }),
    ("Cargo.toml", ProjectKind { project_type: "rust", package_manager: "cargo", install: &["cargo", "fetch"] }),
    ("pnpm-lock.yaml", ProjectKind { project_type: "node", package_manager: "pnpm", install: &["pnpm", "install"] }),
    ("yarn.lock", ProjectKind { project_type: "node", package_manager: "yarn", install: &["yarn", "install"] }),
    ("bun.lockb", ProjectKind { project_type: "node", package_manager: "bun", install: &["bun", "install"] }),
    ("bun.lock", ProjectKind { project_type: "node", package_manager: "bun", install: &["bun", "install"] }),
    ("package-lock.json", ProjectKind { project_type: "node", package_manager: "npm", install: &["npm", "install"] }),
    ("package.json", ProjectKind { project_type: "node", package_manager: "npm", install: &["npm", "install"] }),
    ("uv.lock", ProjectKind { project_type: "python", package_manager: "uv", install: &["uv", "sync"] }),
    ("poetry.lock", ProjectKind { project_type: "python", package_manager: "poetry", install: &["poetry", "install"] }),
    ("requirements.txt", ProjectKind { project_type: "python", package_manager: "pip", install: &["pip", "install", "-r", "requirements.txt"] }),
    ("go.mod", ProjectKind { project_type: "go", package_manager: "go", install: &["go", "mod", "download"] }),
];

/// Detect the project in `dir` from its lockfiles and manifests.
pub fn detect_project(dir: &Path) -> Option<ProjectKind> {
    MARKERS
        .iter()
        .find(|(marker, _)| dir.join(marker).is_file())
        .map(|(_, kind)| kind.clone())
}

/// Install dependencies in `dir`, returning the record to store with the session.
///
/// Nothing detected is not an error: the record says `installed: false`.
pub fn install_dependencies(dir: &Path, opts: &ExecOptions) -> Result<DependencyInfo> {
    let Some(kind) = detect_project(dir) else {
        return Ok(DependencyInfo::default());
    };

    let (program, args) = kind
        .install
        .split_first()
        .ok_or_else(|| ArborError::UserError("empty install command".to_string()))?;

    tracing::debug!(package_manager = kind.package_manager, dir = %dir.display(), "installing dependencies");
    let output = run_command(program, args, dir, opts)?;
    if !output.success() {
        return Err(ArborError::UserError(format!(
            "dependency install with {} failed (exit code {}): {}",
            kind.package_manager,
            output.code.unwrap_or(-1),
            output.failure_message()
        )));
    }

    Ok(DependencyInfo {
        installed: true,
        project_type: Some(kind.project_type.to_string()),
        package_manager: Some(kind.package_manager.to_string()),
        installed_at: Some(Utc::now()),
    })
}
