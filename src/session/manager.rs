//! Session operations that keep the metadata store and the backend in step.

use super::backend::SessionBackend;
use super::deps::install_dependencies;
use super::metadata::{DependencyInfo, SessionMetadata, SessionStatus};
use super::naming::session_name;
use super::reconcile::{Reconciliation, reconcile};
use super::status::StatusInference;
use super::store::SessionStore;
use crate::config::Config;
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::events::{self, Event, EventAction};
use crate::exec::ExecOptions;
use crate::worktree::Worktree;
use chrono::Utc;
use serde_json::json;

/// Outcome of `create_session`.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub metadata: SessionMetadata,
    /// A live session with a record already existed and was returned as is.
    pub reused: bool,
    /// Non-fatal problems, e.g. a failed dependency install.
    pub warnings: Vec<String>,
}

/// Per-session outcome of a batch operation.
#[derive(Debug)]
pub struct SessionOutcome<T> {
    pub session_name: String,
    pub result: Result<T>,
}

/// Start a background session for `worktree` and record it.
pub fn create_session(
    ctx: &RepoContext,
    config: &Config,
    store: &SessionStore,
    backend: &dyn SessionBackend,
    worktree: &Worktree,
    command: Option<&str>,
    install_deps: bool,
) -> Result<CreatedSession> {
    if !worktree.path_exists {
        return Err(ArborError::UserError(format!(
            "worktree '{}' does not exist on disk",
            worktree.path.display()
        )));
    }
    if !backend.is_available() {
        return Err(ArborError::SessionError(
            "no terminal multiplexer available (install tmux)".to_string(),
        ));
    }
    store.ensure_dir()?;

    let label = if worktree.branch.is_empty() {
        worktree
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "detached".to_string())
    } else {
        worktree.branch.clone()
    };
    let name = session_name(&config.session_prefix, &ctx.repo_name(), &label);

    if backend.has_session(&name)? {
        match store.load(&name) {
            Ok(mut metadata) => {
                store.save(&mut metadata)?;
                return Ok(CreatedSession {
                    metadata,
                    reused: true,
                    warnings: Vec::new(),
                });
            }
            Err(e) if e.is_not_found() => {
                return Err(ArborError::SessionError(format!(
                    "a session named '{}' already exists but was not created by arbor",
                    name
                )));
            }
            Err(e) => return Err(e),
        }
    }

    let mut warnings = Vec::new();
    let dependencies = if install_deps {
        let opts = ExecOptions::default();
        match install_dependencies(&worktree.path, &opts) {
            Ok(info) => info,
            Err(e) => {
                warnings.push(e.to_string());
                DependencyInfo::default()
            }
        }
    } else {
        DependencyInfo::default()
    };

    let command = command.or(config.session_command.as_deref());
    backend.create_session(&name, &worktree.path, command)?;

    let mut metadata = SessionMetadata::new(&name, backend.kind(), &worktree.path, &worktree.branch);
    metadata.dependencies = dependencies;
    metadata.status = match backend.probe(&name) {
        Ok(probe) => {
            if let Some(p) = &probe {
                metadata.window_count = p.windows;
                metadata.pane_count = p.panes;
            }
            StatusInference::from_config(config)?.infer(probe.as_ref(), Utc::now())
        }
        Err(e) => {
            tracing::warn!(session = %name, error = %e, "could not probe new session");
            SessionStatus::Unknown
        }
    };
    store.save(&mut metadata)?;

    events::record(
        ctx,
        Event::new(EventAction::SessionCreate)
            .with_session(&name)
            .with_worktree(&worktree.path)
            .with_details(json!({
                "command": command,
                "dependencies_installed": metadata.dependencies.installed,
            })),
    );

    Ok(CreatedSession {
        metadata,
        reused: false,
        warnings,
    })
}

/// Attach to a live session, recording the access first.
pub fn attach_session(
    ctx: &RepoContext,
    store: &SessionStore,
    backend: &dyn SessionBackend,
    name: &str,
) -> Result<()> {
    if !backend.has_session(name)? {
        let hint = if store.exists(name) {
            "\n\nIts metadata is orphaned; remove it with `arbor session prune`."
        } else {
            ""
        };
        return Err(ArborError::SessionError(format!(
            "session '{}' is not running{}",
            name, hint
        )));
    }

    match store.load(name) {
        Ok(mut metadata) => {
            metadata.status = SessionStatus::Running;
            store.save(&mut metadata)?;
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => tracing::warn!(session = %name, error = %e, "session metadata unavailable"),
    }

    events::record(ctx, Event::new(EventAction::SessionAttach).with_session(name));
    backend.attach_to_session(name)
}

/// Compare stored records with the backend's live sessions.
pub fn reconcile_sessions(
    config: &Config,
    store: &SessionStore,
    backend: &dyn SessionBackend,
) -> Result<Reconciliation> {
    let records = store.list_all()?;
    let live = backend.list_sessions()?;
    Ok(reconcile(records, &live, &config.session_prefix))
}

/// Re-infer and store the status of every recorded session.
///
/// Each session is handled independently; a probe or write failure is
/// reported for that session only.
pub fn refresh_statuses(
    store: &SessionStore,
    backend: &dyn SessionBackend,
    inference: &StatusInference,
) -> Result<Vec<SessionOutcome<SessionStatus>>> {
    let now = Utc::now();
    let outcomes = store
        .list_all()?
        .into_iter()
        .map(|meta| {
            let result = backend.probe(&meta.session_name).and_then(|probe| {
                let status = inference.infer(probe.as_ref(), now);
                store.update(&meta.session_name, |record| {
                    record.status = status;
                    if let Some(p) = &probe {
                        record.window_count = p.windows;
                        record.pane_count = p.panes;
                    }
                })?;
                Ok(status)
            });
            SessionOutcome {
                session_name: meta.session_name,
                result,
            }
        })
        .collect();
    Ok(outcomes)
}

/// Delete the given orphaned records. Live sessions are re-checked first and skipped.
pub fn prune_orphans(
    ctx: &RepoContext,
    store: &SessionStore,
    backend: &dyn SessionBackend,
    orphaned: &[SessionMetadata],
) -> Vec<SessionOutcome<()>> {
    orphaned
        .iter()
        .map(|meta| {
            let name = meta.session_name.clone();
            let result = match backend.has_session(&name) {
                Ok(true) => Err(ArborError::SessionError(format!(
                    "session '{}' is live again; not pruned",
                    name
                ))),
                Ok(false) => store.delete(&name).or_else(|e| {
                    if e.is_not_found() { Ok(()) } else { Err(e) }
                }),
                Err(e) => Err(e),
            };
            if result.is_ok() {
                events::record(
                    ctx,
                    Event::new(EventAction::SessionPrune)
                        .with_session(&name)
                        .with_worktree(&meta.worktree_path),
                );
            }
            SessionOutcome {
                session_name: name,
                result,
            }
        })
        .collect()
}
