//! Command implementations for arbor.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each command resolves the repository, builds the
//! components it needs, and renders their results. Per-item failures inside
//! a batch are printed and do not change the exit status.

mod cleanup;
mod create;
mod display;
mod health_check;
mod list;
mod locks;
mod monitor;
mod prompt;
mod remove;
mod repair;
mod session;

use crate::cli::{Command, SessionAction};
use crate::config::Config;
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::exec::ExecOptions;
use crate::git::Git;
use crate::session::{SessionStore, TmuxBackend};
use std::env;
use std::path::PathBuf;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::List(args) => list::cmd_list(args),
        Command::Create(args) => create::cmd_create(args),
        Command::Remove(args) => remove::cmd_remove(args),
        Command::HealthCheck(args) => health_check::cmd_health_check(args),
        Command::Repair(args) => repair::cmd_repair(args),
        Command::Monitor(args) => monitor::cmd_monitor(args),
        Command::Cleanup(args) => cleanup::cmd_cleanup(args),
        Command::Locks => locks::cmd_locks(),
        Command::Session(cmd) => match cmd.action {
            SessionAction::Create(args) => session::cmd_session_create(args),
            SessionAction::Attach(args) => session::cmd_session_attach(args),
            SessionAction::List => session::cmd_session_list(),
            SessionAction::Refresh => session::cmd_session_refresh(),
            SessionAction::Prune(args) => session::cmd_session_prune(args),
        },
    }
}

/// Resolve the repository around the current directory and load its config.
pub(crate) fn load_workspace() -> Result<(RepoContext, Config)> {
    let repo_root = RepoContext::locate_repo_root(&Git::default())?;
    let config = Config::load_or_default(RepoContext::config_path_for(&repo_root))?;
    let ctx = RepoContext::resolve_from(current_dir()?, &config)?;
    Ok((ctx, config))
}

pub(crate) fn current_dir() -> Result<PathBuf> {
    env::current_dir().map_err(|e| {
        ArborError::UserError(format!("failed to get current working directory: {}", e))
    })
}

pub(crate) fn session_store(ctx: &RepoContext) -> SessionStore {
    SessionStore::new(ctx.sessions_dir.clone())
}

pub(crate) fn tmux_backend(config: &Config) -> TmuxBackend {
    TmuxBackend::new(ExecOptions::with_timeout(config.command_timeout()))
}
