//! tmux implementation of [`SessionBackend`].

use super::backend::{SessionBackend, SessionProbe};
use super::metadata::BackendKind;
use crate::error::{ArborError, Result};
use crate::exec::{CommandOutput, ExecOptions, run_command};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Lines of pane output captured for status inference.
const TAIL_LINES: usize = 15;

const PROBE_FORMAT: &str =
    "#{session_attached}\t#{session_activity}\t#{pane_dead}\t#{pane_dead_status}\t#{session_windows}";

#[derive(Debug, Clone, Default)]
pub struct TmuxBackend {
    opts: ExecOptions,
}

impl TmuxBackend {
    pub fn new(opts: ExecOptions) -> Self {
        Self { opts }
    }

    fn tmux(&self, args: &[&str]) -> Result<CommandOutput> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        run_command("tmux", args, &cwd, &self.opts).map_err(|e| match e {
            ArborError::UserError(msg) => {
                ArborError::SessionError(format!("{} (is tmux installed?)", msg))
            }
            other => other,
        })
    }

    fn tmux_ok(&self, args: &[&str], action: &str, name: &str) -> Result<CommandOutput> {
        let output = self.tmux(args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(ArborError::SessionError(format!(
                "failed to {} session '{}': {}",
                action,
                name,
                output.failure_message()
            )))
        }
    }
}

/// Exact-match session target. A bare name would prefix-match other sessions.
fn session_target(name: &str) -> String {
    format!("={}", name)
}

/// Target for the active pane of a session.
fn pane_target(name: &str) -> String {
    format!("={}:", name)
}

/// tmux reports "no server" when zero sessions exist.
fn is_no_server(stderr: &str) -> bool {
    stderr.contains("no server running")
        || stderr.contains("no sessions")
        || stderr.contains("error connecting to")
}

impl SessionBackend for TmuxBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tmux
    }

    fn is_available(&self) -> bool {
        self.tmux(&["-V"]).is_ok_and(|o| o.success())
    }

    fn has_session(&self, name: &str) -> Result<bool> {
        let output = self.tmux(&["has-session", "-t", &session_target(name)])?;
        Ok(output.success())
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        let output = self.tmux(&["list-sessions", "-F", "#{session_name}"])?;
        if !output.success() {
            if is_no_server(&output.stderr) {
                return Ok(Vec::new());
            }
            return Err(ArborError::SessionError(format!(
                "failed to list sessions: {}",
                output.failure_message()
            )));
        }
        let mut names: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    fn create_session(&self, name: &str, working_dir: &Path, command: Option<&str>) -> Result<()> {
        tracing::debug!(name, ?working_dir, command, "creating tmux session");

        if self.has_session(name)? {
            return Err(ArborError::SessionError(format!(
                "session '{}' already exists",
                name
            )));
        }

        let dir = working_dir.to_string_lossy().to_string();
        let argv = match command {
            Some(cmd) => shell_words::split(cmd).map_err(|e| {
                ArborError::UserError(format!("invalid session command '{}': {}", cmd, e))
            })?,
            None => Vec::new(),
        };

        let mut args: Vec<&str> = vec!["new-session", "-d", "-s", name, "-c", &dir];
        args.extend(argv.iter().map(String::as_str));
        self.tmux_ok(&args, "create", name)?;

        // Keep exited panes around so a failed tool is observable.
        let target = session_target(name);
        if let Err(e) = self.tmux_ok(
            &["set-option", "-t", &target, "remain-on-exit", "on"],
            "configure",
            name,
        ) {
            tracing::warn!(name, error = %e, "could not enable remain-on-exit");
        }

        Ok(())
    }

    fn attach_to_session(&self, name: &str) -> Result<()> {
        let target = session_target(name);
        // Inside tmux, attaching would nest; switch the current client instead.
        let subcommand = if std::env::var_os("TMUX").is_some() {
            "switch-client"
        } else {
            "attach-session"
        };

        let status = Command::new("tmux")
            .args([subcommand, "-t", &target])
            .status()
            .map_err(|e| {
                ArborError::SessionError(format!("failed to execute tmux (is tmux installed?): {}", e))
            })?;

        if !status.success() {
            return Err(ArborError::SessionError(format!(
                "failed to attach to session '{}' (exit code {})",
                name,
                status.code().unwrap_or(-1)
            )));
        }
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        self.tmux_ok(&["kill-session", "-t", &session_target(name)], "kill", name)?;
        Ok(())
    }

    fn probe(&self, name: &str) -> Result<Option<SessionProbe>> {
        if !self.has_session(name)? {
            return Ok(None);
        }

        let pane = pane_target(name);
        let info = self.tmux_ok(&["display-message", "-p", "-t", &pane, PROBE_FORMAT], "inspect", name)?;
        let Some(mut probe) = parse_probe_line(&info.stdout) else {
            return Err(ArborError::SessionError(format!(
                "unexpected tmux output for session '{}': '{}'",
                name, info.stdout
            )));
        };

        let panes = self.tmux(&["list-panes", "-s", "-t", &session_target(name), "-F", "#{pane_id}"])?;
        if panes.success() {
            probe.panes = panes.stdout.lines().filter(|l| !l.trim().is_empty()).count() as u32;
        }

        let start = format!("-{}", TAIL_LINES);
        let capture = self.tmux(&["capture-pane", "-p", "-t", &pane, "-S", &start])?;
        if capture.success() {
            probe.tail = capture.stdout;
        }

        Ok(Some(probe))
    }
}

/// Parse one `display-message` line produced with [`PROBE_FORMAT`].
fn parse_probe_line(line: &str) -> Option<SessionProbe> {
    let fields: Vec<&str> = line.trim_end_matches('\n').split('\t').collect();
    if fields.len() < 5 {
        return None;
    }

    let attached = fields[0].trim().parse::<u32>().ok()? > 0;
    let last_activity = fields[1]
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    let pane_dead = fields[2].trim() == "1";
    let exit_status = fields[3].trim().parse::<i32>().ok();
    let windows = fields[4].trim().parse::<u32>().unwrap_or(1);

    Some(SessionProbe {
        attached,
        last_activity,
        pane_dead,
        exit_status,
        tail: String::new(),
        windows,
        panes: windows,
    })
}
