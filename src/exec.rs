//! External command execution for arbor.
//!
//! Every git, tmux, provider, and package-manager invocation goes through
//! [`run_command`]. It captures stdout/stderr, enforces an optional deadline,
//! and honors a caller-supplied [`CancelToken`]. Spawn failures, timeouts, and
//! cancellation are returned as typed errors; a non-zero exit status is not an
//! error at this level, callers decide what it means.

use crate::error::{ArborError, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a UI thread can cancel work running on
/// another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options applied to a single command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Kill the process and fail with `CommandTimeout` after this long.
    pub timeout: Option<Duration>,
    /// Kill the process and fail with `Canceled` once this is triggered.
    pub cancel: Option<CancelToken>,
}

impl ExecOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    pub fn cancel_with(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output (trimmed).
    pub stdout: String,
    /// Standard error (trimmed).
    pub stderr: String,
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The most useful message to show for a failed command.
    pub fn failure_message(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Run `program` with `args` in `cwd`, applying the timeout and cancellation in `opts`.
pub fn run_command(
    program: &str,
    args: &[&str],
    cwd: &Path,
    opts: &ExecOptions,
) -> Result<CommandOutput> {
    let shown = describe(program, args);
    tracing::debug!(command = %shown, cwd = %cwd.display(), "running command");

    let mut child = Command::new(program)
        .current_dir(cwd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ArborError::UserError(format!("failed to execute {}: {}", shown, e)))?;

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = wait_with_deadline(&mut child, opts, &shown)?;

    Ok(CommandOutput {
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
        code: status.code(),
    })
}

fn wait_with_deadline(child: &mut Child, opts: &ExecOptions, shown: &str) -> Result<ExitStatus> {
    let started = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                kill_quietly(child);
                return Err(ArborError::UserError(format!(
                    "failed to wait for {}: {}",
                    shown, e
                )));
            }
        }

        if opts.cancel.as_ref().is_some_and(CancelToken::is_canceled) {
            kill_quietly(child);
            return Err(ArborError::Canceled(shown.to_string()));
        }

        if let Some(timeout) = opts.timeout
            && started.elapsed() >= timeout
        {
            kill_quietly(child);
            return Err(ArborError::CommandTimeout(format!(
                "{} (after {}s)",
                shown,
                timeout.as_secs_f32()
            )));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_quietly(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(
    source: Option<R>,
) -> Option<JoinHandle<std::io::Result<Vec<u8>>>> {
    source.map(|mut source| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            source.read_to_end(&mut buf).map(|_| buf)
        })
    })
}

fn join_reader(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> String {
    let bytes = handle
        .and_then(|h| h.join().ok())
        .and_then(|r| r.ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

fn describe(program: &str, args: &[&str]) -> String {
    match args.first() {
        Some(sub) => format!("{} {}", program, sub),
        None => program.to_string(),
    }
}
