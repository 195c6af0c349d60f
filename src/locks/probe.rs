//! Process-liveness probing.

use crate::exec::{ExecOptions, run_command};
use std::path::Path;
use std::time::Duration;

/// Answers "does a process with this id exist?".
///
/// `None` means the answer could not be determined. Callers treat that as alive.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> Option<bool>;
}

/// Probe backed by the operating system.
///
/// Linux checks `/proc/<pid>`. Other Unix systems run `kill -0 <pid>`. Elsewhere
/// liveness is unknown.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> Option<bool> {
        if pid == 0 {
            return None;
        }
        probe_pid(pid)
    }
}

#[cfg(target_os = "linux")]
fn probe_pid(pid: u32) -> Option<bool> {
    let proc_root = Path::new("/proc");
    if !proc_root.join("self").exists() {
        return None;
    }
    Some(proc_root.join(pid.to_string()).exists())
}

#[cfg(all(unix, not(target_os = "linux")))]
fn probe_pid(pid: u32) -> Option<bool> {
    let opts = ExecOptions::with_timeout(Duration::from_secs(5));
    let pid_arg = pid.to_string();
    let output = run_command("kill", &["-0", &pid_arg], Path::new("/"), &opts).ok()?;
    if output.success() {
        return Some(true);
    }
    let stderr = output.stderr.to_ascii_lowercase();
    if stderr.contains("no such process") {
        Some(false)
    } else if stderr.contains("not permitted") {
        // Exists, owned by another user.
        Some(true)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn probe_pid(_pid: u32) -> Option<bool> {
    None
}
