//! Implementation of the `arbor locks` command.

use super::load_workspace;
use crate::error::Result;
use crate::locks::{LockDetector, LockFile};

pub fn cmd_locks() -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let detector = LockDetector::new(&config);

    let locks = detector.detect(&ctx.common_dir)?;
    if locks.is_empty() {
        println!("No lock files.");
        return Ok(());
    }

    println!("{:<8} {:<8} {:>6}  {:<6} PATH", "PID", "OWNER", "AGE", "STATE");
    for lock in &locks {
        println!(
            "{:<8} {:<8} {:>6}  {:<6} {}",
            lock.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            owner_state(lock),
            lock.age_string(),
            if lock.is_stale() { "stale" } else { "active" },
            display_path(lock, &ctx.common_dir)
        );
    }

    let stale = locks.iter().filter(|l| l.is_stale()).count();
    println!();
    println!("{} lock(s), {} stale", locks.len(), stale);
    if stale > 0 {
        println!("Remove stale locks with `arbor repair --all`.");
    }

    Ok(())
}

fn owner_state(lock: &LockFile) -> &'static str {
    match (lock.pid, lock.process_alive) {
        (None, _) => "unknown",
        (Some(_), true) => "running",
        (Some(_), false) => "exited",
    }
}

fn display_path(lock: &LockFile, common_dir: &std::path::Path) -> String {
    lock.path
        .strip_prefix(common_dir)
        .unwrap_or(&lock.path)
        .display()
        .to_string()
}
