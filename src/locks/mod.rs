//! Lock File Detector for arbor.
//!
//! Git guards its administrative files with `*.lock` files (`index.lock`,
//! `HEAD.lock`, `refs/heads/<branch>.lock`, ...). A process that crashes while
//! holding one leaves it behind and every later git command in that worktree
//! fails. This module finds those files and decides which are stale.
//!
//! # Classification
//!
//! - A lock whose content names a process id is **active** while that process
//!   exists and **stale** once it is gone.
//! - A lock with no process id is stale once its modification age exceeds
//!   `lock_stale_minutes`.
//! - When liveness cannot be determined the lock is assumed active. A wrong
//!   "active" only delays cleanup; a wrong "stale" could break a running git.
//!
//! A recycled pid (the owner died and an unrelated process took its id) reads
//! as active. This is accepted rather than verified per platform.
//!
//! Arbor never creates locks of its own; it only reads these and deletes the
//! ones it has classified as stale.

mod detector;
mod probe;
mod types;


pub use detector::{LockDetector, get_stale, parse_pid, remove};
pub use probe::{ProcessProbe, SystemProbe};
pub use types::LockFile;
