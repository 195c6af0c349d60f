//! Cleanup Classifier for arbor.
//!
//! Sorts secondary worktrees into the buckets the cleanup flow acts on:
//!
//! - **orphaned**: the checkout directory or branch ref is gone. Removed
//!   without confirmation since nothing is left to lose.
//! - **merged**: merged into the default branch (or the bound PR/MR is
//!   completed). Removed in bulk after one confirmation.
//! - **stale**: old with nothing unpushed, not merged. Confirmed one at a time.
//!
//! A worktree lands in at most one bucket, by that priority. The main worktree
//! and worktrees locked with `git worktree lock` are never classified.

use crate::worktree::Worktree;
use chrono::{DateTime, Duration, Utc};

/// Classified cleanup candidates. Each bucket is sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupBuckets {
    pub orphaned: Vec<Worktree>,
    pub merged: Vec<Worktree>,
    pub stale: Vec<Worktree>,
}

impl CleanupBuckets {
    pub fn is_empty(&self) -> bool {
        self.orphaned.is_empty() && self.merged.is_empty() && self.stale.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orphaned.len() + self.merged.len() + self.stale.len()
    }
}

/// Bucket a set of worktrees. Pure: same input, same buckets.
pub fn classify(worktrees: &[Worktree], stale_threshold: Duration, now: DateTime<Utc>) -> CleanupBuckets {
    let mut buckets = CleanupBuckets::default();

    for wt in worktrees.iter().filter(|w| !w.is_main && !w.locked) {
        if wt.is_orphaned() {
            buckets.orphaned.push(wt.clone());
        } else if wt.is_merged() {
            buckets.merged.push(wt.clone());
        } else if wt.is_stale(stale_threshold, now) {
            buckets.stale.push(wt.clone());
        }
    }

    for bucket in [&mut buckets.orphaned, &mut buckets.merged, &mut buckets.stale] {
        bucket.sort_by(|a, b| a.path.cmp(&b.path));
    }

    buckets
}
