//! Implementation of the `arbor list` command.

use super::display::{format_age, format_ahead_behind};
use super::{load_workspace, session_store, tmux_backend};
use crate::cli::ListArgs;
use crate::error::Result;
use crate::session::{SessionBackend, SessionMetadata, SessionStore};
use crate::worktree::{Inventory, Worktree, paths_equivalent};
use chrono::Utc;
use std::collections::HashSet;

pub fn cmd_list(args: ListArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let inventory = Inventory::new(&ctx, &config);
    let backend = tmux_backend(&config);

    let mut worktrees = inventory.list_with_merge_status()?;
    if args.merged {
        worktrees.retain(Worktree::is_merged);
    }

    if worktrees.is_empty() {
        println!("No worktrees.");
        return Ok(());
    }

    let sessions = SessionIndex::load(&session_store(&ctx), &backend);
    let threshold = config.stale_threshold();
    let now = Utc::now();

    println!(
        "{:<28} {:>5} {:>8}  {:<14} {:<20} PATH",
        "BRANCH", "AGE", "+/-", "REASON", "SESSION"
    );
    for wt in &worktrees {
        let age = if wt.created.is_some() {
            format_age(wt.age_at(now))
        } else {
            "-".to_string()
        };
        println!(
            "{:<28} {:>5} {:>8}  {:<14} {:<20} {}",
            wt.display_branch(),
            age,
            format_ahead_behind(wt.ahead, wt.behind),
            if wt.is_orphaned() {
                "orphaned"
            } else {
                wt.cleanup_reason(threshold, now).unwrap_or("")
            },
            sessions.describe(wt),
            wt.path.display()
        );
    }

    Ok(())
}

/// Session records cross-checked against the backend's live list.
struct SessionIndex {
    records: Vec<SessionMetadata>,
    live: Option<HashSet<String>>,
}

impl SessionIndex {
    fn load(store: &SessionStore, backend: &dyn SessionBackend) -> Self {
        let records = store.list_all().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "session metadata unavailable");
            Vec::new()
        });
        let live = if backend.is_available() {
            backend
                .list_sessions()
                .map(|names| names.into_iter().collect())
                .map_err(|e| tracing::warn!(error = %e, "failed to list live sessions"))
                .ok()
        } else {
            None
        };
        Self { records, live }
    }

    /// Status of the sessions bound to `wt`, e.g. `● running`, or empty.
    fn describe(&self, wt: &Worktree) -> String {
        self.records
            .iter()
            .filter(|m| paths_equivalent(&m.worktree_path, &wt.path))
            .map(|m| match &self.live {
                Some(live) if !live.contains(&m.session_name) => "orphaned".to_string(),
                _ => format!("{} {}", m.status.icon(), m.status),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
