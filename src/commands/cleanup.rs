//! Implementation of the `arbor cleanup` command.

use super::display::format_age;
use super::prompt::{Prompter, StdinPrompter};
use super::{load_workspace, session_store, tmux_backend};
use crate::cleanup::{CleanupBuckets, classify};
use crate::cli::CleanupArgs;
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::events::{self, Event, EventAction};
use crate::session::{SessionBackend, SessionStore};
use crate::worktree::{Inventory, RemovalReport, RemoveOptions, Worktree, remove_worktree};
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CleanupOptions {
    /// Remove merged and stale worktrees without asking.
    pub assume_yes: bool,
    pub orphans_only: bool,
    /// Delete branches of removed merged and stale worktrees without asking.
    pub delete_branches: bool,
}

/// Collaborators a cleanup run removes worktrees through.
pub(crate) struct Remover<'a> {
    pub ctx: &'a RepoContext,
    pub inventory: &'a Inventory,
    pub store: &'a SessionStore,
    pub backend: Option<&'a dyn SessionBackend>,
}

#[derive(Debug, Default)]
pub(crate) struct CleanupReport {
    pub removed: Vec<RemovalReport>,
    pub declined: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, ArborError)>,
}

pub fn cmd_cleanup(args: CleanupArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let inventory = Inventory::new(&ctx, &config);
    let store = session_store(&ctx);
    let tmux = tmux_backend(&config);
    let backend: Option<&dyn SessionBackend> = if tmux.is_available() {
        Some(&tmux)
    } else {
        None
    };

    let worktrees = inventory.list_with_merge_status()?;
    let buckets = classify(&worktrees, config.stale_threshold(), Utc::now());
    if buckets.is_empty() {
        println!("Nothing to clean up.");
        return Ok(());
    }

    let remover = Remover {
        ctx: &ctx,
        inventory: &inventory,
        store: &store,
        backend,
    };
    let opts = CleanupOptions {
        assume_yes: args.yes,
        orphans_only: args.orphans_only,
        delete_branches: args.delete_branches,
    };
    let report = run_cleanup(&remover, &buckets, opts, &mut StdinPrompter)?;

    for removed in &report.removed {
        print!("Removed {}", removed.path.display());
        if removed.branch_deleted {
            print!(" (branch deleted)");
        }
        println!();
        for warning in &removed.warnings {
            println!("  Warning: {}", warning);
        }
    }
    for (path, error) in &report.failed {
        println!("Failed to remove {}: {}", path.display(), error);
    }
    println!();
    println!(
        "{} removed, {} kept, {} failed",
        report.removed.len(),
        report.declined.len(),
        report.failed.len()
    );

    Ok(())
}

/// Remove the classified worktrees.
///
/// Orphans go without asking. Merged worktrees are confirmed as one batch;
/// stale ones one at a time, each with its own branch question. A failed
/// removal is reported and the run continues.
pub(crate) fn run_cleanup(
    remover: &Remover<'_>,
    buckets: &CleanupBuckets,
    opts: CleanupOptions,
    prompter: &mut dyn Prompter,
) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    for wt in &buckets.orphaned {
        remover.remove(wt, false, &mut report);
    }

    if !opts.orphans_only {
        if !buckets.merged.is_empty() {
            println!("Merged worktrees:");
            for wt in &buckets.merged {
                println!("  {} ({})", wt.display_branch(), wt.path.display());
            }
            let question = format!("Remove {} merged worktree(s)?", buckets.merged.len());
            if opts.assume_yes || prompter.confirm(&question, false)? {
                let delete_branches = opts.delete_branches
                    || (!opts.assume_yes && prompter.confirm("Also delete their branches?", false)?);
                for wt in &buckets.merged {
                    remover.remove(wt, delete_branches, &mut report);
                }
            } else {
                report.declined.extend(buckets.merged.iter().map(|w| w.path.clone()));
            }
        }

        for wt in &buckets.stale {
            let question = format!(
                "Remove stale worktree '{}' (created {} ago)?",
                wt.display_branch(),
                format_age(wt.age())
            );
            if !(opts.assume_yes || prompter.confirm(&question, false)?) {
                report.declined.push(wt.path.clone());
                continue;
            }
            let delete_branch = !wt.branch.is_empty()
                && (opts.delete_branches
                    || (!opts.assume_yes
                        && prompter
                            .confirm(&format!("Also delete branch '{}'?", wt.branch), false)?));
            remover.remove(wt, delete_branch, &mut report);
        }
    }

    events::record(
        remover.ctx,
        Event::new(EventAction::Cleanup).with_details(json!({
            "removed": report.removed.iter().map(|r| r.path.display().to_string()).collect::<Vec<_>>(),
            "declined": report.declined.len(),
            "failed": report.failed.len(),
        })),
    );

    Ok(report)
}

impl Remover<'_> {
    fn remove(&self, wt: &Worktree, delete_branch: bool, report: &mut CleanupReport) {
        let opts = RemoveOptions {
            force: false,
            delete_branch,
        };
        match remove_worktree(self.ctx, self.inventory, wt, opts, self.store, self.backend) {
            Ok(removed) => report.removed.push(removed),
            Err(e) => {
                tracing::warn!(path = %wt.path.display(), error = %e, "cleanup removal failed");
                report.failed.push((wt.path.clone(), e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::prompt::ScriptedPrompter;
    use crate::config::Config;
    use crate::test_support::{FakeBackend, add_worktree, create_test_repo, git, test_context};
    use chrono::Duration;
    use std::fs;

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        ctx: RepoContext,
        inventory: Inventory,
        store: SessionStore,
        backend: FakeBackend,
    }

    impl Fixture {
        fn new(setup: impl FnOnce(&std::path::Path)) -> Self {
            let temp_dir = create_test_repo();
            setup(temp_dir.path());
            let ctx = test_context(temp_dir.path());
            let inventory = Inventory::new(&ctx, &Config::default());
            let store = SessionStore::new(ctx.sessions_dir.clone());
            Self {
                _temp_dir: temp_dir,
                ctx,
                inventory,
                store,
                backend: FakeBackend::default(),
            }
        }

        fn remover(&self) -> Remover<'_> {
            Remover {
                ctx: &self.ctx,
                inventory: &self.inventory,
                store: &self.store,
                backend: Some(&self.backend),
            }
        }

        fn buckets(&self) -> CleanupBuckets {
            let worktrees = self.inventory.list_with_merge_status().unwrap();
            classify(&worktrees, Duration::days(14), Utc::now())
        }

        fn branches(&self) -> String {
            git(&self.ctx.repo_root, &["branch", "--list"])
        }
    }

    #[test]
    fn test_orphans_are_removed_without_prompting() {
        let fixture = Fixture::new(|repo| {
            let gone = add_worktree(repo, "gone");
            fs::remove_dir_all(gone).unwrap();
        });
        let buckets = fixture.buckets();
        assert_eq!(buckets.orphaned.len(), 1);

        let mut prompter = ScriptedPrompter::new(&[]);
        let report = run_cleanup(
            &fixture.remover(),
            &buckets,
            CleanupOptions::default(),
            &mut prompter,
        )
        .unwrap();

        assert!(prompter.asked.is_empty());
        assert_eq!(report.removed.len(), 1);
        assert!(fixture.inventory.get_for_branch("gone").unwrap().is_none());
    }

    #[test]
    fn test_merged_bulk_confirmation_declined_keeps_everything() {
        let fixture = Fixture::new(|repo| {
            add_worktree(repo, "done-a");
            add_worktree(repo, "done-b");
        });
        let buckets = fixture.buckets();
        assert_eq!(buckets.merged.len(), 2);

        let mut prompter = ScriptedPrompter::new(&[false]);
        let report = run_cleanup(
            &fixture.remover(),
            &buckets,
            CleanupOptions::default(),
            &mut prompter,
        )
        .unwrap();

        assert_eq!(prompter.asked, vec!["Remove 2 merged worktree(s)?"]);
        assert!(report.removed.is_empty());
        assert_eq!(report.declined.len(), 2);
        assert!(buckets.merged.iter().all(|w| w.path.exists()));
    }

    #[test]
    fn test_merged_bulk_removal_with_branch_deletion() {
        let fixture = Fixture::new(|repo| {
            add_worktree(repo, "done");
        });
        let buckets = fixture.buckets();

        let mut prompter = ScriptedPrompter::new(&[true, true]);
        let report = run_cleanup(
            &fixture.remover(),
            &buckets,
            CleanupOptions::default(),
            &mut prompter,
        )
        .unwrap();

        assert_eq!(prompter.asked.len(), 2);
        assert_eq!(report.removed.len(), 1);
        assert!(report.removed[0].branch_deleted);
        assert!(!fixture.branches().contains("done"));
    }

    #[test]
    fn test_stale_worktrees_are_confirmed_one_at_a_time() {
        let fixture = Fixture::new(|repo| {
            add_worktree(repo, "old-a");
            add_worktree(repo, "old-b");
        });
        let mut worktrees = fixture.inventory.list_excluding_main().unwrap();
        worktrees.sort_by(|a, b| a.path.cmp(&b.path));
        let buckets = CleanupBuckets {
            stale: worktrees,
            ..CleanupBuckets::default()
        };

        // remove old-a, keep its branch; keep old-b
        let mut prompter = ScriptedPrompter::new(&[true, false, false]);
        let report = run_cleanup(
            &fixture.remover(),
            &buckets,
            CleanupOptions::default(),
            &mut prompter,
        )
        .unwrap();

        assert_eq!(prompter.asked.len(), 3);
        assert!(prompter.asked[0].starts_with("Remove stale worktree 'old-a'"));
        assert_eq!(prompter.asked[1], "Also delete branch 'old-a'?");
        assert!(prompter.asked[2].starts_with("Remove stale worktree 'old-b'"));

        assert_eq!(report.removed.len(), 1);
        assert!(!report.removed[0].branch_deleted);
        assert_eq!(report.declined, vec![buckets.stale[1].path.clone()]);
        assert!(fixture.branches().contains("old-a"));
    }

    #[test]
    fn test_orphans_only_skips_other_buckets() {
        let fixture = Fixture::new(|repo| {
            add_worktree(repo, "done");
            let gone = add_worktree(repo, "gone");
            fs::remove_dir_all(gone).unwrap();
        });
        let buckets = fixture.buckets();
        assert_eq!(buckets.len(), 2);

        let mut prompter = ScriptedPrompter::new(&[]);
        let opts = CleanupOptions {
            assume_yes: true,
            orphans_only: true,
            delete_branches: false,
        };
        let report = run_cleanup(&fixture.remover(), &buckets, opts, &mut prompter).unwrap();

        assert!(prompter.asked.is_empty());
        assert_eq!(report.removed.len(), 1);
        assert!(fixture.inventory.get_for_branch("done").unwrap().is_some());
    }

    #[test]
    fn test_failed_removal_does_not_stop_the_run() {
        let fixture = Fixture::new(|repo| {
            let dirty = add_worktree(repo, "dirty");
            fs::write(dirty.join("scratch.txt"), "wip").unwrap();
            add_worktree(repo, "clean");
        });
        let buckets = fixture.buckets();
        assert_eq!(buckets.merged.len(), 2);

        let opts = CleanupOptions {
            assume_yes: true,
            ..CleanupOptions::default()
        };
        let report =
            run_cleanup(&fixture.remover(), &buckets, opts, &mut ScriptedPrompter::new(&[])).unwrap();

        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("dirty"));
    }

    #[test]
    fn test_cleanup_event_is_recorded() {
        let fixture = Fixture::new(|repo| {
            add_worktree(repo, "done");
        });
        let opts = CleanupOptions {
            assume_yes: true,
            ..CleanupOptions::default()
        };
        run_cleanup(
            &fixture.remover(),
            &fixture.buckets(),
            opts,
            &mut ScriptedPrompter::new(&[]),
        )
        .unwrap();

        let log = fs::read_to_string(fixture.ctx.events_file()).unwrap();
        assert!(log.lines().any(|l| l.contains("\"action\":\"cleanup\"")));
    }
}
