//! Implementation of the `arbor session` subcommands.

use super::display::format_age;
use super::prompt::{Prompter, StdinPrompter};
use super::{load_workspace, session_store, tmux_backend};
use crate::cli::{SessionAttachArgs, SessionCreateArgs, SessionPruneArgs};
use crate::context::RepoContext;
use crate::error::{ArborError, Result};
use crate::session::{
    SessionBackend, SessionOutcome, SessionStore, StatusInference, attach_session, create_session,
    prune_orphans, reconcile, reconcile_sessions, refresh_statuses,
};
use crate::worktree::Inventory;
use chrono::Utc;

pub fn cmd_session_create(args: SessionCreateArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let inventory = Inventory::new(&ctx, &config);
    let store = session_store(&ctx);
    let backend = tmux_backend(&config);

    let worktree = inventory.get_for_branch(&args.branch)?.ok_or_else(|| {
        ArborError::NotFound(format!(
            "no worktree for branch '{}'. Create one with `arbor create {}`.",
            args.branch, args.branch
        ))
    })?;

    let created = create_session(
        &ctx,
        &config,
        &store,
        &backend,
        &worktree,
        args.command.as_deref(),
        args.install_deps || config.auto_install_dependencies,
    )?;

    let name = &created.metadata.session_name;
    if created.reused {
        println!("Session '{}' is already running", name);
    } else {
        println!("Started session '{}'", name);
        println!("  Worktree: {}", created.metadata.worktree_path.display());
        let deps = &created.metadata.dependencies;
        if deps.installed {
            println!(
                "  Dependencies: installed with {}",
                deps.package_manager.as_deref().unwrap_or("package manager")
            );
        }
    }
    for warning in &created.warnings {
        println!("  Warning: {}", warning);
    }

    if args.attach {
        attach_session(&ctx, &store, &backend, name)?;
    } else {
        println!("Attach with: arbor session attach {}", name);
    }

    Ok(())
}

pub fn cmd_session_attach(args: SessionAttachArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    attach_session(&ctx, &session_store(&ctx), &tmux_backend(&config), &args.name)
}

pub fn cmd_session_list() -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let store = session_store(&ctx);
    let backend = tmux_backend(&config);

    let scan = store.scan()?;
    for (path, error) in &scan.unreadable {
        println!("! unreadable record {}: {}", path.display(), error);
    }

    if !backend.is_available() {
        println!("tmux is not available; showing recorded sessions only.");
        for meta in &scan.records {
            println!("  {} {:<40} {}", meta.status.icon(), meta.session_name, meta.branch);
        }
        return Ok(());
    }

    let recon = reconcile_sessions(&config, &store, &backend)?;
    if recon.live.is_empty() && recon.orphaned.is_empty() && recon.untracked.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    let now = Utc::now();
    for meta in &recon.live {
        println!(
            "{} {:<40} {:<20} {:>5}  {}",
            meta.status.icon(),
            meta.session_name,
            meta.branch,
            format_age(now.signed_duration_since(meta.last_accessed_at)),
            meta.status
        );
    }
    for meta in &recon.orphaned {
        println!("✗ {:<40} {:<20} orphaned", meta.session_name, meta.branch);
    }
    for name in &recon.untracked {
        println!("? {:<40} untracked", name);
    }
    if !recon.orphaned.is_empty() {
        println!();
        println!(
            "{} orphaned record(s); remove with `arbor session prune`.",
            recon.orphaned.len()
        );
    }

    Ok(())
}

pub fn cmd_session_refresh() -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let backend = tmux_backend(&config);
    if !backend.is_available() {
        return Err(ArborError::SessionError(
            "no terminal multiplexer available (install tmux)".to_string(),
        ));
    }

    let inference = StatusInference::from_config(&config)?;
    let outcomes = refresh_statuses(&session_store(&ctx), &backend, &inference)?;
    if outcomes.is_empty() {
        println!("No recorded sessions.");
    }
    for SessionOutcome {
        session_name,
        result,
    } in &outcomes
    {
        match result {
            Ok(status) => println!("{} {} {}", status.icon(), session_name, status),
            Err(e) => println!("! {}: {}", session_name, e),
        }
    }

    Ok(())
}

pub fn cmd_session_prune(args: SessionPruneArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let backend = tmux_backend(&config);
    if !backend.is_available() {
        return Err(ArborError::SessionError(
            "cannot tell which sessions are orphaned without tmux".to_string(),
        ));
    }

    let pruned = run_session_prune(
        &ctx,
        &config.session_prefix,
        &session_store(&ctx),
        &backend,
        args.yes,
        &mut StdinPrompter,
    )?;

    match pruned {
        None => println!("No orphaned session records."),
        Some(outcomes) => {
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(()) => println!("Pruned {}", outcome.session_name),
                    Err(e) => println!("Kept {}: {}", outcome.session_name, e),
                }
            }
        }
    }

    Ok(())
}

/// Delete orphaned session records after confirmation.
///
/// Returns `None` when nothing is orphaned, and an empty list when the user
/// declines.
pub(crate) fn run_session_prune(
    ctx: &RepoContext,
    prefix: &str,
    store: &SessionStore,
    backend: &dyn SessionBackend,
    assume_yes: bool,
    prompter: &mut dyn Prompter,
) -> Result<Option<Vec<SessionOutcome<()>>>> {
    let live = backend.list_sessions()?;
    let recon = reconcile(store.list_all()?, &live, prefix);
    if recon.orphaned.is_empty() {
        return Ok(None);
    }

    for meta in &recon.orphaned {
        println!("  {} ({})", meta.session_name, meta.worktree_path.display());
    }
    let question = format!("Delete {} orphaned session record(s)?", recon.orphaned.len());
    if !(assume_yes || prompter.confirm(&question, false)?) {
        return Ok(Some(Vec::new()));
    }

    Ok(Some(prune_orphans(ctx, store, backend, &recon.orphaned)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::prompt::ScriptedPrompter;
    use crate::session::{BackendKind, SessionMetadata};
    use crate::test_support::{FakeBackend, create_test_repo, test_context};

    fn seeded(ctx: &RepoContext, names: &[&str]) -> SessionStore {
        let store = SessionStore::new(ctx.sessions_dir.clone());
        for name in names {
            let mut meta = SessionMetadata::new(*name, BackendKind::Tmux, &ctx.repo_root, "main");
            store.save(&mut meta).unwrap();
        }
        store
    }

    #[test]
    fn test_prune_removes_only_orphans_after_confirmation() {
        let temp_dir = create_test_repo();
        let ctx = test_context(temp_dir.path());
        let store = seeded(&ctx, &["arbor-r-live", "arbor-r-dead"]);
        let backend = FakeBackend::with_sessions(&["arbor-r-live"]);

        let mut prompter = ScriptedPrompter::new(&[true]);
        let outcomes = run_session_prune(&ctx, "arbor", &store, &backend, false, &mut prompter)
            .unwrap()
            .unwrap();

        assert_eq!(prompter.asked.len(), 1);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].session_name, "arbor-r-dead");
        assert!(outcomes[0].result.is_ok());
        assert!(store.exists("arbor-r-live"));
        assert!(!store.exists("arbor-r-dead"));
    }

    #[test]
    fn test_prune_declined_keeps_records() {
        let temp_dir = create_test_repo();
        let ctx = test_context(temp_dir.path());
        let store = seeded(&ctx, &["arbor-r-dead"]);
        let backend = FakeBackend::default();

        let mut prompter = ScriptedPrompter::new(&[false]);
        let outcomes = run_session_prune(&ctx, "arbor", &store, &backend, false, &mut prompter)
            .unwrap()
            .unwrap();

        assert!(outcomes.is_empty());
        assert!(store.exists("arbor-r-dead"));
    }

    #[test]
    fn test_prune_with_nothing_orphaned_asks_nothing() {
        let temp_dir = create_test_repo();
        let ctx = test_context(temp_dir.path());
        let store = seeded(&ctx, &["arbor-r-live"]);
        let backend = FakeBackend::with_sessions(&["arbor-r-live"]);

        let mut prompter = ScriptedPrompter::new(&[]);
        let result =
            run_session_prune(&ctx, "arbor", &store, &backend, false, &mut prompter).unwrap();

        assert!(result.is_none());
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_prune_with_yes_skips_prompt() {
        let temp_dir = create_test_repo();
        let ctx = test_context(temp_dir.path());
        let store = seeded(&ctx, &["arbor-r-a", "arbor-r-b"]);
        let backend = FakeBackend::default();

        let mut prompter = ScriptedPrompter::new(&[]);
        let outcomes = run_session_prune(&ctx, "arbor", &store, &backend, true, &mut prompter)
            .unwrap()
            .unwrap();

        assert!(prompter.asked.is_empty());
        assert_eq!(outcomes.len(), 2);
        assert!(store.list_all().unwrap().is_empty());
    }
}
