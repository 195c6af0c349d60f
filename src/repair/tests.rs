//! Repair planning and application against real repositories.

use super::*;
use crate::config::Config;
use crate::context::RepoContext;
use crate::health::{HealthCheckResult, HealthChecker, Issue, IssueSeverity, category};
use crate::test_support::{FakeProbe, add_worktree, create_test_repo, git, test_context};
use std::fs;
use std::path::PathBuf;

fn engine(ctx: &RepoContext, probe: FakeProbe) -> RepairEngine {
    RepairEngine::with_probe(ctx, &Config::default(), Box::new(probe))
}

fn checker(ctx: &RepoContext) -> HealthChecker {
    HealthChecker::with_probe(ctx, &Config::default(), Box::new(FakeProbe::default()))
}

fn lock_issue(path: &str) -> Issue {
    Issue::new(IssueSeverity::Warning, category::LOCK, "stale").with_repair(
        RepairKind::RemoveStaleLock {
            path: PathBuf::from(path),
        },
    )
}

#[test]
fn test_plan_deduplicates_actions() {
    let mut a = HealthCheckResult::new("/repo/.worktrees/a", Some("a".to_string()));
    a.issues.push(lock_issue("/repo/.git/refs/heads/a.lock"));
    a.issues.push(
        Issue::new(IssueSeverity::Critical, category::MISSING_DIRECTORY, "gone")
            .with_repair(RepairKind::PruneRegistrations),
    );
    a.issues
        .push(Issue::new(IssueSeverity::Warning, category::DETACHED_HEAD, "detached"));

    let mut b = HealthCheckResult::new("/repo/.worktrees/b", Some("b".to_string()));
    b.issues.push(lock_issue("/repo/.git/refs/heads/a.lock"));
    b.issues.push(
        Issue::new(IssueSeverity::Critical, category::MISSING_DIRECTORY, "gone")
            .with_repair(RepairKind::PruneRegistrations),
    );

    let actions = plan_actions(&[a, b]);
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].target, Some(PathBuf::from("/repo/.worktrees/a")));
    assert_eq!(actions[1].kind, RepairKind::PruneRegistrations);
    assert_eq!(actions[1].target, None);
}

#[test]
fn test_partition_by_safety() {
    let actions = vec![
        RepairAction::new(RepairKind::PruneRegistrations, None),
        RepairAction::new(
            RepairKind::RemoveOrphanDirectory {
                path: PathBuf::from("/repo/.worktrees/ghost"),
            },
            Some(PathBuf::from("/repo/.worktrees/ghost")),
        ),
        RepairAction::new(
            RepairKind::RemoveStaleLock {
                path: PathBuf::from("/repo/.git/index.lock"),
            },
            None,
        ),
    ];

    let (safe, unsafe_actions) = partition(actions);
    assert_eq!(safe.len(), 2);
    assert!(safe.iter().all(|a| a.safe));
    assert_eq!(unsafe_actions.len(), 1);
    assert!(!unsafe_actions[0].safe);
}

#[test]
fn test_stale_lock_scenario() {
    let temp_dir = create_test_repo();
    add_worktree(temp_dir.path(), "feature");
    let ctx = test_context(temp_dir.path());
    let lock = ctx.worktree_admin_root().join("feature").join("index.lock");
    fs::write(&lock, "55555").unwrap();

    let results = checker(&ctx).check_all().unwrap();
    let actions = plan_actions(&results);
    assert_eq!(actions.len(), 1);
    assert!(actions[0].safe);
    assert!(matches!(actions[0].kind, RepairKind::RemoveStaleLock { .. }));

    let outcomes = engine(&ctx, FakeProbe::default()).apply(&actions);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success, "{:?}", outcomes[0]);
    assert!(!lock.exists());
}

#[test]
fn test_apply_refuses_lock_that_came_back_to_life() {
    let temp_dir = create_test_repo();
    add_worktree(temp_dir.path(), "feature");
    let ctx = test_context(temp_dir.path());
    let lock = ctx.worktree_admin_root().join("feature").join("index.lock");
    fs::write(&lock, "55555").unwrap();

    let actions = plan_actions(&checker(&ctx).check_all().unwrap());
    let outcomes = engine(&ctx, FakeProbe::with(&[(55555, Some(true))])).apply(&actions);

    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.is_some());
    assert!(lock.exists());
}

#[test]
fn test_repository_wide_stale_locks_are_repaired() {
    let temp_dir = create_test_repo();
    add_worktree(temp_dir.path(), "feature");
    let ctx = test_context(temp_dir.path());
    let packed = ctx.common_dir.join("packed-refs.lock");
    let config = ctx.common_dir.join("config.lock");
    fs::write(&packed, "55555").unwrap();
    fs::write(&config, "55555").unwrap();

    let results = checker(&ctx).check_all().unwrap();
    assert_eq!(results.len(), 2);
    let repository = results.iter().find(|r| r.repository).unwrap();
    assert_eq!(repository.repairable_count(), 2);
    assert!(
        repository
            .issues
            .iter()
            .all(|i| i.category == category::LOCK)
    );

    let actions = plan_actions(&results);
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|a| a.target.is_none() && a.safe));

    let outcomes = engine(&ctx, FakeProbe::default()).apply(&actions);
    assert!(outcomes.iter().all(|o| o.success), "{:?}", outcomes);
    assert!(!packed.exists());
    assert!(!config.exists());

    assert!(
        checker(&ctx)
            .check_all()
            .unwrap()
            .iter()
            .all(|r| !r.repository)
    );
}

#[test]
fn test_safe_repairs_are_idempotent() {
    let temp_dir = create_test_repo();
    let path = temp_dir.path();
    let ctx = test_context(path);

    add_worktree(path, "locked-up");
    fs::write(
        ctx.worktree_admin_root().join("locked-up").join("index.lock"),
        "55555",
    )
    .unwrap();

    let gone = add_worktree(path, "gone");
    fs::remove_dir_all(&gone).unwrap();

    let doomed = add_worktree(path, "doomed");
    git(&doomed, &["checkout", "--detach"]);
    git(path, &["branch", "-D", "doomed"]);
    git(&doomed, &["symbolic-ref", "HEAD", "refs/heads/doomed"]);

    let before = checker(&ctx).check_all().unwrap();
    let (safe, unsafe_actions) = partition(plan_actions(&before));
    assert_eq!(safe.len(), 3);
    assert!(unsafe_actions.is_empty());

    let engine = engine(&ctx, FakeProbe::default());
    let first = engine.apply(&safe);
    assert!(first.iter().all(|r| r.success), "{:?}", first);

    let second = engine.apply(&safe);
    assert!(second.iter().all(|r| r.success), "{:?}", second);

    let after = checker(&ctx).check_all().unwrap();
    assert!(after.iter().all(|r| r.healthy()), "{:?}", after);
    assert_eq!(after.len(), 2);
}

#[test]
fn test_apply_continues_after_failure_and_keeps_order() {
    let temp_dir = create_test_repo();
    let ctx = test_context(temp_dir.path());

    let actions = vec![
        RepairAction::new(
            RepairKind::RemoveStaleLock {
                path: ctx.common_dir.join("index.lock"),
            },
            None,
        ),
        RepairAction::new(
            RepairKind::RecreateBranchRef {
                branch: "ghost".to_string(),
                commit: "deadbeef".repeat(5),
            },
            None,
        ),
        RepairAction::new(RepairKind::PruneRegistrations, None),
    ];

    let results = engine(&ctx, FakeProbe::default()).apply(&actions);
    let success: Vec<bool> = results.iter().map(|r| r.success).collect();
    assert_eq!(success, vec![true, false, true]);
    assert!(results[1].error.is_some());
}

#[test]
fn test_recreate_branch_ref_is_noop_when_present() {
    let temp_dir = create_test_repo();
    let ctx = test_context(temp_dir.path());
    let head = git(temp_dir.path(), &["rev-parse", "HEAD"]);

    let action = RepairAction::new(
        RepairKind::RecreateBranchRef {
            branch: "main".to_string(),
            commit: head,
        },
        None,
    );
    let results = engine(&ctx, FakeProbe::default()).apply(&[action]);
    assert!(results[0].success);
    assert!(results[0].message.contains("already exists"));
}

#[test]
fn test_remove_orphan_directory() {
    let temp_dir = create_test_repo();
    let ctx = test_context(temp_dir.path());
    let ghost = ctx.worktrees_dir.join("ghost");
    fs::create_dir_all(&ghost).unwrap();
    fs::write(ghost.join(".git"), "gitdir: /nowhere\n").unwrap();

    let action = RepairAction::new(
        RepairKind::RemoveOrphanDirectory { path: ghost.clone() },
        Some(ghost.clone()),
    );
    assert!(!action.safe);

    let engine = engine(&ctx, FakeProbe::default());
    assert!(engine.apply(std::slice::from_ref(&action))[0].success);
    assert!(!ghost.exists());
    // Second run: nothing left to delete.
    assert!(engine.apply(&[action])[0].success);
}

#[test]
fn test_remove_orphan_directory_refuses_registered_or_outside_paths() {
    let temp_dir = create_test_repo();
    let wt = add_worktree(temp_dir.path(), "real");
    let ctx = test_context(temp_dir.path());

    let actions = vec![
        RepairAction::new(RepairKind::RemoveOrphanDirectory { path: wt.clone() }, None),
        RepairAction::new(
            RepairKind::RemoveOrphanDirectory {
                path: temp_dir.path().to_path_buf(),
            },
            None,
        ),
    ];
    let results = engine(&ctx, FakeProbe::default()).apply(&actions);
    assert!(results.iter().all(|r| !r.success));
    assert!(wt.exists());
}

#[test]
fn test_repairs_are_logged() {
    let temp_dir = create_test_repo();
    let ctx = test_context(temp_dir.path());

    engine(&ctx, FakeProbe::default())
        .apply(&[RepairAction::new(RepairKind::PruneRegistrations, None)]);

    let log = fs::read_to_string(ctx.events_file()).unwrap();
    assert!(log.contains("\"action\":\"repair\""));
    assert!(log.contains("prune_registrations"));
}
