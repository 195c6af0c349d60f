//! Implementation of the `arbor repair` command.

use super::display::print_health_result;
use super::health_check::collect_results;
use super::load_workspace;
use super::prompt::{Prompter, StdinPrompter};
use crate::cli::RepairArgs;
use crate::error::Result;
use crate::health::{HealthCheckResult, HealthChecker, category};
use crate::repair::{RepairAction, RepairEngine, RepairKind, RepairResult, partition, plan_actions};

const PID_REUSE_NOTE: &str = "Note: a lock is kept while its recorded pid belongs to a running process. \
If the original owner exited and the pid was reused, remove the lock by hand once nothing is using the repository.";

/// What a repair run did.
#[derive(Debug, Default)]
pub(crate) struct RepairRun {
    pub applied: Vec<(RepairAction, RepairResult)>,
    /// Unsafe actions the user declined.
    pub declined: Vec<RepairAction>,
    /// Locks left in place because their owner looked alive.
    pub active_locks: usize,
}

impl RepairRun {
    pub fn failures(&self) -> usize {
        self.applied.iter().filter(|(_, r)| !r.success).count()
    }
}

pub fn cmd_repair(args: RepairArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let checker = HealthChecker::new(&ctx, &config);
    let engine = RepairEngine::new(&ctx, &config);

    let results = collect_results(&checker, args.all, args.path)?;
    for result in results.iter().filter(|r| !r.healthy()) {
        print_health_result(result);
    }

    let run = run_repair(&engine, &results, args.yes, &mut StdinPrompter)?;

    if run.applied.is_empty() && run.declined.is_empty() {
        println!("Nothing to repair.");
    }
    for (action, result) in &run.applied {
        match &result.error {
            None => println!("✓ {}", result.message),
            Some(error) => println!("✗ {}: {}", action.description, error),
        }
    }
    for action in &run.declined {
        println!("- Skipped: {}", action.description);
    }
    if !run.applied.is_empty() {
        println!();
        println!(
            "{} repair(s) applied, {} failed, {} skipped",
            run.applied.len() - run.failures(),
            run.failures(),
            run.declined.len()
        );
    }
    if run.active_locks > 0 {
        println!();
        println!("{}", PID_REUSE_NOTE);
    }

    Ok(())
}

/// Plan repairs for `results` and apply them.
///
/// Safe actions run directly. Unsafe ones run only when `assume_yes` is set or
/// the user confirms each one.
pub(crate) fn run_repair(
    engine: &RepairEngine,
    results: &[HealthCheckResult],
    assume_yes: bool,
    prompter: &mut dyn Prompter,
) -> Result<RepairRun> {
    let (safe, unsafe_actions) = partition(plan_actions(results));

    let mut approved = safe;
    let mut run = RepairRun::default();
    for action in unsafe_actions {
        let question = format!("{}?", action.description);
        if assume_yes || prompter.confirm(&question, false)? {
            approved.push(action);
        } else {
            run.declined.push(action);
        }
    }

    let outcomes = engine.apply(&approved);
    run.active_locks = count_active_locks(results)
        + approved
            .iter()
            .zip(&outcomes)
            .filter(|(a, r)| !r.success && matches!(a.kind, RepairKind::RemoveStaleLock { .. }))
            .count();
    run.applied = approved.into_iter().zip(outcomes).collect();

    Ok(run)
}

fn count_active_locks(results: &[HealthCheckResult]) -> usize {
    results
        .iter()
        .flat_map(|r| &r.issues)
        .filter(|i| i.category == category::LOCK && !i.repairable())
        .count()
}
