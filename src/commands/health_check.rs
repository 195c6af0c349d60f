//! Implementation of the `arbor health-check` command.

use super::display::{health_summary, print_health_result};
use super::{current_dir, load_workspace};
use crate::cli::HealthCheckArgs;
use crate::error::Result;
use crate::git::Git;
use crate::health::{HealthCheckResult, HealthChecker};
use std::path::PathBuf;

pub fn cmd_health_check(args: HealthCheckArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let checker = HealthChecker::new(&ctx, &config);

    let results = collect_results(&checker, args.all, args.path)?;
    if results.is_empty() {
        println!("No secondary worktrees to check.");
        return Ok(());
    }

    for result in &results {
        print_health_result(result);
    }
    println!();
    println!("{}", health_summary(&results));

    Ok(())
}

/// Results for every secondary worktree, or for the one at `path`.
///
/// Without a path, the worktree containing the current directory is checked.
pub(crate) fn collect_results(
    checker: &HealthChecker,
    all: bool,
    path: Option<PathBuf>,
) -> Result<Vec<HealthCheckResult>> {
    if all {
        return checker.check_all();
    }

    let cwd = current_dir()?;
    let path = match path {
        Some(p) if p.is_absolute() => p,
        Some(p) => cwd.join(p),
        None => Git::default().repo_root(&cwd).unwrap_or(cwd),
    };
    Ok(vec![checker.check(&path)?])
}
