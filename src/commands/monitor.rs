//! Implementation of the `arbor monitor` command.

use super::display::{health_summary, print_health_result};
use super::load_workspace;
use crate::cli::MonitorArgs;
use crate::error::{ArborError, Result};
use crate::health::HealthChecker;
use crate::monitor::Monitor;
use chrono::Local;
use std::time::Duration;

pub fn cmd_monitor(args: MonitorArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let checker = HealthChecker::new(&ctx, &config);

    let interval = match args.interval {
        Some(0) => {
            return Err(ArborError::UserError(
                "--interval must be at least 1 second".to_string(),
            ));
        }
        Some(secs) => Duration::from_secs(secs),
        None => config.monitor_interval(),
    };
    let monitor = Monitor::new(interval);

    if args.once {
        monitor.run_once(|| report(&checker));
        return Ok(());
    }

    println!(
        "Monitoring worktree health every {}s (Ctrl-C to stop)",
        interval.as_secs()
    );
    monitor.run(
        |_| report(&checker),
        |tick| {
            println!(
                "[{}] check #{} skipped, previous check still running",
                timestamp(),
                tick
            )
        },
    );

    Ok(())
}

fn report(checker: &HealthChecker) {
    match checker.check_all() {
        Ok(results) => {
            println!("[{}] {}", timestamp(), health_summary(&results));
            for result in results.iter().filter(|r| !r.healthy()) {
                print_health_result(result);
            }
        }
        Err(e) => println!("[{}] health check failed: {}", timestamp(), e),
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
