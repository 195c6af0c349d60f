//! Arbor: git worktree lifecycle, health and session management.
//!
//! This is the main entry point for the `arbor` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

pub mod cleanup;
mod cli;
mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exec;
pub mod exit_codes;
pub mod fs;
pub mod git;
pub mod health;
pub mod locks;
pub mod logging;
pub mod monitor;
pub mod repair;
pub mod session;
pub mod worktree;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
