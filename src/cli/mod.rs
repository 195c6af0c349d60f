//! CLI argument parsing for arbor.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Arbor: manage git worktrees, their background sessions, and their health.
///
/// Worktrees live under `.worktrees/` in the main checkout. Each can carry a
/// tmux session whose metadata is kept in the repository's git directory.
#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Show diagnostic logging on stderr (same as ARBOR_LOG=debug).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for arbor.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List secondary worktrees.
    ///
    /// Shows branch, age, ahead/behind counts, cleanup reason and session status.
    List(ListArgs),

    /// Create a worktree for a branch.
    ///
    /// Reuses the existing worktree when the branch already has one.
    Create(CreateArgs),

    /// Remove a worktree and the sessions bound to it.
    Remove(RemoveArgs),

    /// Diagnose worktree health.
    ///
    /// Reports locks, detached HEADs, missing branch refs and directory
    /// mismatches. Exits 0 even when issues are found.
    HealthCheck(HealthCheckArgs),

    /// Repair issues found by the health check.
    ///
    /// Safe repairs are applied directly; unsafe ones need confirmation or --yes.
    Repair(RepairArgs),

    /// Re-run the health check at a fixed interval.
    Monitor(MonitorArgs),

    /// Remove orphaned, merged and stale worktrees.
    Cleanup(CleanupArgs),

    /// List git lock files and whether their owner is still running.
    Locks,

    /// Background session commands.
    Session(SessionCommand),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only show worktrees merged into the default branch.
    #[arg(long)]
    pub merged: bool,
}

#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Branch to check out.
    pub branch: String,

    /// Check out an existing branch instead of creating one.
    #[arg(long, conflicts_with = "base")]
    pub existing: bool,

    /// Start point for the new branch (defaults to HEAD).
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Branch name or worktree path.
    pub target: String,

    /// Remove even with uncommitted changes or a lock.
    #[arg(long)]
    pub force: bool,

    /// Also delete the branch.
    #[arg(long)]
    pub delete_branch: bool,
}

#[derive(Parser, Debug)]
pub struct HealthCheckArgs {
    /// Check every secondary worktree.
    #[arg(long, conflicts_with = "path")]
    pub all: bool,

    /// Worktree to check (defaults to the current directory).
    pub path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RepairArgs {
    /// Repair every secondary worktree.
    #[arg(long, conflicts_with = "path")]
    pub all: bool,

    /// Apply unsafe repairs without asking.
    #[arg(long)]
    pub yes: bool,

    /// Worktree to repair (defaults to the current directory).
    pub path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct MonitorArgs {
    /// Seconds between checks (defaults to `monitor_interval_secs`).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Run a single check and exit.
    #[arg(long)]
    pub once: bool,
}

#[derive(Parser, Debug)]
pub struct CleanupArgs {
    /// Remove merged and stale worktrees without asking.
    #[arg(long)]
    pub yes: bool,

    /// Only remove orphaned worktrees.
    #[arg(long)]
    pub orphans_only: bool,

    /// Delete branches of removed merged/stale worktrees without asking.
    #[arg(long)]
    pub delete_branches: bool,
}

#[derive(Parser, Debug)]
pub struct SessionCommand {
    #[command(subcommand)]
    pub action: SessionAction,
}

#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// Start a session in a branch's worktree.
    Create(SessionCreateArgs),

    /// Attach to a running session.
    Attach(SessionAttachArgs),

    /// List recorded and live sessions.
    List,

    /// Re-infer and store the status of every recorded session.
    Refresh,

    /// Delete metadata of sessions that are no longer running.
    Prune(SessionPruneArgs),
}

#[derive(Parser, Debug)]
pub struct SessionCreateArgs {
    /// Branch whose worktree hosts the session.
    pub branch: String,

    /// Command to run (defaults to `session_command`, then a login shell).
    #[arg(long)]
    pub command: Option<String>,

    /// Install project dependencies first.
    #[arg(long)]
    pub install_deps: bool,

    /// Attach after creating.
    #[arg(long)]
    pub attach: bool,
}

#[derive(Parser, Debug)]
pub struct SessionAttachArgs {
    /// Session name.
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct SessionPruneArgs {
    /// Prune without asking.
    #[arg(long)]
    pub yes: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_list_merged() {
        let cli = Cli::try_parse_from(["arbor", "list", "--merged"]).unwrap();
        match cli.command {
            Command::List(args) => assert!(args.merged),
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn parse_create_with_base() {
        let cli = Cli::try_parse_from(["arbor", "create", "feature/x", "--base", "main"]).unwrap();
        match cli.command {
            Command::Create(args) => {
                assert_eq!(args.branch, "feature/x");
                assert_eq!(args.base.as_deref(), Some("main"));
                assert!(!args.existing);
            }
            _ => panic!("Expected Create command"),
        }
    }

    #[test]
    fn create_existing_conflicts_with_base() {
        let result =
            Cli::try_parse_from(["arbor", "create", "x", "--existing", "--base", "main"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_health_check_all() {
        let cli = Cli::try_parse_from(["arbor", "health-check", "--all"]).unwrap();
        match cli.command {
            Command::HealthCheck(args) => {
                assert!(args.all);
                assert!(args.path.is_none());
            }
            _ => panic!("Expected HealthCheck command"),
        }
    }

    #[test]
    fn parse_repair_flags() {
        let cli = Cli::try_parse_from(["arbor", "repair", "--all", "--yes"]).unwrap();
        match cli.command {
            Command::Repair(args) => {
                assert!(args.all);
                assert!(args.yes);
            }
            _ => panic!("Expected Repair command"),
        }
    }

    #[test]
    fn parse_monitor_interval() {
        let cli = Cli::try_parse_from(["arbor", "monitor", "--interval", "5"]).unwrap();
        match cli.command {
            Command::Monitor(args) => {
                assert_eq!(args.interval, Some(5));
                assert!(!args.once);
            }
            _ => panic!("Expected Monitor command"),
        }
    }

    #[test]
    fn parse_cleanup_flags() {
        let cli = Cli::try_parse_from([
            "arbor",
            "cleanup",
            "--orphans-only",
            "--delete-branches",
        ])
        .unwrap();
        match cli.command {
            Command::Cleanup(args) => {
                assert!(args.orphans_only);
                assert!(args.delete_branches);
                assert!(!args.yes);
            }
            _ => panic!("Expected Cleanup command"),
        }
    }

    #[test]
    fn parse_session_create() {
        let cli = Cli::try_parse_from([
            "arbor",
            "session",
            "create",
            "feature",
            "--command",
            "claude --resume",
            "--install-deps",
        ])
        .unwrap();
        match cli.command {
            Command::Session(SessionCommand {
                action: SessionAction::Create(args),
            }) => {
                assert_eq!(args.branch, "feature");
                assert_eq!(args.command.as_deref(), Some("claude --resume"));
                assert!(args.install_deps);
                assert!(!args.attach);
            }
            _ => panic!("Expected Session Create command"),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["arbor", "locks", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Locks));
    }
}
