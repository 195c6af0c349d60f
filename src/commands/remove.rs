//! Implementation of the `arbor remove` command.

use super::{load_workspace, session_store, tmux_backend};
use crate::cli::RemoveArgs;
use crate::error::Result;
use crate::session::SessionBackend;
use crate::worktree::{Inventory, RemoveOptions, remove_worktree};

pub fn cmd_remove(args: RemoveArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let inventory = Inventory::new(&ctx, &config);
    let store = session_store(&ctx);
    let backend = tmux_backend(&config);
    let backend: Option<&dyn SessionBackend> = if backend.is_available() {
        Some(&backend)
    } else {
        None
    };

    let target = inventory.resolve_target(&args.target)?;
    let opts = RemoveOptions {
        force: args.force,
        delete_branch: args.delete_branch,
    };

    let report = remove_worktree(&ctx, &inventory, &target, opts, &store, backend)?;

    println!("Removed worktree {}", report.path.display());
    if report.branch_deleted {
        println!("  Deleted branch: {}", target.branch);
    }
    for name in &report.sessions_removed {
        println!("  Removed session: {}", name);
    }
    for warning in &report.warnings {
        println!("  Warning: {}", warning);
    }

    Ok(())
}
