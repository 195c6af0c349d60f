//! Implementation of the `arbor create` command.

use super::load_workspace;
use crate::cli::CreateArgs;
use crate::error::Result;
use crate::worktree::{CreateMode, Inventory, create_worktree};

pub fn cmd_create(args: CreateArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let inventory = Inventory::new(&ctx, &config);

    let mode = if args.existing {
        CreateMode::ExistingBranch
    } else {
        CreateMode::NewBranch { base: args.base }
    };

    let created = create_worktree(&ctx, &inventory, &args.branch, &mode)?;
    if created.reused {
        println!(
            "Branch '{}' already has a worktree: {}",
            created.branch,
            created.path.display()
        );
    } else {
        println!("Created worktree for '{}'", created.branch);
        println!("  Path: {}", created.path.display());
    }

    Ok(())
}
