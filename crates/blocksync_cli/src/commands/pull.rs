//! Pull and pull-all command implementations.

use super::print_report;
use crate::context::Context;
use blocksync_engine::{Action, BatchReport};

/// Runs the pull command for one page.
pub fn run(
    ctx: &Context,
    target: &str,
    force: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, pull) = ctx.managers()?;
    if dry_run {
        println!("(dry run - no changes will be made)");
    }

    let outcome = pull.pull_document(target, force, dry_run)?;
    if let Some(backup) = &outcome.backup {
        println!("Backed up previous version to {:?}", backup);
    }
    match outcome.action {
        Action::Conflict => println!("Both sides changed; rerun with --force to overwrite"),
        Action::Created | Action::Updated => println!("✓ Pulled {}", outcome.file.as_deref().unwrap_or(target)),
        _ => {}
    }

    let mut report = BatchReport::new();
    report.push(outcome);
    print_report(&report, dry_run)
}

/// Runs the pull-all command.
pub fn run_all(ctx: &Context, force: bool, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (_, pull) = ctx.managers()?;

    println!("Pulling all documents into {:?}", ctx.config().docs_dir);
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    let report = pull.pull_all(force, dry_run)?;
    print_report(&report, dry_run)
}
