//! Push command implementation.

use super::print_report;
use crate::context::Context;
use blocksync_engine::PushStatus;
use std::path::PathBuf;

/// Runs the push command.
pub fn run(ctx: &Context, files: &[PathBuf], dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (push, _) = ctx.managers()?;

    println!("Pushing documents from {:?}", ctx.config().docs_dir);
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    let report = push.push_all(files, dry_run)?;
    print_report(&report, dry_run)?;
    if !dry_run && !report.is_empty() {
        println!("✓ Push complete");
    }
    Ok(())
}

/// Runs `push --check`.
pub fn check(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let (push, _) = ctx.managers()?;
    let report = push.check_status()?;

    println!("Push status of {:?}", ctx.config().docs_dir);
    println!();
    for entry in &report.entries {
        println!(
            "  {:<13} {:<9} {} ({})",
            entry.status.as_str(),
            entry.category,
            entry.file,
            entry.title
        );
    }
    for (file, reason) in &report.errors {
        println!("  {:<13} {} ({})", "error", file, reason);
    }
    println!();
    println!("Would create: {}", report.count(PushStatus::WouldCreate));
    println!("Would update: {}", report.count(PushStatus::WouldUpdate));
    println!("Synced:       {}", report.count(PushStatus::Synced));

    if !report.errors.is_empty() {
        return Err(format!("{} document(s) could not be read", report.errors.len()).into());
    }
    Ok(())
}
