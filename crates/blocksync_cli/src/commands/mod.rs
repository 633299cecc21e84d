//! CLI command implementations.

pub mod pull;
pub mod push;
pub mod status;

use blocksync_engine::BatchReport;

/// Prints every outcome and the summary line.
///
/// Fails when any document reported an error, so the process exits
/// non-zero.
pub fn print_report(report: &BatchReport, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    for outcome in &report.outcomes {
        println!("  {outcome}");
    }
    println!();
    println!("Summary: {report}");
    if dry_run {
        println!("(dry run - no changes were made)");
    }

    let failed = report.outcomes.iter().filter(|o| o.is_error()).count();
    if failed > 0 {
        return Err(format!("{failed} document(s) failed").into());
    }
    Ok(())
}
