//! Status command implementation.

use crate::context::Context;
use serde::Serialize;
use std::collections::BTreeMap;

/// Sync state report.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// State file path.
    pub state_file: String,
    /// When the last batch finished (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
    /// Number of tracked documents.
    pub total: usize,
    /// Tracked documents per recorded status.
    pub by_status: BTreeMap<String, usize>,
    /// Categories with a parent page.
    pub categories: Vec<String>,
    /// Final files with no record.
    pub local_orphans: Vec<String>,
    /// Records whose file is gone, as `file (id)`.
    pub remote_orphans: Vec<String>,
}

/// Runs the status command.
pub fn run(ctx: &Context, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    let summary = store.summary();
    let orphans = store.find_orphans(&ctx.config().file_suffix)?;

    let result = StatusResult {
        state_file: store.path().display().to_string(),
        last_sync: summary.last_sync.map(|t| t.to_rfc3339()),
        total: summary.total,
        by_status: summary
            .status_counts
            .iter()
            .map(|(status, n)| (status.to_string(), *n))
            .collect(),
        categories: summary.categories,
        local_orphans: orphans.local_orphans,
        remote_orphans: orphans
            .remote_orphans
            .iter()
            .map(|r| format!("{} ({})", r.local_file, r.notion_id))
            .collect(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &StatusResult) {
    println!("Sync State: {}", result.state_file);
    println!();
    println!(
        "  Last sync:  {}",
        result.last_sync.as_deref().unwrap_or("never")
    );
    println!("  Documents:  {}", result.total);
    for (status, n) in &result.by_status {
        println!("    {:<16} {}", status, n);
    }
    if !result.categories.is_empty() {
        println!("  Categories: {}", result.categories.join(", "));
    }

    println!();
    if result.local_orphans.is_empty() && result.remote_orphans.is_empty() {
        println!("✓ No orphans");
        return;
    }
    if !result.local_orphans.is_empty() {
        println!("Local files never synced ({}):", result.local_orphans.len());
        for name in &result.local_orphans {
            println!("  {name}");
        }
    }
    if !result.remote_orphans.is_empty() {
        println!("Tracked documents with no local file ({}):", result.remote_orphans.len());
        for entry in &result.remote_orphans {
            println!("  {entry}");
        }
    }
}
