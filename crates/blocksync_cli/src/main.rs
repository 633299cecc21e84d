//! Blocksync CLI
//!
//! Pushes final markdown documents to Notion and pulls Notion pages back.
//!
//! # Commands
//!
//! - `push` - Push final documents (or preview with `--check`/`--dry-run`)
//! - `pull` - Pull one page by id or URL
//! - `pull-all` - Pull every page of the documents database
//! - `status` - Show the sync state summary and orphans

mod commands;
mod context;

use clap::{Parser, Subcommand};
use context::Context;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sync markdown documents with Notion.
#[derive(Parser)]
#[command(name = "blocksync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the markdown documents
    #[arg(global = true, short, long, default_value = ".")]
    docs_dir: PathBuf,

    /// Sync state file (default: <docs-dir>/.notion_sync_state.json)
    #[arg(global = true, long)]
    state_file: Option<PathBuf>,

    /// Documents database id; without it, pages go under category pages
    #[arg(global = true, long, env = "NOTION_DATABASE_ID")]
    database_id: Option<String>,

    /// Notion integration token
    #[arg(global = true, long, env = "NOTION_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push final documents to Notion
    Push {
        /// Only report what a push would do
        #[arg(short, long)]
        check: bool,

        /// Dry run - classify without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Push only these files (names or paths)
        #[arg(short, long = "file", num_args = 1..)]
        files: Vec<PathBuf>,

        /// Push stub documents too
        #[arg(long)]
        skip_quality: bool,
    },

    /// Pull one page by id or URL
    Pull {
        /// Page id or URL
        target: String,

        /// Overwrite conflicting or locally newer files
        #[arg(short, long)]
        force: bool,

        /// Dry run - classify without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Pull every page of the documents database
    PullAll {
        /// Overwrite conflicting or locally newer files
        #[arg(short, long)]
        force: bool,

        /// Dry run - classify without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Show the sync state summary and orphans
    Status {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ctx = Context::new(cli.docs_dir, cli.state_file, cli.database_id, cli.api_key);

    match cli.command {
        Commands::Push {
            check,
            dry_run,
            files,
            skip_quality,
        } => {
            let ctx = if skip_quality { ctx.without_quality_gate() } else { ctx };
            if check {
                commands::push::check(&ctx)?;
            } else {
                commands::push::run(&ctx, &files, dry_run)?;
            }
        }
        Commands::Pull {
            target,
            force,
            dry_run,
        } => {
            commands::pull::run(&ctx, &target, force, dry_run)?;
        }
        Commands::PullAll { force, dry_run } => {
            commands::pull::run_all(&ctx, force, dry_run)?;
        }
        Commands::Status { format } => {
            commands::status::run(&ctx, &format)?;
        }
        Commands::Version => {
            println!("blocksync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
