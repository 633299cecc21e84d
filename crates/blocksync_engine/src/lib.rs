//! # Blocksync Engine
//!
//! Bidirectional sync between a directory of markdown files and the
//! Notion block API.
//!
//! This crate provides:
//! - [`SyncStateStore`]: the persisted record of every synced document
//! - [`PushManager`]: local files to remote documents, behind a quality gate
//! - [`PullManager`]: remote documents to local files, with conflict refusal
//!   and backups
//! - Naming rules for titles, categories and canonical file names
//!
//! ## Change detection
//!
//! A document is classified against its record as `new`, `synced`,
//! `modified_notion`, `modified_local` or `conflict`. The remote side is
//! compared by last edit time and the local side by a hash of the body,
//! so writing ids back into front matter never looks like a local edit.
//!
//! ## Key Invariants
//!
//! - A pull never overwrites a conflicting or locally newer file unless forced
//! - Every local overwrite is preceded by a backup
//! - The state file is rewritten whole after every mutation
//! - One process per state file

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod git;
mod local;
mod naming;
mod outcome;
mod pull;
mod push;
mod state;

pub use config::{
    EngineConfig, PushTarget, QualityGate, DEFAULT_FILE_SUFFIX, DEFAULT_STATE_FILE, TITLE_PROPERTY,
};
pub use error::{EngineError, EngineResult};
pub use git::WorkingTreeCheck;
pub use local::{backup_file, final_files, LocalDocument};
pub use naming::{
    canonical_filename, category_for_type, category_from_filename, document_date, slugify,
    NameParts, CATEGORIES, DOMAINS, STATUSES,
};
pub use outcome::{Action, BatchReport, Outcome, PushStatus, StatusEntry, StatusReport};
pub use pull::PullManager;
pub use push::PushManager;
pub use state::{content_hash, Orphans, StateSummary, SyncRecord, SyncStateStore, SyncStatus};
