//! Remote to local: pull documents.

use crate::config::{EngineConfig, PushTarget};
use crate::error::{EngineError, EngineResult};
use crate::git::WorkingTreeCheck;
use crate::local::backup_file;
use crate::naming::{canonical_filename, category_for_type, document_date, NameParts};
use crate::outcome::{Action, BatchReport, Outcome};
use crate::state::{content_hash, SyncStateStore, SyncStatus};
use blocksync_client::{HttpClient, RemoteClient};
use blocksync_convert::blocks_to_markdown;
use blocksync_model::{compact_id, normalize_id, DocumentTree, FrontMatter};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pulls remote documents into local markdown files.
///
/// A pull never overwrites local edits silently: conflicts and locally
/// newer files are refused unless forced, and every overwrite is preceded
/// by a timestamped backup.
pub struct PullManager<C: HttpClient> {
    config: EngineConfig,
    client: Arc<RemoteClient<C>>,
    store: Arc<Mutex<SyncStateStore>>,
    working_tree: WorkingTreeCheck,
}

impl<C: HttpClient> PullManager<C> {
    /// Creates a pull manager.
    pub fn new(
        config: EngineConfig,
        client: Arc<RemoteClient<C>>,
        store: Arc<Mutex<SyncStateStore>>,
    ) -> Self {
        let working_tree = WorkingTreeCheck::new(config.docs_dir.clone());
        Self {
            config,
            client,
            store,
            working_tree,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pulls one document by id or URL.
    pub fn pull_document(&self, id_or_url: &str, force: bool, dry_run: bool) -> EngineResult<Outcome> {
        let id = normalize_id(id_or_url)?;
        if !dry_run && self.config.check_working_tree {
            self.working_tree.check();
        }

        let tree = self.client.fetch_document(&id)?;
        let meta = Metadata::of(&tree);
        let file_name = self.file_name_for(&tree, &meta);
        let path = self.config.docs_dir.join(&file_name);

        let existing = if path.exists() {
            Some(fs::read_to_string(&path)?)
        } else {
            None
        };
        let status = self.store.lock().check_status(
            &tree.document.id,
            tree.document.last_edited_time,
            existing.as_deref(),
        );
        let reason = status_reason(status);
        debug!(page = %tree.document.id, file = %file_name, status = %status, "classified");

        let base = Outcome::new(Action::Skipped)
            .with_file(file_name.clone())
            .with_title(tree.document.title.clone())
            .with_remote_id(tree.document.id.clone())
            .with_url(tree.document.url.clone())
            .with_reason(reason);

        if !force {
            match status {
                SyncStatus::Synced => return Ok(base),
                SyncStatus::Conflict => {
                    warn!(file = %file_name, "both sides changed; not pulling without force");
                    return Ok(Outcome {
                        action: Action::Conflict,
                        ..base
                    });
                }
                SyncStatus::ModifiedLocal => {
                    return Ok(base.with_reason(format!("{reason}; push instead")));
                }
                _ => {}
            }
        }

        let markdown = blocks_to_markdown(&tree.blocks);
        let mut front = existing
            .as_deref()
            .and_then(|text| FrontMatter::extract(text).ok())
            .map(|(front, _)| front)
            .unwrap_or_default();
        meta.apply(&mut front, &tree, &file_name);
        let text = front.to_document(&markdown)?;

        if dry_run {
            let action = if existing.is_some() {
                Action::WouldUpdate
            } else {
                Action::WouldCreate
            };
            return Ok(Outcome { action, ..base });
        }

        let backup = backup_file(&path)?;
        fs::write(&path, &text)?;
        self.store.lock().mark_synced(
            &tree.document.id,
            &file_name,
            &tree.document.title,
            tree.document.last_edited_time,
            content_hash(&text),
        )?;

        let action = if existing.is_some() {
            Action::Updated
        } else {
            Action::Created
        };
        info!(file = %file_name, action = %action, blocks = tree.block_count(), "pulled");
        Ok(Outcome { action, ..base }.with_backup(backup))
    }

    /// Pulls every document of the configured database.
    ///
    /// Per-document failures become error outcomes and do not stop the
    /// batch.
    pub fn pull_all(&self, force: bool, dry_run: bool) -> EngineResult<BatchReport> {
        let PushTarget::Database(database_id) = &self.config.target else {
            return Err(EngineError::NotConfigured(
                "pulling everything needs a database id".to_string(),
            ));
        };
        let documents = self.client.query_database(database_id, None)?;
        info!(documents = documents.len(), dry_run, "pulling database");

        let mut report = BatchReport::new();
        for document in documents {
            let outcome = match self.pull_document(&document.id, force, dry_run) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(page = %document.id, error = %e, "pull failed");
                    Outcome::error(e)
                        .with_title(document.title)
                        .with_remote_id(document.id)
                }
            };
            report.push(outcome);
        }

        if !dry_run {
            self.store.lock().touch_last_sync()?;
        }
        Ok(report)
    }

    fn file_name_for(&self, tree: &DocumentTree, meta: &Metadata) -> String {
        let tracked = self
            .store
            .lock()
            .get(&tree.document.id)
            .map(|record| record.local_file.clone())
            .filter(|name| !name.is_empty() && self.config.docs_dir.join(name).is_file());
        if let Some(name) = tracked {
            return name;
        }
        let parts = NameParts {
            date: meta.date,
            doc_type: meta.category,
            domain: meta.domain.as_deref().unwrap_or_default(),
            title: &tree.document.title,
        };
        canonical_filename(&parts, &self.config.file_suffix)
    }
}

/// Document properties that end up in front matter.
struct Metadata {
    category: &'static str,
    domain: Option<String>,
    status: String,
    author: Option<String>,
    date: chrono::NaiveDate,
}

impl Metadata {
    fn of(tree: &DocumentTree) -> Self {
        let doc = &tree.document;
        let lower = |name: &str| doc.property_text(name).map(|v| v.to_lowercase());
        let fallback = doc.created_time.unwrap_or(doc.last_edited_time);
        Self {
            category: lower("Type").map_or("vision", |t| category_for_type(&t)),
            domain: lower("Domain"),
            status: lower("Status").unwrap_or_else(|| "final".to_string()),
            author: doc.property_text("Author"),
            date: document_date(doc.property_text("Date").as_deref(), fallback),
        }
    }

    fn apply(&self, front: &mut FrontMatter, tree: &DocumentTree, file_name: &str) {
        let doc = &tree.document;
        front.set("title", doc.title.clone());
        if let Some(author) = &self.author {
            front.set("author", author.clone());
        }
        front.set("date", self.date.format("%Y-%m-%d").to_string());
        front.set("type", self.category);
        if let Some(domain) = &self.domain {
            front.set("domain", domain.clone());
        }
        front.set("status", self.status.clone());
        front.set("notion_id", compact_id(&doc.id));
        if let Some(url) = &doc.url {
            front.set("notion_url", url.clone());
        }
        front.set("local_file", file_name);
        front.set(
            "last_synced",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }
}

fn status_reason(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::New => "new",
        SyncStatus::Synced => "synced",
        SyncStatus::ModifiedNotion => "remote newer",
        SyncStatus::ModifiedLocal => "local newer",
        SyncStatus::Conflict => "conflict",
        SyncStatus::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reasons() {
        assert_eq!(status_reason(SyncStatus::ModifiedNotion), "remote newer");
        assert_eq!(status_reason(SyncStatus::ModifiedLocal), "local newer");
        assert_eq!(status_reason(SyncStatus::New), "new");
    }
}
