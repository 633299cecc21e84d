//! Local to remote: push documents.

use crate::config::{EngineConfig, PushTarget, TITLE_PROPERTY};
use crate::error::{EngineError, EngineResult};
use crate::local::{final_files, LocalDocument};
use crate::naming::{DOMAINS, STATUSES};
use crate::outcome::{Action, BatchReport, Outcome, PushStatus, StatusEntry, StatusReport};
use crate::state::{content_hash, SyncStateStore};
use blocksync_client::{HttpClient, RemoteClient, TitleScope};
use blocksync_model::{compact_id, normalize_id, FrontMatter, ParentRef, PropertyMap, RemoteDocument};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pushes local documents to the remote store.
///
/// A push locates the remote counterpart (by the id in front matter, then
/// by title), replaces its content or creates it, writes the remote id back
/// into the file, and records the sync.
pub struct PushManager<C: HttpClient> {
    config: EngineConfig,
    client: Arc<RemoteClient<C>>,
    store: Arc<Mutex<SyncStateStore>>,
}

impl<C: HttpClient> PushManager<C> {
    /// Creates a push manager.
    pub fn new(
        config: EngineConfig,
        client: Arc<RemoteClient<C>>,
        store: Arc<Mutex<SyncStateStore>>,
    ) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pushes one file.
    ///
    /// Failures are reported as [`Action::Error`] outcomes.
    pub fn push_file(&self, path: &Path, dry_run: bool) -> Outcome {
        let name = display_name(path);
        match self.try_push(path, dry_run) {
            Ok(outcome) => {
                info!(file = %name, action = %outcome.action, "pushed");
                outcome
            }
            Err(e) => {
                warn!(file = %name, error = %e, "push failed");
                Outcome::error(e).with_file(name)
            }
        }
    }

    /// Pushes every final file, or the given files, in name order.
    ///
    /// Files are resolved against the docs directory. A missing file is an
    /// error outcome and does not stop the batch.
    pub fn push_all(&self, files: &[PathBuf], dry_run: bool) -> EngineResult<BatchReport> {
        let mut paths: Vec<PathBuf> = if files.is_empty() {
            final_files(&self.config.docs_dir, &self.config.file_suffix)?
        } else {
            files.iter().map(|f| self.config.resolve(f)).collect()
        };
        paths.sort();
        info!(files = paths.len(), dry_run, "pushing documents");

        let mut report = BatchReport::new();
        for (i, path) in paths.iter().enumerate() {
            debug!(index = i + 1, total = paths.len(), file = %path.display(), "processing");
            if !path.is_file() {
                report.push(Outcome::error("file does not exist").with_file(display_name(path)));
                continue;
            }
            report.push(self.push_file(path, dry_run));
        }

        if !dry_run {
            self.store.lock().touch_last_sync()?;
        }
        Ok(report)
    }

    /// Reports what a push would do with every final file.
    pub fn check_status(&self) -> EngineResult<StatusReport> {
        let mut report = StatusReport::default();
        for path in final_files(&self.config.docs_dir, &self.config.file_suffix)? {
            match self.status_of(&path) {
                Ok(entry) => report.entries.push(entry),
                Err(e) => report.errors.push((display_name(&path), e.to_string())),
            }
        }
        Ok(report)
    }

    fn status_of(&self, path: &Path) -> EngineResult<StatusEntry> {
        let doc = LocalDocument::load(path)?;
        let status = match self.find_existing(&doc)? {
            None => PushStatus::WouldCreate,
            Some(remote) => {
                let recorded = self
                    .store
                    .lock()
                    .get(&remote.id)
                    .and_then(|record| record.content_hash.clone());
                if recorded == Some(doc.content_hash()) {
                    PushStatus::Synced
                } else {
                    PushStatus::WouldUpdate
                }
            }
        };
        Ok(StatusEntry {
            file: doc.file_name,
            title: doc.title,
            category: doc.category.to_string(),
            status,
        })
    }

    fn try_push(&self, path: &Path, dry_run: bool) -> EngineResult<Outcome> {
        let doc = LocalDocument::load(path)?;
        let base = Outcome::new(Action::Skipped)
            .with_file(doc.file_name.clone())
            .with_title(doc.title.clone());

        if let Some(reason) = self.config.quality.check(&doc.body, &doc.blocks) {
            debug!(file = %doc.file_name, %reason, "quality gate rejected document");
            return Ok(Outcome {
                action: Action::SkippedQuality,
                ..base.with_reason(reason)
            });
        }

        let existing = self.find_existing(&doc)?;
        if dry_run {
            return Ok(match existing {
                Some(remote) => Outcome {
                    action: Action::WouldUpdate,
                    ..base.with_remote_id(remote.id).with_url(remote.url)
                },
                None => Outcome {
                    action: Action::WouldCreate,
                    ..base.with_reason(doc.category)
                },
            });
        }

        let properties = self.properties(&doc);
        let (action, id) = match existing {
            Some(remote) => {
                self.client.update_properties(&remote.id, properties)?;
                let deleted = self.client.clear_content(&remote.id)?;
                let written = if doc.blocks.is_empty() {
                    0
                } else {
                    self.client.append_blocks(&remote.id, &doc.blocks)?
                };
                debug!(page = %remote.id, deleted, written, "replaced content");
                (Action::Updated, remote.id)
            }
            None => {
                let parent = self.parent_for(doc.category)?;
                let created = self
                    .client
                    .create_document(&parent, properties, &doc.blocks)?;
                (Action::Created, created.id)
            }
        };

        // The edit time must cover the appended content.
        let remote = self.client.get_document(&id)?;

        let mut updates = vec![("notion_id", compact_id(&remote.id))];
        if let Some(url) = &remote.url {
            updates.push(("notion_url", url.clone()));
        }
        updates.push((
            "last_synced",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
        let written = FrontMatter::merge_into(&doc.text, &updates)?;
        fs::write(path, &written)?;

        self.store.lock().mark_synced(
            &remote.id,
            &doc.file_name,
            &doc.title,
            remote.last_edited_time,
            content_hash(&written),
        )?;

        Ok(Outcome {
            action,
            ..base.with_remote_id(remote.id).with_url(remote.url)
        })
    }

    fn find_existing(&self, doc: &LocalDocument) -> EngineResult<Option<RemoteDocument>> {
        if let Some(raw) = doc.remote_id() {
            match normalize_id(&raw) {
                Ok(id) => match self.client.get_document(&id) {
                    Ok(remote) if self.in_target(&remote, doc.category) => return Ok(Some(remote)),
                    Ok(remote) => {
                        debug!(page = %remote.id, "recorded document is outside the push target")
                    }
                    Err(e) if e.is_not_found() => {
                        debug!(page = %id, "recorded document is gone")
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) => warn!(file = %doc.file_name, error = %e, "ignoring notion_id"),
            }
        }

        match &self.config.target {
            PushTarget::Database(database_id) => {
                let scope = TitleScope::Database {
                    database_id,
                    property: TITLE_PROPERTY,
                };
                Ok(self.client.find_document_by_title(&doc.title, scope)?)
            }
            PushTarget::CategoryPages => match self.category_page(doc.category) {
                Some(page) => Ok(self
                    .client
                    .find_document_by_title(&doc.title, TitleScope::Page(&page))?),
                None => Ok(None),
            },
        }
    }

    fn in_target(&self, remote: &RemoteDocument, category: &str) -> bool {
        match &self.config.target {
            PushTarget::Database(database_id) => remote.parent.is_database(database_id),
            PushTarget::CategoryPages => match self.category_page(category) {
                Some(page) => remote.parent.is_page(&page),
                None => !matches!(remote.parent, ParentRef::Database(_)),
            },
        }
    }

    fn parent_for(&self, category: &str) -> EngineResult<ParentRef> {
        match &self.config.target {
            PushTarget::Database(database_id) => Ok(ParentRef::Database(database_id.clone())),
            PushTarget::CategoryPages => self
                .category_page(category)
                .map(ParentRef::Page)
                .ok_or_else(|| {
                    EngineError::NotConfigured(format!("no parent page for category '{category}'"))
                }),
        }
    }

    fn category_page(&self, category: &str) -> Option<String> {
        self.store.lock().category_id(category).map(str::to_string)
    }

    fn properties(&self, doc: &LocalDocument) -> PropertyMap {
        if !matches!(self.config.target, PushTarget::Database(_)) {
            return PropertyMap::new().title("title", &doc.title);
        }

        let front = &doc.front;
        let lower = |key: &str| front.get(key).map(|v| v.to_lowercase());
        let status = lower("status")
            .filter(|s| STATUSES.contains(&s.as_str()))
            .unwrap_or_else(|| "final".to_string());

        let mut props = PropertyMap::new()
            .title(TITLE_PROPERTY, &doc.title)
            .select("Type", doc.category)
            .select("Status", &status);
        if let Some(domain) = lower("domain").filter(|d| DOMAINS.contains(&d.as_str())) {
            props = props.select("Domain", &domain);
        }
        if let Some(author) = front.get("author") {
            props = props.rich_text("Author", &author);
        }
        if let Some(date) = front.get("date").and_then(|d| d.get(..10).map(str::to_string)) {
            props = props.date("Date", &date);
        }
        props
            .rich_text("Local File", &doc.file_name)
            .date("Last Synced", &Utc::now().format("%Y-%m-%d").to_string())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityGate;
    use blocksync_client::{ClientConfig, FakeNotion};
    use blocksync_testkit::TempWorkspace;
    use std::time::Duration;

    fn manager(ws: &TempWorkspace, fake: FakeNotion, db: &str) -> PushManager<FakeNotion> {
        let config = EngineConfig::new(ws.path(), PushTarget::Database(db.to_string()))
            .with_quality(QualityGate::disabled())
            .with_working_tree_check(false);
        let client = RemoteClient::new(
            ClientConfig::new("key").with_min_request_interval(Duration::ZERO),
            fake,
        );
        let store = SyncStateStore::open(&config.state_file, ws.path()).unwrap();
        PushManager::new(config, Arc::new(client), Arc::new(Mutex::new(store)))
    }

    #[test]
    fn test_database_properties() {
        let ws = TempWorkspace::new();
        let fake = FakeNotion::new();
        let db = fake.add_database("Corpus");
        let push = manager(&ws, fake, &db);
        let path = ws.write(
            "a.md--FINAL.md",
            "---\ntitle: Alpha\ntype: spec\ndomain: Protocol\nstatus: Weird\nauthor: Sam\ndate: 2025-02-03T10:00:00\n---\n\nBody\n",
        );
        let doc = LocalDocument::load(&path).unwrap();
        let props = push.properties(&doc);

        assert_eq!(props.get("Title").unwrap()["title"][0]["text"]["content"], "Alpha");
        assert_eq!(props.get("Type").unwrap()["select"]["name"], "software");
        assert_eq!(props.get("Domain").unwrap()["select"]["name"], "protocol");
        assert_eq!(props.get("Status").unwrap()["select"]["name"], "final");
        assert_eq!(props.get("Author").unwrap()["rich_text"][0]["text"]["content"], "Sam");
        assert_eq!(props.get("Date").unwrap()["date"]["start"], "2025-02-03");
        assert_eq!(
            props.get("Local File").unwrap()["rich_text"][0]["text"]["content"],
            "a.md--FINAL.md"
        );
        assert!(props.get("Last Synced").is_some());
    }

    #[test]
    fn test_unknown_domain_is_omitted() {
        let ws = TempWorkspace::new();
        let fake = FakeNotion::new();
        let db = fake.add_database("Corpus");
        let push = manager(&ws, fake, &db);
        let path = ws.write("b.md--FINAL.md", "---\ndomain: cooking\n---\n\nBody\n");
        let props = push.properties(&LocalDocument::load(&path).unwrap());
        assert!(props.get("Domain").is_none());
        assert_eq!(props.get("Type").unwrap()["select"]["name"], "vision");
    }
}
