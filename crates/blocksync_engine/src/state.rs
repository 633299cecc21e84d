//! Persisted sync records and change detection.
//!
//! The store is a single JSON file:
//!
//! ```json
//! {
//!   "last_sync": "2024-05-01T10:00:00Z",
//!   "categories": { "vision": "<parent page id>" },
//!   "documents": { "<remote id>": { "notion_id": "...", "local_file": "...", ... } }
//! }
//! ```
//!
//! It is read fully when opened and rewritten fully after every mutation.
//! There is no locking: only one process may use a state file at a time.

use crate::error::{EngineError, EngineResult};
use blocksync_model::{compact_id, split_front_matter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sync status of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not tracked yet.
    New,
    /// Neither side changed since the last sync.
    Synced,
    /// Only the local file changed.
    ModifiedLocal,
    /// Only the remote document changed.
    ModifiedNotion,
    /// Both sides changed.
    Conflict,
    /// Status written by an older tool or not yet computed.
    #[serde(other)]
    Unknown,
}

impl SyncStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::New => "new",
            SyncStatus::Synced => "synced",
            SyncStatus::ModifiedLocal => "modified_local",
            SyncStatus::ModifiedNotion => "modified_notion",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping for one synced document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Remote id, without dashes.
    pub notion_id: String,
    /// File name relative to the docs directory.
    pub local_file: String,
    /// Title at the last sync.
    pub title: String,
    /// Remote edit time at the last sync.
    #[serde(default)]
    pub notion_last_edited: Option<DateTime<Utc>>,
    /// Local modification time at the last sync.
    #[serde(default)]
    pub local_last_modified: Option<DateTime<Utc>>,
    /// When the last sync completed.
    #[serde(default)]
    pub last_synced: Option<DateTime<Utc>>,
    /// Hash of the local body at the last sync.
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Status at the last sync.
    #[serde(default = "unknown_status")]
    pub sync_status: SyncStatus,
}

fn unknown_status() -> SyncStatus {
    SyncStatus::Unknown
}

impl SyncRecord {
    /// Creates a record with no timestamps.
    pub fn new(
        notion_id: impl AsRef<str>,
        local_file: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            notion_id: compact_id(notion_id.as_ref()),
            local_file: local_file.into(),
            title: title.into(),
            notion_last_edited: None,
            local_last_modified: None,
            last_synced: None,
            content_hash: None,
            sync_status: SyncStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    categories: BTreeMap<String, String>,
    #[serde(default)]
    documents: BTreeMap<String, SyncRecord>,
}

/// Counts over the whole store.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSummary {
    /// Last completed batch.
    pub last_sync: Option<DateTime<Utc>>,
    /// Number of tracked documents.
    pub total: usize,
    /// Documents per recorded status.
    pub status_counts: BTreeMap<SyncStatus, usize>,
    /// Configured category names.
    pub categories: Vec<String>,
}

/// Files and records that have lost their counterpart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Orphans {
    /// Final files in the docs directory with no record.
    pub local_orphans: Vec<String>,
    /// Records whose local file no longer exists.
    pub remote_orphans: Vec<SyncRecord>,
}

impl Orphans {
    /// Returns true if nothing is orphaned.
    pub fn is_empty(&self) -> bool {
        self.local_orphans.is_empty() && self.remote_orphans.is_empty()
    }
}

/// Hashes a document body for change detection.
///
/// Front matter is stripped and surrounding whitespace trimmed, so
/// metadata written back after a sync never reads as a local change.
pub fn content_hash(text: &str) -> String {
    let (_, body) = split_front_matter(text);
    let digest = Sha256::digest(body.trim().as_bytes());
    hex::encode(digest)
}

/// Persisted table of sync records keyed by remote id.
#[derive(Debug)]
pub struct SyncStateStore {
    path: PathBuf,
    docs_dir: PathBuf,
    state: StateFile,
}

impl SyncStateStore {
    /// Opens a state file, starting empty if it does not exist.
    ///
    /// `docs_dir` is where records' local files live.
    pub fn open(path: impl Into<PathBuf>, docs_dir: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| EngineError::StateCorrupted {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            StateFile::default()
        };
        debug!(path = %path.display(), documents = state.documents.len(), "opened sync state");
        Ok(Self {
            path,
            docs_dir: docs_dir.into(),
            state,
        })
    }

    /// State file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the local files.
    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Rewrites the whole state file.
    pub fn save(&self) -> EngineResult<()> {
        let json =
            serde_json::to_string_pretty(&self.state).map_err(|e| EngineError::StateCorrupted {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json + "\n")?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Returns the record for a remote id, with or without dashes.
    pub fn get(&self, remote_id: &str) -> Option<&SyncRecord> {
        self.state.documents.get(&compact_id(remote_id))
    }

    /// Returns the record tracking a local file name.
    pub fn get_by_local_file(&self, name: &str) -> Option<&SyncRecord> {
        self.state.documents.values().find(|r| r.local_file == name)
    }

    /// Returns the first record with the given title.
    pub fn get_by_title(&self, title: &str) -> Option<&SyncRecord> {
        self.state.documents.values().find(|r| r.title == title)
    }

    /// Inserts or replaces a record and saves.
    pub fn set(&mut self, mut record: SyncRecord) -> EngineResult<()> {
        record.notion_id = compact_id(&record.notion_id);
        self.state
            .documents
            .insert(record.notion_id.clone(), record);
        self.save()
    }

    /// Removes a record and saves. Returns the removed record.
    pub fn remove(&mut self, remote_id: &str) -> EngineResult<Option<SyncRecord>> {
        let removed = self.state.documents.remove(&compact_id(remote_id));
        if removed.is_some() {
            self.save()?;
        }
        Ok(removed)
    }

    /// Every record, ordered by local file name.
    pub fn list_all(&self) -> Vec<&SyncRecord> {
        let mut records: Vec<&SyncRecord> = self.state.documents.values().collect();
        records.sort_by(|a, b| a.local_file.cmp(&b.local_file));
        records
    }

    /// Records a successful sync of a document.
    ///
    /// Stamps the sync time and the local file's current modification
    /// time, and sets the status to [`SyncStatus::Synced`].
    pub fn mark_synced(
        &mut self,
        remote_id: &str,
        local_file: &str,
        title: &str,
        remote_last_edited: DateTime<Utc>,
        content_hash: String,
    ) -> EngineResult<()> {
        let mut record = SyncRecord::new(remote_id, local_file, title);
        record.notion_last_edited = Some(remote_last_edited);
        record.local_last_modified = self.local_mtime(local_file);
        record.last_synced = Some(Utc::now());
        record.content_hash = Some(content_hash);
        record.sync_status = SyncStatus::Synced;
        self.set(record)
    }

    // ------------------------------------------------------------------
    // Categories and bookkeeping
    // ------------------------------------------------------------------

    /// Sets the remote parent page for a category and saves.
    pub fn set_category(&mut self, category: &str, parent_id: &str) -> EngineResult<()> {
        self.state
            .categories
            .insert(category.to_string(), parent_id.to_string());
        self.save()
    }

    /// Returns the remote parent page of a category.
    pub fn category_id(&self, category: &str) -> Option<&str> {
        self.state.categories.get(category).map(String::as_str)
    }

    /// Stamps the end of a batch and saves.
    pub fn touch_last_sync(&mut self) -> EngineResult<()> {
        self.state.last_sync = Some(Utc::now());
        self.save()
    }

    /// When the last batch completed.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state.last_sync
    }

    // ------------------------------------------------------------------
    // Change detection
    // ------------------------------------------------------------------

    /// Classifies a document against its record.
    ///
    /// The remote side changed if `remote_last_edited` is later than the
    /// recorded edit time, or if no edit time was recorded. The local side
    /// changed if the hash of `local_content` differs from the recorded
    /// hash; without content, the file's modification time is compared
    /// instead, which is less precise.
    pub fn check_status(
        &self,
        remote_id: &str,
        remote_last_edited: DateTime<Utc>,
        local_content: Option<&str>,
    ) -> SyncStatus {
        let Some(record) = self.get(remote_id) else {
            return SyncStatus::New;
        };

        let remote_changed = match record.notion_last_edited {
            Some(recorded) => remote_last_edited > recorded,
            None => true,
        };

        let local_changed = match local_content {
            Some(content) => record.content_hash.as_deref() != Some(content_hash(content).as_str()),
            None => match (
                self.local_mtime(&record.local_file),
                record.local_last_modified,
            ) {
                (Some(current), Some(recorded)) => current > recorded,
                _ => false,
            },
        };

        match (remote_changed, local_changed) {
            (true, true) => SyncStatus::Conflict,
            (true, false) => SyncStatus::ModifiedNotion,
            (false, true) => SyncStatus::ModifiedLocal,
            (false, false) => SyncStatus::Synced,
        }
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Counts documents per recorded status.
    pub fn summary(&self) -> StateSummary {
        let mut status_counts = BTreeMap::new();
        for record in self.state.documents.values() {
            *status_counts.entry(record.sync_status).or_insert(0) += 1;
        }
        StateSummary {
            last_sync: self.state.last_sync,
            total: self.state.documents.len(),
            status_counts,
            categories: self.state.categories.keys().cloned().collect(),
        }
    }

    /// Finds final files with no record and records with no file.
    pub fn find_orphans(&self, file_suffix: &str) -> EngineResult<Orphans> {
        let mut orphans = Orphans::default();
        for record in self.list_all() {
            if !self.docs_dir.join(&record.local_file).exists() {
                orphans.remote_orphans.push(record.clone());
            }
        }
        if self.docs_dir.is_dir() {
            for entry in fs::read_dir(&self.docs_dir)? {
                let entry = entry?;
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if name.ends_with(file_suffix)
                    && entry.path().is_file()
                    && self.get_by_local_file(&name).is_none()
                {
                    orphans.local_orphans.push(name);
                }
            }
        }
        orphans.local_orphans.sort();
        Ok(orphans)
    }

    /// Records synced after `since`, grouped by status.
    pub fn changes_since(&self, since: DateTime<Utc>) -> BTreeMap<SyncStatus, Vec<SyncRecord>> {
        let mut changes: BTreeMap<SyncStatus, Vec<SyncRecord>> = BTreeMap::new();
        for record in self.list_all() {
            if record.last_synced.is_some_and(|t| t > since) {
                changes
                    .entry(record.sync_status)
                    .or_default()
                    .push(record.clone());
            }
        }
        changes
    }

    fn local_mtime(&self, local_file: &str) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.docs_dir.join(local_file))
            .and_then(|m| m.modified())
            .ok()?;
        Some(DateTime::<Utc>::from(modified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    fn store(dir: &TempDir) -> SyncStateStore {
        SyncStateStore::open(dir.path().join("state.json"), dir.path()).unwrap()
    }

    #[test]
    fn test_hash_ignores_front_matter() {
        let plain = content_hash("Body text.\n");
        let with_front = content_hash("---\nnotion_id: abc\n---\n\nBody text.\n\n");
        assert_eq!(plain, with_front);
        assert_eq!(plain.len(), 64);
        assert_ne!(plain, content_hash("Other text.\n"));
    }

    #[test]
    fn test_records_persist() {
        let dir = TempDir::new().unwrap();
        let mut state = store(&dir);
        state
            .set(SyncRecord::new("01234567-89ab-cdef-0123-456789abcdef", "a.md", "A"))
            .unwrap();
        state.set_category("vision", "parent").unwrap();

        let reopened = store(&dir);
        assert_eq!(reopened.get(ID).unwrap().title, "A");
        assert_eq!(reopened.get_by_local_file("a.md").unwrap().notion_id, ID);
        assert_eq!(reopened.get_by_title("A").unwrap().local_file, "a.md");
        assert_eq!(reopened.category_id("vision"), Some("parent"));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let mut state = store(&dir);
        state.set(SyncRecord::new(ID, "a.md", "A")).unwrap();
        assert!(state.remove(ID).unwrap().is_some());
        assert!(state.remove(ID).unwrap().is_none());
        assert!(store(&dir).list_all().is_empty());
    }

    #[test]
    fn test_corrupted_state_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("state.json"), "{ not json").unwrap();
        let err = SyncStateStore::open(dir.path().join("state.json"), dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::StateCorrupted { .. }));
    }

    #[test]
    fn test_legacy_fields_are_tolerated() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("state.json"),
            r#"{"last_sync": null, "notion_workspace": "x", "documents": {
                "abc": {"notion_id": "abc", "local_file": "a.md", "title": "A", "sync_status": "orphan"}
            }}"#,
        )
        .unwrap();
        let state = store(&dir);
        assert_eq!(state.get("abc").unwrap().sync_status, SyncStatus::Unknown);
    }

    #[test]
    fn test_check_status_five_ways() {
        let dir = TempDir::new().unwrap();
        let mut state = store(&dir);
        let edited = Utc::now() - Duration::hours(1);
        let content = "---\ntitle: A\n---\n\nOriginal body.\n";

        assert_eq!(state.check_status(ID, edited, Some(content)), SyncStatus::New);

        state
            .mark_synced(ID, "a.md", "A", edited, content_hash(content))
            .unwrap();
        let newer = edited + Duration::minutes(5);
        let changed = "---\ntitle: A\n---\n\nEdited body.\n";

        assert_eq!(state.check_status(ID, edited, Some(content)), SyncStatus::Synced);
        assert_eq!(
            state.check_status(ID, newer, Some(content)),
            SyncStatus::ModifiedNotion
        );
        assert_eq!(
            state.check_status(ID, edited, Some(changed)),
            SyncStatus::ModifiedLocal
        );
        assert_eq!(state.check_status(ID, newer, Some(changed)), SyncStatus::Conflict);
    }

    #[test]
    fn test_missing_remote_timestamp_counts_as_changed() {
        let dir = TempDir::new().unwrap();
        let mut state = store(&dir);
        let mut record = SyncRecord::new(ID, "a.md", "A");
        record.content_hash = Some(content_hash("Body"));
        state.set(record).unwrap();
        assert_eq!(
            state.check_status(ID, Utc::now(), Some("Body")),
            SyncStatus::ModifiedNotion
        );
    }

    #[test]
    fn test_mtime_fallback() {
        let dir = TempDir::new().unwrap();
        let mut state = store(&dir);
        fs::write(dir.path().join("a.md"), "Body").unwrap();
        let edited = Utc::now();
        state
            .mark_synced(ID, "a.md", "A", edited, content_hash("Body"))
            .unwrap();
        assert_eq!(state.check_status(ID, edited, None), SyncStatus::Synced);

        let mut record = state.get(ID).unwrap().clone();
        record.local_last_modified = Some(edited - Duration::days(1));
        state.set(record).unwrap();
        assert_eq!(state.check_status(ID, edited, None), SyncStatus::ModifiedLocal);
    }

    #[test]
    fn test_summary_orphans_and_changes() {
        let dir = TempDir::new().unwrap();
        let mut state = store(&dir);
        fs::write(dir.path().join("kept.md--FINAL.md"), "x").unwrap();
        fs::write(dir.path().join("untracked.md--FINAL.md"), "x").unwrap();
        fs::write(dir.path().join("draft.md"), "x").unwrap();

        let before = Utc::now() - Duration::seconds(1);
        state
            .mark_synced("a1", "kept.md--FINAL.md", "Kept", Utc::now(), "h".into())
            .unwrap();
        let mut gone = SyncRecord::new("b2", "deleted.md--FINAL.md", "Gone");
        gone.sync_status = SyncStatus::Conflict;
        state.set(gone).unwrap();
        state.set_category("blog", "p1").unwrap();
        state.touch_last_sync().unwrap();

        let summary = state.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.status_counts[&SyncStatus::Synced], 1);
        assert_eq!(summary.status_counts[&SyncStatus::Conflict], 1);
        assert_eq!(summary.categories, vec!["blog"]);
        assert!(summary.last_sync.is_some());

        let orphans = state.find_orphans("--FINAL.md").unwrap();
        assert_eq!(orphans.local_orphans, vec!["untracked.md--FINAL.md"]);
        assert_eq!(orphans.remote_orphans.len(), 1);
        assert_eq!(orphans.remote_orphans[0].title, "Gone");

        let changes = state.changes_since(before);
        assert_eq!(changes[&SyncStatus::Synced].len(), 1);
        assert!(!changes.contains_key(&SyncStatus::Conflict));
    }
}
