//! Push and pull scenarios against the in-memory API.

use blocksync_client::{ClientConfig, FakeNotion, RemoteClient};
use blocksync_engine::{
    Action, EngineConfig, EngineError, PullManager, PushManager, PushStatus, PushTarget,
    QualityGate, SyncStateStore, SyncStatus,
};
use blocksync_model::{compact_id, FrontMatter, ParentRef};
use blocksync_testkit::prelude::*;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    ws: TempWorkspace,
    db: String,
    client: Arc<RemoteClient<FakeNotion>>,
    store: Arc<Mutex<SyncStateStore>>,
    push: PushManager<FakeNotion>,
    pull: PullManager<FakeNotion>,
}

impl Harness {
    fn new() -> Self {
        Self::with_quality(QualityGate::disabled())
    }

    fn with_quality(quality: QualityGate) -> Self {
        let ws = TempWorkspace::new();
        let fake = FakeNotion::new();
        let db = fake.add_database("Documents");
        let config = EngineConfig::new(ws.path(), PushTarget::Database(db.clone()))
            .with_quality(quality)
            .with_working_tree_check(false);
        let client = Arc::new(RemoteClient::new(
            ClientConfig::new("secret-token").with_min_request_interval(Duration::ZERO),
            fake,
        ));
        let store = Arc::new(Mutex::new(
            SyncStateStore::open(&config.state_file, ws.path()).unwrap(),
        ));
        let push = PushManager::new(config.clone(), client.clone(), store.clone());
        let pull = PullManager::new(config, client.clone(), store.clone());
        Self {
            ws,
            db,
            client,
            store,
            push,
            pull,
        }
    }

    fn fake(&self) -> &FakeNotion {
        self.client.http()
    }

    /// Seeds a database row with typed properties and two blocks.
    fn remote_page(&self, title: &str, key: &str) -> String {
        let fake = self.fake();
        let page = fake.add_page(&ParentRef::Database(self.db.clone()), title);
        fake.set_property(&page, "Type", json!({ "select": { "name": "software" } }));
        fake.set_property(&page, "Domain", json!({ "select": { "name": "Architecture" } }));
        fake.set_property(&page, "Date", json!({ "date": { "start": "2025-03-07" } }));
        fake.add_blocks(
            &page,
            vec![
                heading_json(&format!("{key}-h"), 1, "Overview"),
                paragraph_json(&format!("{key}-p"), "Body text."),
            ],
        );
        page
    }
}

const DESIGN_FILE: &str = "250307-s-architecture-sync-engine-design.md--FINAL.md";

// ============================================================================
// Push
// ============================================================================

#[test]
fn quality_gate_keeps_stubs_off_the_remote() {
    let h = Harness::with_quality(QualityGate::default());
    let stub = h
        .ws
        .write("stub.md--FINAL.md", &document("Stub", "vision", &sized_body(3, 100)));
    let full = h
        .ws
        .write("full.md--FINAL.md", &document("Full", "vision", &sized_body(5, 200)));

    let outcome = h.push.push_file(&stub, false);
    assert_eq!(outcome.action, Action::SkippedQuality);
    assert!(outcome.reason.unwrap().starts_with("Content too short"));
    assert!(h.fake().requests().is_empty());

    let outcome = h.push.push_file(&full, false);
    assert_eq!(outcome.action, Action::Created);
}

#[test]
fn push_creates_then_updates_in_place() {
    let h = Harness::new();
    let path = h.ws.write(
        "a.md--FINAL.md",
        &document("Alpha", "spec", "# Alpha\n\nFirst body.\n"),
    );

    let created = h.push.push_file(&path, false);
    assert_eq!(created.action, Action::Created, "{created}");
    let id = created.remote_id.clone().unwrap();
    assert_eq!(h.fake().children_of(&id).len(), 2);

    let (front, _) = FrontMatter::extract(&h.ws.read("a.md--FINAL.md")).unwrap();
    assert_eq!(front.get("notion_id"), Some(compact_id(&id)));
    assert!(front.get("notion_url").is_some());
    assert!(front.get("last_synced").is_some());
    assert_eq!(front.get("title").as_deref(), Some("Alpha"));

    let record = h.store.lock().get(&id).cloned().unwrap();
    assert_eq!(record.sync_status, SyncStatus::Synced);
    assert_eq!(record.local_file, "a.md--FINAL.md");

    let text = h.ws.read("a.md--FINAL.md");
    h.ws.write("a.md--FINAL.md", &format!("{text}\nSecond paragraph.\n\nThird.\n"));
    let updated = h.push.push_file(&path, false);
    assert_eq!(updated.action, Action::Updated, "{updated}");
    assert_eq!(updated.remote_id.as_deref(), Some(id.as_str()));
    assert_eq!(h.fake().children_of(&id).len(), 4);
    assert_eq!(h.fake().page_ids(), vec![id]);
}

#[test]
fn push_finds_existing_rows_by_title() {
    let h = Harness::new();
    let page = h.fake().add_page(&ParentRef::Database(h.db.clone()), "Beta");
    let path = h
        .ws
        .write("b.md--FINAL.md", &document("Beta", "blog", "Body.\n"));

    let outcome = h.push.push_file(&path, false);
    assert_eq!(outcome.action, Action::Updated);
    assert_eq!(outcome.remote_id.as_deref(), Some(page.as_str()));
    let row = h.client.get_document(&page).unwrap();
    assert_eq!(row.property_text("Type").as_deref(), Some("blog"));
    assert_eq!(row.property_text("Local File").as_deref(), Some("b.md--FINAL.md"));
}

#[test]
fn dry_run_has_no_side_effects() {
    let h = Harness::new();
    let original = document("Gamma", "vision", "Body.\n");
    h.ws.write("g.md--FINAL.md", &original);

    let report = h.push.push_all(&[], true).unwrap();
    assert_eq!(report.count(Action::WouldCreate), 1);
    assert!(h.fake().write_requests().is_empty());
    assert_eq!(h.ws.read("g.md--FINAL.md"), original);
    assert!(!h.ws.state_file().exists());
}

#[test]
fn missing_files_do_not_stop_the_batch() {
    let h = Harness::new();
    h.ws.write("ok.md--FINAL.md", &document("Ok", "vision", "Body.\n"));

    let files = vec![
        PathBuf::from("nope.md--FINAL.md"),
        PathBuf::from("ok.md--FINAL.md"),
    ];
    let report = h.push.push_all(&files, false).unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.count(Action::Created), 1);
    assert!(report.has_errors());
    assert!(h.store.lock().last_sync().is_some());
}

#[test]
fn check_reports_what_a_push_would_do() {
    let h = Harness::new();
    let a = h
        .ws
        .write("a.md--FINAL.md", &document("Alpha", "vision", "Body.\n"));
    h.ws.write("b.md--FINAL.md", &document("Beta", "vision", "Body.\n"));
    h.push.push_file(&a, false);

    let report = h.push.check_status().unwrap();
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[0].status, PushStatus::Synced);
    assert_eq!(report.entries[1].status, PushStatus::WouldCreate);

    let text = h.ws.read("a.md--FINAL.md");
    h.ws.write("a.md--FINAL.md", &format!("{text}\nMore.\n"));
    let report = h.push.check_status().unwrap();
    assert_eq!(report.count(PushStatus::WouldUpdate), 1);
}

// ============================================================================
// Pull
// ============================================================================

#[test]
fn pull_writes_a_canonical_file() {
    let h = Harness::new();
    let page = h.remote_page("Sync Engine Design", "a");

    let outcome = h.pull.pull_document(&page, false, false).unwrap();
    assert_eq!(outcome.action, Action::Created, "{outcome}");
    assert_eq!(outcome.file.as_deref(), Some(DESIGN_FILE));
    assert_eq!(outcome.reason.as_deref(), Some("new"));

    let text = h.ws.read(DESIGN_FILE);
    let (front, body) = FrontMatter::extract(&text).unwrap();
    assert_eq!(front.get("notion_id"), Some(compact_id(&page)));
    assert_eq!(front.get("type").as_deref(), Some("software"));
    assert_eq!(front.get("domain").as_deref(), Some("architecture"));
    assert_eq!(front.get("date").as_deref(), Some("2025-03-07"));
    assert_eq!(front.get("status").as_deref(), Some("final"));
    assert!(body.contains("# Overview"));
    assert!(body.contains("Body text."));
}

#[test]
fn pull_skips_synced_and_backs_up_on_remote_change() {
    let h = Harness::new();
    let page = h.remote_page("Sync Engine Design", "a");
    h.pull.pull_document(&page, false, false).unwrap();

    let again = h.pull.pull_document(&page, false, false).unwrap();
    assert_eq!(again.action, Action::Skipped);
    assert_eq!(again.reason.as_deref(), Some("synced"));

    h.fake()
        .set_last_edited(&page, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    let updated = h.pull.pull_document(&page, false, false).unwrap();
    assert_eq!(updated.action, Action::Updated);
    assert_eq!(updated.reason.as_deref(), Some("remote newer"));
    let backup = updated.backup.unwrap();
    assert!(backup.exists());
}

#[test]
fn pull_refuses_conflicts_unless_forced() {
    let h = Harness::new();
    let page = h.remote_page("Sync Engine Design", "a");
    h.pull.pull_document(&page, false, false).unwrap();

    let edited = format!("{}\nLocal addition.\n", h.ws.read(DESIGN_FILE));
    h.ws.write(DESIGN_FILE, &edited);
    h.fake()
        .set_last_edited(&page, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());

    let refused = h.pull.pull_document(&page, false, false).unwrap();
    assert_eq!(refused.action, Action::Conflict);
    assert_eq!(h.ws.read(DESIGN_FILE), edited);

    let forced = h.pull.pull_document(&page, true, false).unwrap();
    assert_eq!(forced.action, Action::Updated);
    let backup = forced.backup.unwrap();
    assert_eq!(std::fs::read_to_string(backup).unwrap(), edited);
    assert!(!h.ws.read(DESIGN_FILE).contains("Local addition."));
}

#[test]
fn pull_refuses_locally_newer_files() {
    let h = Harness::new();
    let page = h.remote_page("Sync Engine Design", "a");
    h.pull.pull_document(&page, false, false).unwrap();

    let edited = format!("{}\nLocal addition.\n", h.ws.read(DESIGN_FILE));
    h.ws.write(DESIGN_FILE, &edited);

    let outcome = h.pull.pull_document(&page, false, false).unwrap();
    assert_eq!(outcome.action, Action::Skipped);
    assert_eq!(outcome.reason.as_deref(), Some("local newer; push instead"));
    assert_eq!(h.ws.read(DESIGN_FILE), edited);
}

#[test]
fn pull_dry_run_writes_nothing() {
    let h = Harness::new();
    let page = h.remote_page("Sync Engine Design", "a");

    let outcome = h.pull.pull_document(&page, false, true).unwrap();
    assert_eq!(outcome.action, Action::WouldCreate);
    assert!(!h.ws.exists(DESIGN_FILE));
    assert!(h.store.lock().get(&page).is_none());
}

#[test]
fn pull_accepts_urls_and_compact_ids() {
    let h = Harness::new();
    let page = h.remote_page("Sync Engine Design", "a");
    let url = format!("https://www.notion.so/Sync-Engine-Design-{}?pvs=4", compact_id(&page));

    let outcome = h.pull.pull_document(&url, false, false).unwrap();
    assert_eq!(outcome.action, Action::Created);
    assert_eq!(outcome.remote_id.as_deref(), Some(page.as_str()));
}

#[test]
fn pulling_an_archived_page_is_an_error() {
    let h = Harness::new();
    let page = h.remote_page("Gone", "a");
    h.fake().archive(&page);

    let err = h.pull.pull_document(&page, false, false).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn pull_all_pulls_every_row() {
    let h = Harness::new();
    h.remote_page("First Design", "a");
    h.remote_page("Second Design", "b");

    let report = h.pull.pull_all(false, false).unwrap();
    assert_eq!(report.count(Action::Created), 2, "{report}");
    assert!(h.ws.exists("250307-s-architecture-first-design.md--FINAL.md"));
    assert!(h.ws.exists("250307-s-architecture-second-design.md--FINAL.md"));
    assert!(h.store.lock().last_sync().is_some());
}

#[test]
fn pull_all_needs_a_database() {
    let ws = TempWorkspace::new();
    let config = EngineConfig::new(ws.path(), PushTarget::CategoryPages);
    let client = Arc::new(RemoteClient::new(ClientConfig::new("k"), FakeNotion::new()));
    let store = Arc::new(Mutex::new(
        SyncStateStore::open(ws.state_file(), ws.path()).unwrap(),
    ));
    let pull = PullManager::new(config, client, store);
    assert!(matches!(
        pull.pull_all(false, false),
        Err(EngineError::NotConfigured(_))
    ));
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn pull_after_push_is_synced() {
    let h = Harness::new();
    let path = h.ws.write(
        "a.md--FINAL.md",
        &document("Alpha", "spec", "# Alpha\n\n- one\n- two\n"),
    );
    let pushed = h.push.push_file(&path, false);
    let id = pushed.remote_id.unwrap();

    let pulled = h.pull.pull_document(&id, false, false).unwrap();
    assert_eq!(pulled.action, Action::Skipped);
    assert_eq!(pulled.reason.as_deref(), Some("synced"));
    assert_eq!(pulled.file.as_deref(), Some("a.md--FINAL.md"));
}

#[test]
fn pushing_a_pulled_file_updates_the_same_page() {
    let h = Harness::new();
    let page = h.remote_page("Sync Engine Design", "a");
    h.pull.pull_document(&page, false, false).unwrap();

    let outcome = h.push.push_file(&h.ws.file(DESIGN_FILE), false);
    assert_eq!(outcome.action, Action::Updated, "{outcome}");
    assert_eq!(outcome.remote_id.as_deref(), Some(page.as_str()));
    assert_eq!(h.fake().page_ids().len(), 1);
}
