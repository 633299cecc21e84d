//! In-memory remote API for tests.
//!
//! [`FakeNotion`] implements [`HttpClient`] by routing requests to an
//! in-process model of pages, databases and block trees. It enforces the
//! same write limits as the real service (batch size, run length, nesting
//! depth), pages listings with a configurable page size, and can inject
//! 429 responses and write failures. Every request is logged.

use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use blocksync_model::wire::{MAX_NESTING, MAX_TEXT_RUN_CHARS};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

const MAX_BATCH: usize = 100;

/// One request as received by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedRequest {
    /// Method.
    pub method: Method,
    /// Path relative to the API root, without the query string.
    pub path: String,
    /// Query string, if any.
    pub query: Option<String>,
    /// Parsed JSON body, if any.
    pub body: Option<Value>,
}

impl LoggedRequest {
    /// Number of entries in the body's `children` array.
    pub fn child_count(&self) -> usize {
        self.body
            .as_ref()
            .and_then(|b| b.get("children"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone)]
struct Node {
    value: Value,
    children: Vec<String>,
    archived: bool,
}

#[derive(Debug)]
struct State {
    nodes: HashMap<String, Node>,
    databases: HashMap<String, Value>,
    page_size: usize,
    throttle: usize,
    fail_at_write: Option<usize>,
    writes: usize,
    log: Vec<LoggedRequest>,
    clock: DateTime<Utc>,
}

/// In-memory implementation of the remote block API.
pub struct FakeNotion {
    state: Mutex<State>,
}

impl FakeNotion {
    /// Creates an empty workspace with the service's page size.
    pub fn new() -> Self {
        let clock = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            state: Mutex::new(State {
                nodes: HashMap::new(),
                databases: HashMap::new(),
                page_size: MAX_BATCH,
                throttle: 0,
                fail_at_write: None,
                writes: 0,
                log: Vec::new(),
                clock,
            }),
        }
    }

    /// Caps every listing page at `size` results.
    pub fn with_page_size(self, size: usize) -> Self {
        self.state.lock().page_size = size.max(1);
        self
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Adds a database and returns its id.
    pub fn add_database(&self, title: &str) -> String {
        let mut state = self.state.lock();
        let id = new_id();
        let now = state.tick();
        state.databases.insert(
            id.clone(),
            json!({
                "object": "database",
                "id": id,
                "title": plain_runs(title),
                "created_time": now,
                "last_edited_time": now,
                "archived": false,
                "parent": { "type": "workspace", "workspace": true },
                "properties": {}
            }),
        );
        id
    }

    /// Adds a page under a database (`Title` property) or page (`title`
    /// property) and returns its id.
    pub fn add_page(&self, parent: &blocksync_model::ParentRef, title: &str) -> String {
        let title_key = match parent {
            blocksync_model::ParentRef::Database(_) => "Title",
            _ => "title",
        };
        let properties = json!({ title_key: { "title": [{ "text": { "content": title } }] } });
        self.state.lock().create_page(&parent.to_wire(), &properties)
    }

    /// Appends a wire block (with optional `children` in its payload)
    /// under `parent_id` and returns the new block's id.
    pub fn add_block(&self, parent_id: &str, block: Value) -> String {
        let mut state = self.state.lock();
        state.insert_block(parent_id, block)
    }

    /// Appends several wire blocks under `parent_id`.
    pub fn add_blocks(&self, parent_id: &str, blocks: Vec<Value>) -> Vec<String> {
        blocks
            .into_iter()
            .map(|block| self.add_block(parent_id, block))
            .collect()
    }

    /// Sets a page's `last_edited_time`.
    pub fn set_last_edited(&self, id: &str, time: DateTime<Utc>) {
        let mut state = self.state.lock();
        if let Some(node) = state.nodes.get_mut(id) {
            node.value["last_edited_time"] = json!(rfc3339(time));
        }
    }

    /// Sets a page property to a raw wire value.
    pub fn set_property(&self, id: &str, name: &str, value: Value) {
        let mut state = self.state.lock();
        if let Some(node) = state.nodes.get_mut(id) {
            let mut props = Map::new();
            props.insert(name.to_string(), value);
            merge_properties(&mut node.value, &Value::Object(props));
        }
    }

    /// Archives a page or block.
    pub fn archive(&self, id: &str) {
        let mut state = self.state.lock();
        if let Some(node) = state.nodes.get_mut(id) {
            node.archived = true;
            node.value["archived"] = json!(true);
        }
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Answers the next `count` requests with 429 and `Retry-After: 0`.
    pub fn throttle_next(&self, count: usize) {
        self.state.lock().throttle = count;
    }

    /// Fails the `n`th write request from now (1-based) with a 500.
    pub fn fail_nth_write(&self, n: usize) {
        let mut state = self.state.lock();
        state.fail_at_write = Some(state.writes + n.max(1));
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Every request received so far.
    pub fn requests(&self) -> Vec<LoggedRequest> {
        self.state.lock().log.clone()
    }

    /// Requests that change remote state.
    pub fn write_requests(&self) -> Vec<LoggedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.is_write() && r.path != "search" && !r.path.ends_with("/query"))
            .collect()
    }

    /// Forgets the request log.
    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    /// Live children of a page or block, in order, without nested content.
    pub fn children_of(&self, id: &str) -> Vec<Value> {
        let state = self.state.lock();
        state
            .live_children(id)
            .into_iter()
            .filter_map(|child| state.nodes.get(&child).map(|n| n.value.clone()))
            .collect()
    }

    /// The stored JSON of a page or block.
    pub fn object(&self, id: &str) -> Option<Value> {
        self.state.lock().nodes.get(id).map(|n| n.value.clone())
    }

    /// Ids of every live page.
    pub fn page_ids(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut ids: Vec<String> = state
            .nodes
            .iter()
            .filter(|(_, n)| !n.archived && n.value["object"] == "page")
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let raw = match request.url.find("/v1/") {
            Some(idx) => &request.url[idx + 4..],
            None => request.url.as_str(),
        };
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (raw.to_string(), None),
        };
        let body: Option<Value> = request
            .body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok());

        let mut state = self.state.lock();
        state.log.push(LoggedRequest {
            method: request.method,
            path: path.clone(),
            query: query.clone(),
            body: body.clone(),
        });

        if state.throttle > 0 {
            state.throttle -= 1;
            return error(429, "rate_limited", "slow down").with_header("Retry-After", "0");
        }

        let is_query = path == "search" || path.ends_with("/query");
        if request.method.is_write() && !is_query {
            state.writes += 1;
            if state.fail_at_write == Some(state.writes) {
                state.fail_at_write = None;
                return error(500, "internal_server_error", "injected failure");
            }
        }

        let segments: Vec<&str> = path.split('/').collect();
        let body = body.unwrap_or(Value::Null);
        let query = query.unwrap_or_default();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["pages", id]) => state.get_page(id),
            (Method::Patch, ["pages", id]) => state.update_page(id, &body),
            (Method::Post, ["pages"]) => state.post_page(&body),
            (Method::Get, ["databases", id]) => match state.databases.get(*id) {
                Some(db) => ok(db.clone()),
                None => not_found(id),
            },
            (Method::Post, ["databases", id, "query"]) => state.query(id, &body),
            (Method::Get, ["blocks", id, "children"]) => state.list_children(id, &query),
            (Method::Patch, ["blocks", id, "children"]) => state.append(id, &body),
            (Method::Delete, ["blocks", id]) => state.delete(id),
            (Method::Post, ["search"]) => state.search(&body),
            _ => error(400, "invalid_request_url", "unknown endpoint"),
        }
    }
}

impl Default for FakeNotion {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for FakeNotion {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        Ok(self.handle(request))
    }
}

impl State {
    fn tick(&mut self) -> String {
        self.clock += ChronoDuration::seconds(1);
        rfc3339(self.clock)
    }

    fn live_children(&self, id: &str) -> Vec<String> {
        self.nodes
            .get(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter(|c| self.nodes.get(*c).is_some_and(|n| !n.archived))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn create_page(&mut self, parent: &Value, properties: &Value) -> String {
        let id = new_id();
        let now = self.tick();
        let parent = if let Some(db) = parent.get("database_id") {
            json!({ "type": "database_id", "database_id": db })
        } else if let Some(page) = parent.get("page_id") {
            json!({ "type": "page_id", "page_id": page })
        } else {
            json!({ "type": "workspace", "workspace": true })
        };
        let mut value = json!({
            "object": "page",
            "id": id,
            "url": format!("https://www.notion.so/{}", id.replace('-', "")),
            "created_time": now,
            "last_edited_time": now,
            "archived": false,
            "parent": parent,
            "properties": {}
        });
        merge_properties(&mut value, properties);
        self.nodes.insert(
            id.clone(),
            Node {
                value,
                children: Vec::new(),
                archived: false,
            },
        );
        id
    }

    fn insert_block(&mut self, parent_id: &str, mut block: Value) -> String {
        let kind = block
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("paragraph")
            .to_string();
        let nested = block
            .get_mut(&kind)
            .and_then(Value::as_object_mut)
            .and_then(|payload| payload.remove("children"))
            .and_then(|c| match c {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default();

        let id = block
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(new_id);
        let now = self.tick();
        let parent_is_page = self
            .nodes
            .get(parent_id)
            .is_some_and(|n| n.value["object"] == "page");
        if let Some(map) = block.as_object_mut() {
            map.insert("object".into(), json!("block"));
            map.insert("id".into(), json!(id));
            map.insert("archived".into(), json!(false));
            map.insert("created_time".into(), json!(now));
            map.insert("last_edited_time".into(), json!(now));
            let parent = if parent_is_page {
                json!({ "type": "page_id", "page_id": parent_id })
            } else {
                json!({ "type": "block_id", "block_id": parent_id })
            };
            map.insert("parent".into(), parent);
            let flagged = map
                .get("has_children")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            map.insert("has_children".into(), json!(flagged || !nested.is_empty()));
        }

        self.nodes.insert(
            id.clone(),
            Node {
                value: block,
                children: Vec::new(),
                archived: false,
            },
        );
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push(id.clone());
            if parent.value["object"] == "block" {
                parent.value["has_children"] = json!(true);
            }
        }
        for child in nested {
            self.insert_block(&id, child);
        }
        id
    }

    fn page_of(&self, id: &str) -> Option<String> {
        let mut current = id.to_string();
        for _ in 0..64 {
            let node = self.nodes.get(&current)?;
            if node.value["object"] == "page" {
                return Some(current);
            }
            let parent = &node.value["parent"];
            current = parent
                .get("block_id")
                .or_else(|| parent.get("page_id"))
                .and_then(Value::as_str)?
                .to_string();
        }
        None
    }

    fn touch_page(&mut self, id: &str) {
        if let Some(page) = self.page_of(id) {
            let now = self.tick();
            if let Some(node) = self.nodes.get_mut(&page) {
                node.value["last_edited_time"] = json!(now);
            }
        }
    }

    fn get_page(&self, id: &str) -> HttpResponse {
        match self.nodes.get(id) {
            Some(node) if node.value["object"] == "page" => ok(node.value.clone()),
            _ => not_found(id),
        }
    }

    fn post_page(&mut self, body: &Value) -> HttpResponse {
        let children = body
            .get("children")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if let Err(response) = validate_children(&children) {
            return response;
        }
        let parent = body.get("parent").cloned().unwrap_or(Value::Null);
        if let Some(db) = parent.get("database_id").and_then(Value::as_str) {
            if !self.databases.contains_key(db) {
                return not_found(db);
            }
        }
        let properties = body.get("properties").cloned().unwrap_or(Value::Null);
        let id = self.create_page(&parent, &properties);
        for child in children {
            self.insert_block(&id, child);
        }
        self.get_page(&id)
    }

    fn update_page(&mut self, id: &str, body: &Value) -> HttpResponse {
        let now = self.tick();
        match self.nodes.get_mut(id) {
            Some(node) if node.value["object"] == "page" && !node.archived => {
                if let Some(props) = body.get("properties") {
                    merge_properties(&mut node.value, props);
                }
                node.value["last_edited_time"] = json!(now);
                ok(node.value.clone())
            }
            _ => not_found(id),
        }
    }

    fn append(&mut self, id: &str, body: &Value) -> HttpResponse {
        if !self.nodes.get(id).is_some_and(|n| !n.archived) {
            return not_found(id);
        }
        let children = body
            .get("children")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if let Err(response) = validate_children(&children) {
            return response;
        }
        let ids: Vec<String> = children
            .into_iter()
            .map(|child| self.insert_block(id, child))
            .collect();
        self.touch_page(id);
        let results: Vec<Value> = ids
            .iter()
            .filter_map(|c| self.nodes.get(c).map(|n| n.value.clone()))
            .collect();
        ok(json!({ "object": "list", "results": results, "has_more": false, "next_cursor": null }))
    }

    fn delete(&mut self, id: &str) -> HttpResponse {
        let value = match self.nodes.get_mut(id) {
            Some(node) if !node.archived => {
                node.archived = true;
                node.value["archived"] = json!(true);
                node.value.clone()
            }
            Some(_) => return error(400, "validation_error", "block is archived"),
            None => return not_found(id),
        };
        self.touch_page(id);
        ok(value)
    }

    fn list_children(&self, id: &str, query: &str) -> HttpResponse {
        if !self.nodes.contains_key(id) {
            return not_found(id);
        }
        let items: Vec<Value> = self
            .live_children(id)
            .iter()
            .filter_map(|c| self.nodes.get(c).map(|n| n.value.clone()))
            .collect();
        let cursor = query.split('&').find_map(|kv| kv.strip_prefix("start_cursor="));
        self.paged(items, cursor)
    }

    fn query(&self, database_id: &str, body: &Value) -> HttpResponse {
        if !self.databases.contains_key(database_id) {
            return not_found(database_id);
        }
        let filter = body.get("filter");
        let mut rows: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| !n.archived && n.value["parent"]["database_id"] == database_id)
            .filter(|n| filter.map_or(true, |f| matches_filter(&n.value, f)))
            .collect();
        rows.sort_by(|a, b| a.value["created_time"].as_str().cmp(&b.value["created_time"].as_str()));
        let items = rows.into_iter().map(|n| n.value.clone()).collect();
        self.paged(items, body.get("start_cursor").and_then(Value::as_str))
    }

    fn search(&self, body: &Value) -> HttpResponse {
        let query = body
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let kind = body
            .get("filter")
            .and_then(|f| f.get("value"))
            .and_then(Value::as_str);
        let mut items: Vec<Value> = Vec::new();
        if kind != Some("database") {
            items.extend(
                self.nodes
                    .values()
                    .filter(|n| !n.archived && n.value["object"] == "page")
                    .filter(|n| page_title(&n.value).to_lowercase().contains(&query))
                    .map(|n| n.value.clone()),
            );
        }
        if kind != Some("page") {
            items.extend(
                self.databases
                    .values()
                    .filter(|db| database_title(db).to_lowercase().contains(&query))
                    .cloned(),
            );
        }
        items.sort_by(|a, b| a["created_time"].as_str().cmp(&b["created_time"].as_str()));
        self.paged(items, body.get("start_cursor").and_then(Value::as_str))
    }

    fn paged(&self, items: Vec<Value>, cursor: Option<&str>) -> HttpResponse {
        let start = cursor
            .and_then(|c| items.iter().position(|item| item["id"] == c))
            .unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        let next = items.get(end).and_then(|item| item["id"].as_str()).map(str::to_string);
        ok(json!({
            "object": "list",
            "results": items[start..end].to_vec(),
            "has_more": next.is_some(),
            "next_cursor": next,
        }))
    }
}

fn validate_children(children: &[Value]) -> Result<(), HttpResponse> {
    if children.len() > MAX_BATCH {
        return Err(error(
            400,
            "validation_error",
            &format!("body.children.length should be ≤ {MAX_BATCH}"),
        ));
    }
    for child in children {
        validate_block(child, 1)?;
    }
    Ok(())
}

fn validate_block(block: &Value, level: usize) -> Result<(), HttpResponse> {
    let kind = block.get("type").and_then(Value::as_str).unwrap_or_default();
    let payload = &block[kind];
    let runs = payload
        .get("rich_text")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();
    for run in runs {
        let len = run["text"]["content"].as_str().map_or(0, |s| s.chars().count());
        if len > MAX_TEXT_RUN_CHARS {
            return Err(error(
                400,
                "validation_error",
                &format!("text.content.length should be ≤ {MAX_TEXT_RUN_CHARS}"),
            ));
        }
    }
    if let Some(children) = payload.get("children").and_then(Value::as_array) {
        if level >= MAX_NESTING && !children.is_empty() {
            return Err(error(400, "validation_error", "children nested too deeply"));
        }
        for child in children {
            validate_block(child, level + 1)?;
        }
    }
    Ok(())
}

fn matches_filter(page: &Value, filter: &Value) -> bool {
    let Some(property) = filter.get("property").and_then(Value::as_str) else {
        return true;
    };
    let Some(wanted) = filter
        .get("title")
        .and_then(|t| t.get("equals"))
        .and_then(Value::as_str)
    else {
        return true;
    };
    let prop = &page["properties"][property];
    runs_text(&prop["title"]) == wanted
}

fn merge_properties(page: &mut Value, properties: &Value) {
    let Some(props) = properties.as_object() else {
        return;
    };
    for (name, prop) in props {
        let mut prop = prop.clone();
        let kind = ["title", "rich_text", "select", "status", "multi_select", "date", "url", "number", "checkbox"]
            .into_iter()
            .find(|k| prop.get(*k).is_some());
        if let (Some(kind), Some(map)) = (kind, prop.as_object_mut()) {
            map.insert("type".into(), json!(kind));
            if let Some(Value::Array(runs)) = map.get_mut(kind) {
                for run in runs.iter_mut() {
                    let text = run["text"]["content"].as_str().unwrap_or_default().to_string();
                    run["plain_text"] = json!(text);
                }
            }
        }
        page["properties"][name.as_str()] = prop;
    }
}

fn runs_text(runs: &Value) -> String {
    runs.as_array()
        .into_iter()
        .flatten()
        .map(|run| {
            run.get("plain_text")
                .or_else(|| run.get("text").and_then(|t| t.get("content")))
                .and_then(Value::as_str)
                .unwrap_or_default()
        })
        .collect()
}

fn page_title(page: &Value) -> String {
    page["properties"]
        .as_object()
        .into_iter()
        .flatten()
        .find(|(_, prop)| prop["type"] == "title")
        .map(|(_, prop)| runs_text(&prop["title"]))
        .unwrap_or_default()
}

fn database_title(db: &Value) -> String {
    runs_text(&db["title"])
}

fn plain_runs(text: &str) -> Value {
    json!([{ "type": "text", "text": { "content": text }, "plain_text": text }])
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn ok(body: Value) -> HttpResponse {
    HttpResponse::json(200, body.to_string())
}

fn error(status: u16, code: &str, message: &str) -> HttpResponse {
    HttpResponse::json(
        status,
        json!({ "object": "error", "status": status, "code": code, "message": message }).to_string(),
    )
}

fn not_found(id: &str) -> HttpResponse {
    error(
        404,
        "object_not_found",
        &format!("Could not find object with ID: {id}."),
    )
}
