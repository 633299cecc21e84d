//! Remote document metadata.

use crate::block::Block;
use crate::id::compact_id;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// Where a remote document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// Row of a database.
    Database(String),
    /// Sub-page of a page.
    Page(String),
    /// Nested under a block.
    Block(String),
    /// Top level of the workspace.
    Workspace,
}

impl ParentRef {
    /// Returns the wire form used in create requests.
    pub fn to_wire(&self) -> Value {
        match self {
            ParentRef::Database(id) => json!({ "database_id": id }),
            ParentRef::Page(id) => json!({ "page_id": id }),
            ParentRef::Block(id) => json!({ "block_id": id }),
            ParentRef::Workspace => json!({ "workspace": true }),
        }
    }

    /// Returns true if this parent is the database with the given id.
    ///
    /// Ids compare equal with or without dashes.
    pub fn is_database(&self, database_id: &str) -> bool {
        matches!(self, ParentRef::Database(id) if compact_id(id) == compact_id(database_id))
    }

    /// Returns true if this parent is the page with the given id.
    pub fn is_page(&self, page_id: &str) -> bool {
        matches!(self, ParentRef::Page(id) if compact_id(id) == compact_id(page_id))
    }
}

/// Object type filter for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Pages only.
    Page,
    /// Databases only.
    Database,
}

impl ObjectType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Page => "page",
            ObjectType::Database => "database",
        }
    }
}

/// Metadata of a remote document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// Remote id.
    pub id: String,
    /// Browser URL.
    pub url: Option<String>,
    /// Title, taken from the title-typed property.
    pub title: String,
    /// Creation time.
    pub created_time: Option<DateTime<Utc>>,
    /// Last edit time.
    pub last_edited_time: DateTime<Utc>,
    /// Whether the document is archived (trashed).
    pub archived: bool,
    /// Parent location.
    pub parent: ParentRef,
    /// Raw property values keyed by property name.
    pub properties: Map<String, Value>,
}

impl RemoteDocument {
    /// Returns the plain-text value of a property, if it has one.
    ///
    /// Text-like, select, status, date, url, number and checkbox
    /// properties are supported. Empty values read as `None`.
    pub fn property_text(&self, name: &str) -> Option<String> {
        let prop = self.properties.get(name)?;
        let kind = prop.get("type").and_then(Value::as_str)?;
        let text = match kind {
            "title" | "rich_text" => prop
                .get(kind)
                .and_then(Value::as_array)
                .map(|runs| {
                    runs.iter()
                        .filter_map(|run| run.get("plain_text").and_then(Value::as_str))
                        .collect::<String>()
                }),
            "select" | "status" => prop
                .get(kind)
                .and_then(|v| v.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            "multi_select" => prop.get(kind).and_then(Value::as_array).map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(", ")
            }),
            "date" => prop
                .get(kind)
                .and_then(|v| v.get("start"))
                .and_then(Value::as_str)
                .map(str::to_string),
            "url" | "email" | "phone_number" | "created_time" | "last_edited_time" => {
                prop.get(kind).and_then(Value::as_str).map(str::to_string)
            }
            "number" => prop.get(kind).and_then(Value::as_f64).map(|n| n.to_string()),
            "checkbox" => prop.get(kind).and_then(Value::as_bool).map(|b| b.to_string()),
            _ => None,
        }?;
        let text = text.trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// A document together with its full content tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTree {
    /// Document metadata.
    pub document: RemoteDocument,
    /// Top-level blocks in order.
    pub blocks: Vec<Block>,
}

impl DocumentTree {
    /// Counts every populated block in the tree.
    pub fn block_count(&self) -> usize {
        self.blocks.iter().map(Block::count).sum()
    }
}

/// Builder for property values sent on create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    inner: Map<String, Value>,
}

impl PropertyMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a title property.
    pub fn title(self, name: &str, text: &str) -> Self {
        self.insert(name, json!({ "title": text_content(text) }))
    }

    /// Sets a rich text property.
    pub fn rich_text(self, name: &str, text: &str) -> Self {
        self.insert(name, json!({ "rich_text": text_content(text) }))
    }

    /// Sets a select property.
    pub fn select(self, name: &str, option: &str) -> Self {
        self.insert(name, json!({ "select": { "name": option } }))
    }

    /// Sets a date property from an ISO 8601 date or timestamp.
    pub fn date(self, name: &str, start: &str) -> Self {
        self.insert(name, json!({ "date": { "start": start } }))
    }

    /// Inserts a raw property value.
    pub fn insert(mut self, name: &str, value: Value) -> Self {
        self.inner.insert(name.to_string(), value);
        self
    }

    /// Returns true if no property is set.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the raw value of a property.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    /// Converts into the wire object.
    pub fn into_value(self) -> Value {
        Value::Object(self.inner)
    }
}

fn text_content(text: &str) -> Value {
    if text.is_empty() {
        json!([])
    } else {
        json!([{ "type": "text", "text": { "content": text } }])
    }
}
