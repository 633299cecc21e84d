//! JSON wire mapping for the remote block API.
//!
//! Decoding builds blocks bottom-up: callers fetch a block's children
//! first and pass them in, so no decoded value is mutated afterwards.
//! Encoding respects the API's write limits: text runs of at most
//! [`MAX_TEXT_RUN_CHARS`] characters and [`MAX_NESTING`] levels of
//! children per request.

use crate::block::{Block, BlockKind};
use crate::document::{ParentRef, RemoteDocument};
use crate::error::{ModelError, ModelResult};
use crate::rich_text::{plain_text, Annotations, RichTextRun};
use crate::table::{TableBlock, TableRow};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

/// Maximum characters of one rich text run on write.
pub const MAX_TEXT_RUN_CHARS: usize = 2000;

/// Levels of children a single write request may carry.
pub const MAX_NESTING: usize = 2;

/// Returns the `type` of a wire block, or an empty string.
pub fn block_type(value: &Value) -> &str {
    value.get("type").and_then(Value::as_str).unwrap_or("")
}

/// Returns the `id` of a wire object.
pub fn object_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

/// Returns the `has_children` flag of a wire block.
pub fn has_children(value: &Value) -> bool {
    value
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Returns true if a wire object is archived or trashed.
pub fn is_archived(value: &Value) -> bool {
    let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
    flag("archived") || flag("in_trash")
}

/// Decodes a rich text array. A missing array yields no runs.
pub fn decode_rich_text(value: Option<&Value>) -> Vec<RichTextRun> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items.iter().filter_map(decode_run).collect()
}

fn decode_run(value: &Value) -> Option<RichTextRun> {
    let text = value
        .get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| {
            value
                .get("text")
                .and_then(|t| t.get("content"))
                .and_then(Value::as_str)
        })?
        .to_string();
    let href = value
        .get("href")
        .and_then(Value::as_str)
        .or_else(|| {
            value
                .get("text")
                .and_then(|t| t.get("link"))
                .and_then(|l| l.get("url"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);
    let flag = |name: &str| {
        value
            .get("annotations")
            .and_then(|a| a.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    Some(RichTextRun {
        text,
        annotations: Annotations {
            bold: flag("bold"),
            italic: flag("italic"),
            strikethrough: flag("strikethrough"),
            underline: flag("underline"),
            code: flag("code"),
        },
        href,
    })
}

/// Encodes runs, splitting any run longer than [`MAX_TEXT_RUN_CHARS`].
pub fn encode_rich_text(runs: &[RichTextRun]) -> Value {
    let mut out = Vec::new();
    for run in runs {
        for chunk in chunk_chars(&run.text, MAX_TEXT_RUN_CHARS) {
            let link = match &run.href {
                Some(url) => json!({ "url": url }),
                None => Value::Null,
            };
            out.push(json!({
                "type": "text",
                "text": { "content": chunk, "link": link },
                "annotations": {
                    "bold": run.annotations.bold,
                    "italic": run.annotations.italic,
                    "strikethrough": run.annotations.strikethrough,
                    "underline": run.annotations.underline,
                    "code": run.annotations.code,
                    "color": "default"
                }
            }));
        }
    }
    Value::Array(out)
}

fn chunk_chars(text: &str, limit: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == limit {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);
    chunks
}

/// Decodes one wire block with its already-decoded children.
///
/// Unknown types decode to [`BlockKind::Unsupported`]. A `table` decodes
/// with no rows; use [`decode_table`] when its rows were fetched.
pub fn decode_block(value: &Value, children: Option<Vec<Block>>) -> ModelResult<Block> {
    let kind_name = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::MissingField("type".into()))?;
    let payload = value.get(kind_name).unwrap_or(&Value::Null);
    let text = || decode_rich_text(payload.get("rich_text"));
    let string = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let kind = match kind_name {
        "paragraph" => BlockKind::Paragraph { text: text() },
        "heading_1" => BlockKind::Heading { level: 1, text: text() },
        "heading_2" => BlockKind::Heading { level: 2, text: text() },
        "heading_3" => BlockKind::Heading { level: 3, text: text() },
        "bulleted_list_item" => BlockKind::BulletedItem { text: text() },
        "numbered_list_item" => BlockKind::NumberedItem { text: text() },
        "to_do" => BlockKind::Todo {
            text: text(),
            checked: payload
                .get("checked")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        "quote" => BlockKind::Quote { text: text() },
        "callout" => BlockKind::Callout {
            text: text(),
            icon: payload
                .get("icon")
                .and_then(|icon| icon.get("emoji"))
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        "code" => BlockKind::Code {
            language: string("language"),
            text: plain_text(&text()),
        },
        "divider" => BlockKind::Divider,
        "table" => BlockKind::Table(empty_table(payload)),
        "image" => {
            let source = payload.get("type").and_then(Value::as_str).unwrap_or("external");
            BlockKind::Image {
                url: payload
                    .get(source)
                    .and_then(|s| s.get("url"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                caption: decode_rich_text(payload.get("caption")),
            }
        }
        "bookmark" => BlockKind::Bookmark {
            url: string("url"),
            caption: decode_rich_text(payload.get("caption")),
        },
        "equation" => BlockKind::Equation {
            expression: string("expression"),
        },
        "toggle" => BlockKind::Toggle { text: text() },
        "column_list" => BlockKind::ColumnList,
        "column" => BlockKind::Column,
        "synced_block" => BlockKind::SyncedBlock,
        "child_page" => BlockKind::ChildPage {
            title: string("title"),
        },
        "child_database" => BlockKind::ChildDatabase {
            title: string("title"),
        },
        other => BlockKind::Unsupported {
            raw_type: other.to_string(),
        },
    };

    Ok(Block {
        id: object_id(value).map(str::to_string),
        kind,
        has_children: has_children(value),
        children,
    })
}

fn empty_table(payload: &Value) -> TableBlock {
    let width = payload
        .get("table_width")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let header = payload
        .get("has_column_header")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    TableBlock::with_width(width, Vec::new(), header)
}

/// Decodes a table block with its fetched rows.
///
/// Rows are padded to the table width; a table reporting no width takes
/// the width of its widest row.
pub fn decode_table(value: &Value, rows: Vec<TableRow>) -> ModelResult<Block> {
    let payload = value
        .get("table")
        .ok_or_else(|| ModelError::MissingField("table".into()))?;
    let declared = empty_table(payload);
    let table = if declared.width() == 0 {
        TableBlock::new(rows, declared.has_header_row())
    } else {
        TableBlock::with_width(declared.width(), rows, declared.has_header_row())
    };
    Ok(Block {
        id: object_id(value).map(str::to_string),
        kind: BlockKind::Table(table),
        has_children: has_children(value),
        children: None,
    })
}

/// Decodes one `table_row` block.
pub fn decode_table_row(value: &Value) -> ModelResult<TableRow> {
    let cells = value
        .get("table_row")
        .and_then(|row| row.get("cells"))
        .and_then(Value::as_array)
        .ok_or_else(|| ModelError::MissingField("table_row.cells".into()))?;
    Ok(TableRow::new(
        cells.iter().map(|cell| decode_rich_text(Some(cell))).collect(),
    ))
}

/// Decodes page or database metadata.
pub fn decode_document(value: &Value) -> ModelResult<RemoteDocument> {
    let id = object_id(value)
        .ok_or_else(|| ModelError::MissingField("id".into()))?
        .to_string();
    let last_edited_time = parse_time(value, "last_edited_time")?
        .ok_or_else(|| ModelError::MissingField("last_edited_time".into()))?;
    let created_time = parse_time(value, "created_time")?;
    let properties = value
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let title = if value.get("object").and_then(Value::as_str) == Some("database") {
        plain_text(&decode_rich_text(value.get("title")))
    } else {
        title_from_properties(&properties)
    };

    Ok(RemoteDocument {
        id,
        url: value.get("url").and_then(Value::as_str).map(str::to_string),
        title,
        created_time,
        last_edited_time,
        archived: is_archived(value),
        parent: decode_parent(value.get("parent")),
        properties,
    })
}

fn title_from_properties(properties: &Map<String, Value>) -> String {
    properties
        .values()
        .find(|prop| prop.get("type").and_then(Value::as_str) == Some("title"))
        .map(|prop| plain_text(&decode_rich_text(prop.get("title"))))
        .unwrap_or_default()
}

fn decode_parent(value: Option<&Value>) -> ParentRef {
    let Some(parent) = value else {
        return ParentRef::Workspace;
    };
    let id = |key: &str| {
        parent
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    match parent.get("type").and_then(Value::as_str) {
        Some("database_id") => ParentRef::Database(id("database_id")),
        Some("page_id") => ParentRef::Page(id("page_id")),
        Some("block_id") => ParentRef::Block(id("block_id")),
        _ => ParentRef::Workspace,
    }
}

fn parse_time(value: &Value, field: &str) -> ModelResult<Option<DateTime<Utc>>> {
    match value.get(field).and_then(Value::as_str) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| ModelError::invalid_field(field, e.to_string())),
    }
}

/// Encodes blocks for a create or append request.
///
/// Layout containers are replaced by their children. Kinds the API
/// cannot create (child pages, unsupported) are skipped, but their
/// children are kept. Children deeper than [`MAX_NESTING`] are emitted
/// as following siblings at the deepest allowed level.
pub fn encode_blocks(blocks: &[Block]) -> Vec<Value> {
    encode_level(blocks, 1)
}

fn encode_level(blocks: &[Block], depth: usize) -> Vec<Value> {
    let mut out = Vec::new();
    for block in blocks {
        encode_into(block, depth, &mut out);
    }
    out
}

fn encode_into(block: &Block, depth: usize, out: &mut Vec<Value>) {
    let children = block.children();
    let Some(mut value) = encode_payload(&block.kind) else {
        for child in children {
            encode_into(child, depth, out);
        }
        return;
    };

    if children.is_empty() {
        out.push(value);
        return;
    }

    if depth < MAX_NESTING && accepts_children(&block.kind) {
        let nested = encode_level(children, depth + 1);
        let nested_table = depth + 1 == MAX_NESTING && nested.iter().any(|v| block_type(v) == "table");
        if !nested_table {
            let kind_name = block.kind.type_name().to_string();
            if let Some(payload) = value.get_mut(&kind_name).and_then(Value::as_object_mut) {
                payload.insert("children".into(), Value::Array(nested));
            }
            out.push(value);
            return;
        }
    }

    out.push(value);
    for child in children {
        encode_into(child, depth, out);
    }
}

fn accepts_children(kind: &BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::Paragraph { .. }
            | BlockKind::BulletedItem { .. }
            | BlockKind::NumberedItem { .. }
            | BlockKind::Todo { .. }
            | BlockKind::Quote { .. }
            | BlockKind::Callout { .. }
            | BlockKind::Toggle { .. }
    )
}

fn encode_payload(kind: &BlockKind) -> Option<Value> {
    let payload = match kind {
        BlockKind::Paragraph { text }
        | BlockKind::Heading { text, .. }
        | BlockKind::BulletedItem { text }
        | BlockKind::NumberedItem { text }
        | BlockKind::Quote { text }
        | BlockKind::Toggle { text } => json!({ "rich_text": encode_rich_text(text) }),
        BlockKind::Todo { text, checked } => {
            json!({ "rich_text": encode_rich_text(text), "checked": checked })
        }
        BlockKind::Callout { text, icon } => {
            let mut payload = json!({ "rich_text": encode_rich_text(text) });
            if let (Some(icon), Some(map)) = (icon, payload.as_object_mut()) {
                map.insert("icon".into(), json!({ "type": "emoji", "emoji": icon }));
            }
            payload
        }
        BlockKind::Code { language, text } => json!({
            "rich_text": encode_rich_text(&[RichTextRun::plain(text.as_str())]),
            "language": language
        }),
        BlockKind::Divider => json!({}),
        BlockKind::Table(table) if table.is_empty() => return None,
        BlockKind::Table(table) => json!({
            "table_width": table.width(),
            "has_column_header": table.has_header_row(),
            "has_row_header": false,
            "children": table.rows().iter().map(encode_table_row).collect::<Vec<_>>()
        }),
        BlockKind::Image { url, caption } => json!({
            "type": "external",
            "external": { "url": url },
            "caption": encode_rich_text(caption)
        }),
        BlockKind::Bookmark { url, caption } => json!({
            "url": url,
            "caption": encode_rich_text(caption)
        }),
        BlockKind::Equation { expression } => json!({ "expression": expression }),
        BlockKind::ColumnList
        | BlockKind::Column
        | BlockKind::SyncedBlock
        | BlockKind::ChildPage { .. }
        | BlockKind::ChildDatabase { .. }
        | BlockKind::Unsupported { .. } => return None,
    };
    let kind_name = kind.type_name();
    Some(json!({
        "object": "block",
        "type": kind_name,
        kind_name: payload
    }))
}

fn encode_table_row(row: &TableRow) -> Value {
    json!({
        "object": "block",
        "type": "table_row",
        "table_row": {
            "cells": row.cells.iter().map(|cell| encode_rich_text(cell)).collect::<Vec<_>>()
        }
    })
}
