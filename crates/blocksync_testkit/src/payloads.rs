//! Wire-format JSON builders.
//!
//! Values shaped like the remote API's responses, for seeding fake
//! servers and decoding tests.

use serde_json::{json, Value};

/// A plain rich text array holding `content`.
pub fn text_json(content: &str) -> Value {
    json!([{
        "type": "text",
        "text": { "content": content, "link": null },
        "plain_text": content,
        "href": null,
        "annotations": {
            "bold": false,
            "italic": false,
            "strikethrough": false,
            "underline": false,
            "code": false,
            "color": "default"
        }
    }])
}

/// A text-bearing block of the given type.
pub fn text_block_json(id: &str, kind: &str, content: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": kind,
        "has_children": false,
        "archived": false,
        kind: { "rich_text": text_json(content) }
    })
}

/// A paragraph block.
pub fn paragraph_json(id: &str, content: &str) -> Value {
    text_block_json(id, "paragraph", content)
}

/// A heading block of level 1 to 3.
pub fn heading_json(id: &str, level: u8, content: &str) -> Value {
    text_block_json(id, &format!("heading_{level}"), content)
}

/// A code block.
pub fn code_json(id: &str, language: &str, content: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "code",
        "has_children": false,
        "code": { "rich_text": text_json(content), "language": language }
    })
}

/// A table block header; rows are separate `table_row` children.
pub fn table_json(id: &str, width: usize, has_header: bool) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "table",
        "has_children": true,
        "table": {
            "table_width": width,
            "has_column_header": has_header,
            "has_row_header": false
        }
    })
}

/// A `table_row` block of plain cells.
pub fn table_row_json(id: &str, cells: &[&str]) -> Value {
    let cells: Vec<Value> = cells.iter().map(|cell| text_json(cell)).collect();
    json!({
        "object": "block",
        "id": id,
        "type": "table_row",
        "has_children": false,
        "table_row": { "cells": cells }
    })
}

/// A child page block.
pub fn child_page_json(id: &str, title: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "child_page",
        "has_children": true,
        "child_page": { "title": title }
    })
}

/// Marks a block as having children.
pub fn with_children_flag(mut block: Value) -> Value {
    if let Some(map) = block.as_object_mut() {
        map.insert("has_children".into(), Value::Bool(true));
    }
    block
}

/// A page in a database, with a `Name` title property.
pub fn database_page_json(id: &str, database_id: &str, title: &str, last_edited: &str) -> Value {
    json!({
        "object": "page",
        "id": id,
        "url": format!("https://www.notion.so/{}", id.replace('-', "")),
        "created_time": last_edited,
        "last_edited_time": last_edited,
        "archived": false,
        "parent": { "type": "database_id", "database_id": database_id },
        "properties": {
            "Name": { "id": "title", "type": "title", "title": text_json(title) }
        }
    })
}
