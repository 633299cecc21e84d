//! Block tree nodes.

use crate::rich_text::{plain_text, RichTextRun};
use crate::table::TableBlock;

/// Variant-specific payload of a [`Block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Plain paragraph.
    Paragraph {
        /// Inline content.
        text: Vec<RichTextRun>,
    },
    /// Heading of level 1 to 3.
    Heading {
        /// Heading level, clamped to 1..=3.
        level: u8,
        /// Inline content.
        text: Vec<RichTextRun>,
    },
    /// Bulleted list item.
    BulletedItem {
        /// Inline content.
        text: Vec<RichTextRun>,
    },
    /// Numbered list item. Ordinals are not tracked.
    NumberedItem {
        /// Inline content.
        text: Vec<RichTextRun>,
    },
    /// Checkbox item.
    Todo {
        /// Inline content.
        text: Vec<RichTextRun>,
        /// Whether the box is ticked.
        checked: bool,
    },
    /// Block quote.
    Quote {
        /// Inline content.
        text: Vec<RichTextRun>,
    },
    /// Highlighted callout with an optional emoji icon.
    Callout {
        /// Inline content.
        text: Vec<RichTextRun>,
        /// Emoji icon.
        icon: Option<String>,
    },
    /// Fenced code.
    Code {
        /// Normalized language name.
        language: String,
        /// Source text.
        text: String,
    },
    /// Horizontal rule.
    Divider,
    /// Table with its rows.
    Table(TableBlock),
    /// Image referenced by URL.
    Image {
        /// Image source.
        url: String,
        /// Caption.
        caption: Vec<RichTextRun>,
    },
    /// Link preview.
    Bookmark {
        /// Target URL.
        url: String,
        /// Caption.
        caption: Vec<RichTextRun>,
    },
    /// Block-level math expression.
    Equation {
        /// Expression source.
        expression: String,
    },
    /// Collapsible container whose children hold the body.
    Toggle {
        /// Summary line.
        text: Vec<RichTextRun>,
    },
    /// Column layout container.
    ColumnList,
    /// One column of a [`BlockKind::ColumnList`].
    Column,
    /// Synced content container.
    SyncedBlock,
    /// Reference to a nested page.
    ChildPage {
        /// Title of the nested page.
        title: String,
    },
    /// Reference to a nested database.
    ChildDatabase {
        /// Title of the nested database.
        title: String,
    },
    /// A block type this crate does not model.
    Unsupported {
        /// The remote type name.
        raw_type: String,
    },
}

impl BlockKind {
    /// Returns the remote type name of this kind.
    pub fn type_name(&self) -> &str {
        match self {
            BlockKind::Paragraph { .. } => "paragraph",
            BlockKind::Heading { level: 1, .. } => "heading_1",
            BlockKind::Heading { level: 2, .. } => "heading_2",
            BlockKind::Heading { .. } => "heading_3",
            BlockKind::BulletedItem { .. } => "bulleted_list_item",
            BlockKind::NumberedItem { .. } => "numbered_list_item",
            BlockKind::Todo { .. } => "to_do",
            BlockKind::Quote { .. } => "quote",
            BlockKind::Callout { .. } => "callout",
            BlockKind::Code { .. } => "code",
            BlockKind::Divider => "divider",
            BlockKind::Table(_) => "table",
            BlockKind::Image { .. } => "image",
            BlockKind::Bookmark { .. } => "bookmark",
            BlockKind::Equation { .. } => "equation",
            BlockKind::Toggle { .. } => "toggle",
            BlockKind::ColumnList => "column_list",
            BlockKind::Column => "column",
            BlockKind::SyncedBlock => "synced_block",
            BlockKind::ChildPage { .. } => "child_page",
            BlockKind::ChildDatabase { .. } => "child_database",
            BlockKind::Unsupported { raw_type } => raw_type,
        }
    }

    /// Returns the inline content of text-bearing kinds.
    pub fn rich_text(&self) -> Option<&[RichTextRun]> {
        match self {
            BlockKind::Paragraph { text }
            | BlockKind::Heading { text, .. }
            | BlockKind::BulletedItem { text }
            | BlockKind::NumberedItem { text }
            | BlockKind::Todo { text, .. }
            | BlockKind::Quote { text }
            | BlockKind::Callout { text, .. }
            | BlockKind::Toggle { text } => Some(text),
            _ => None,
        }
    }

    /// Returns true for layout containers that only carry children.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            BlockKind::ColumnList | BlockKind::Column | BlockKind::SyncedBlock
        )
    }
}

/// One node of a document's content tree.
///
/// `children` is `None` when the children were not fetched (the block
/// sits beyond the fetch depth) or when the block has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Remote id, absent for locally parsed blocks.
    pub id: Option<String>,
    /// Variant payload.
    pub kind: BlockKind,
    /// Whether the remote reported nested children.
    pub has_children: bool,
    /// Nested children, if populated.
    pub children: Option<Vec<Block>>,
}

impl Block {
    /// Creates a childless block.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: None,
            kind,
            has_children: false,
            children: None,
        }
    }

    /// Attaches children, leaving the block childless when the list is empty.
    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        if children.is_empty() {
            self.has_children = false;
            self.children = None;
        } else {
            self.has_children = true;
            self.children = Some(children);
        }
        self
    }

    /// Sets the remote id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Creates a paragraph.
    pub fn paragraph(text: Vec<RichTextRun>) -> Self {
        Self::new(BlockKind::Paragraph { text })
    }

    /// Creates a heading, clamping the level to 1..=3.
    pub fn heading(level: u8, text: Vec<RichTextRun>) -> Self {
        Self::new(BlockKind::Heading {
            level: level.clamp(1, 3),
            text,
        })
    }

    /// Creates a code block.
    pub fn code(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(BlockKind::Code {
            language: language.into(),
            text: text.into(),
        })
    }

    /// Returns the populated children, or an empty slice.
    pub fn children(&self) -> &[Block] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Returns the plain text of this block alone, excluding children.
    pub fn plain_text(&self) -> String {
        match &self.kind {
            BlockKind::Code { text, .. } => text.clone(),
            BlockKind::Equation { expression } => expression.clone(),
            BlockKind::Image { caption, .. } | BlockKind::Bookmark { caption, .. } => {
                plain_text(caption)
            }
            BlockKind::ChildPage { title } | BlockKind::ChildDatabase { title } => title.clone(),
            BlockKind::Table(table) => table
                .rows()
                .iter()
                .flat_map(|row| row.cells.iter())
                .map(|cell| plain_text(cell))
                .collect::<Vec<_>>()
                .join(" "),
            kind => kind.rich_text().map(plain_text).unwrap_or_default(),
        }
    }

    /// Returns true for an empty paragraph.
    pub fn is_empty_paragraph(&self) -> bool {
        matches!(&self.kind, BlockKind::Paragraph { text } if plain_text(text).trim().is_empty())
            && self.children().is_empty()
    }

    /// Counts this block and every populated descendant.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(Block::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_level_is_clamped() {
        let block = Block::heading(7, vec![RichTextRun::plain("x")]);
        assert_eq!(block.kind.type_name(), "heading_3");
        let block = Block::heading(0, vec![]);
        assert_eq!(block.kind.type_name(), "heading_1");
    }

    #[test]
    fn with_children_tracks_has_children() {
        let parent = Block::paragraph(vec![RichTextRun::plain("p")])
            .with_children(vec![Block::new(BlockKind::Divider)]);
        assert!(parent.has_children);
        assert_eq!(parent.children().len(), 1);
        assert_eq!(parent.count(), 2);

        let empty = Block::new(BlockKind::Divider).with_children(Vec::new());
        assert!(!empty.has_children);
        assert!(empty.children.is_none());
    }

    #[test]
    fn empty_paragraph_detection() {
        assert!(Block::paragraph(vec![RichTextRun::plain("  ")]).is_empty_paragraph());
        assert!(!Block::paragraph(vec![RichTextRun::plain("x")]).is_empty_paragraph());
        assert!(!Block::new(BlockKind::Divider).is_empty_paragraph());
    }

    #[test]
    fn unsupported_keeps_raw_type() {
        let kind = BlockKind::Unsupported {
            raw_type: "embed".into(),
        };
        assert_eq!(kind.type_name(), "embed");
        assert!(kind.rich_text().is_none());
    }
}
