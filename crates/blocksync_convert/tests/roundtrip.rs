//! Round-trip tests for the markdown converter.

use blocksync_convert::{
    blocks_to_markdown, markdown_to_blocks, parse_inline, render_inline, split_code,
    MAX_CODE_CHARS,
};
use blocksync_model::{Block, BlockKind, RichTextRun};
use blocksync_testkit::prelude::*;
use proptest::prelude::*;

fn normalize(markdown: &str) -> String {
    blocks_to_markdown(&markdown_to_blocks(markdown))
}

fn merged(runs: Vec<RichTextRun>) -> Vec<RichTextRun> {
    let mut out: Vec<RichTextRun> = Vec::new();
    for run in runs {
        match out.last_mut() {
            Some(last) if last.same_format(&run) => last.text.push_str(&run.text),
            _ => out.push(run),
        }
    }
    out
}

#[test]
fn fixtures_reach_a_fixed_point() {
    for (name, markdown) in MARKDOWN_FIXTURES {
        let once = normalize(markdown);
        let twice = normalize(&once);
        assert_eq!(once, twice, "fixture {name} is not stable");
    }
}

#[test]
fn table_shapes_reach_a_fixed_point() {
    for markdown in table_fixtures() {
        let once = normalize(&markdown);
        assert_eq!(once, markdown);
        assert_eq!(normalize(&once), once);
    }
}

#[test]
fn canonical_fixtures_render_unchanged() {
    for name in [
        "headings",
        "lists",
        "quote",
        "code_with_language",
        "code_without_language",
        "divider",
        "equation",
        "image",
        "markers",
        "escaped_block_starts",
        "toggle",
    ] {
        let markdown = markdown_fixture(name);
        assert_eq!(normalize(markdown), markdown, "fixture {name} changed");
    }
}

#[test]
fn mixed_document_structure() {
    let blocks = markdown_to_blocks(markdown_fixture("mixed_document"));
    let kinds: Vec<&str> = blocks.iter().map(|b| b.kind.type_name()).collect();
    assert_eq!(
        kinds,
        vec![
            "heading_1",
            "paragraph",
            "heading_2",
            "numbered_list_item",
            "numbered_list_item",
            "numbered_list_item",
            "table",
            "quote",
            "divider",
            "paragraph",
        ]
    );
    assert_eq!(blocks[4].children().len(), 2);
    let BlockKind::Table(table) = &blocks[6].kind else {
        panic!("expected a table");
    };
    assert_eq!(table.width(), 3);
    assert_eq!(table.rows().len(), 3);
    assert!(table.has_header_row());
}

#[test]
fn no_text_is_lost() {
    let markdown = markdown_fixture("inline");
    let blocks = markdown_to_blocks(markdown);
    let text: String = blocks.iter().map(Block::plain_text).collect::<Vec<_>>().join("\n");
    assert!(text.contains("Some bold, italic, code, struck and underlined text."));
    assert!(text.contains("Escaped *stars* and a snake_case_name stay literal."));
}

#[test]
fn blank_lines_inside_tables_are_ignored() {
    let blocks = markdown_to_blocks("| a | b |\n\n|---|---|\n\n| 1 | 2 |\n");
    assert_eq!(blocks.len(), 1);
    let BlockKind::Table(table) = &blocks[0].kind else {
        panic!("expected a table");
    };
    assert_eq!(table.rows().len(), 2);
}

#[test]
fn awkward_remote_text_survives_a_round_trip() {
    let text = |s: &str| vec![RichTextRun::plain(s)];
    let blocks = vec![
        Block::new(BlockKind::Toggle { text: text("s") }).with_children(vec![
            Block::paragraph(text("end </details>")),
            Block::paragraph(text("</details>")),
        ]),
        Block::paragraph(text("after")),
        Block::new(BlockKind::Equation {
            expression: "a\n$$\nb".into(),
        }),
        Block::paragraph(vec![RichTextRun::plain("x").with_href("http://a/b)c")]),
        Block::new(BlockKind::BulletedItem {
            text: text("first line\nsecond line"),
        }),
        Block::new(BlockKind::NumberedItem {
            text: text("one\n2. two"),
        }),
        Block::new(BlockKind::Todo {
            text: text("task\nnotes"),
            checked: true,
        }),
    ];
    let markdown = blocks_to_markdown(&blocks);
    assert_eq!(markdown_to_blocks(&markdown), blocks);
    assert_eq!(normalize(&markdown), markdown);
}

proptest! {
    #[test]
    fn code_split_preserves_text(text in code_text_strategy()) {
        let blocks = split_code(&text, "python");
        let joined = blocks.iter().map(Block::plain_text).collect::<Vec<_>>().join("\n");
        prop_assert_eq!(joined, text);
        for block in &blocks {
            prop_assert!(block.plain_text().chars().count() <= MAX_CODE_CHARS);
        }
    }

    #[test]
    fn code_blocks_survive_rendering(text in code_text_strategy()) {
        let blocks = split_code(&text, "python");
        let reparsed = markdown_to_blocks(&blocks_to_markdown(&blocks));
        prop_assert_eq!(reparsed, blocks);
    }

    #[test]
    fn styled_runs_round_trip(runs in inline_runs_strategy()) {
        let rendered = render_inline(&runs);
        prop_assert_eq!(parse_inline(&rendered), merged(runs));
    }

    #[test]
    fn markup_characters_stay_literal(text in markup_text_strategy()) {
        let rendered = render_inline(&[RichTextRun::plain(text.as_str())]);
        prop_assert_eq!(parse_inline(&rendered), vec![RichTextRun::plain(text.as_str())]);
    }

    #[test]
    fn paragraphs_of_markup_stay_paragraphs(text in markup_text_strategy()) {
        let block = Block::paragraph(vec![RichTextRun::plain(text.as_str())]);
        let reparsed = markdown_to_blocks(&blocks_to_markdown(&[block.clone()]));
        prop_assert_eq!(reparsed, vec![block]);
    }

    #[test]
    fn text_blocks_reach_a_fixed_point(block in text_block_strategy()) {
        let once = normalize(&blocks_to_markdown(&[block]));
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn tables_round_trip(table in table_strategy().prop_filter("needs rows", |t| !t.is_empty())) {
        let block = Block::new(BlockKind::Table(table));
        let reparsed = markdown_to_blocks(&blocks_to_markdown(&[block.clone()]));
        prop_assert_eq!(reparsed, vec![block]);
    }
}
