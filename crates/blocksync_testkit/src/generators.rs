//! Property-based test generators using proptest.
//!
//! Provides strategies for generating rich text, code and blocks that
//! the converter must carry through a round trip.

use blocksync_model::{Annotations, Block, BlockKind, RichTextRun, TableBlock, TableRow};
use proptest::prelude::*;

/// Strategy for a single word of letters and digits.
pub fn word_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9]{1,12}").expect("Invalid regex")
}

/// Strategy for annotation sets, links excluded.
pub fn annotations_strategy() -> impl Strategy<Value = Annotations> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(bold, italic, strikethrough, underline, code)| Annotations {
            bold,
            italic,
            strikethrough,
            underline,
            code,
        },
    )
}

/// Strategy for one formatted run: a few words, optionally linked.
pub fn styled_run_strategy() -> impl Strategy<Value = RichTextRun> {
    (
        prop::collection::vec(word_strategy(), 1..4),
        annotations_strategy(),
        prop::option::weighted(0.2, word_strategy()),
    )
        .prop_map(|(words, annotations, link)| {
            let run = RichTextRun::styled(words.join(" "), annotations);
            match link {
                Some(path) => run.with_href(format!("https://example.com/{path}")),
                None => run,
            }
        })
}

/// Strategy for a line of runs separated by plain single spaces.
pub fn inline_runs_strategy() -> impl Strategy<Value = Vec<RichTextRun>> {
    prop::collection::vec(styled_run_strategy(), 1..6).prop_map(|runs| {
        let mut out = Vec::with_capacity(runs.len() * 2);
        for (idx, run) in runs.into_iter().enumerate() {
            if idx > 0 {
                out.push(RichTextRun::plain(" "));
            }
            out.push(run);
        }
        out
    })
}

/// Strategy for plain text full of characters that look like markup.
pub fn markup_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-z0-9 *_`~\[\]()<>/\\#|!.-]{1,40}")
        .expect("Invalid regex")
        .prop_map(|s| s.trim().to_string())
        .prop_filter("Text must not be blank", |s| !s.is_empty())
}

/// Strategy for multi-line code of varying line lengths.
pub fn code_text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::string::string_regex("[ -~]{0,120}").expect("Invalid regex"),
        1..80,
    )
    .prop_map(|lines| lines.join("\n"))
}

/// Strategy for tables of one to five columns and zero to two rows.
pub fn table_strategy() -> impl Strategy<Value = TableBlock> {
    (1usize..=5, 0usize..=2, any::<bool>()).prop_flat_map(|(width, rows, header)| {
        prop::collection::vec(prop::collection::vec(word_strategy(), width), rows)
            .prop_map(move |rows| {
                let rows = rows.iter().map(|cells| TableRow::from_plain(cells)).collect();
                TableBlock::with_width(width, rows, header)
            })
    })
}

/// Strategy for a single text-bearing block.
pub fn text_block_strategy() -> impl Strategy<Value = Block> {
    (0u8..6, inline_runs_strategy()).prop_map(|(which, text)| {
        let kind = match which {
            0 => BlockKind::Paragraph { text },
            1 => BlockKind::Heading { level: 2, text },
            2 => BlockKind::BulletedItem { text },
            3 => BlockKind::NumberedItem { text },
            4 => BlockKind::Todo {
                text,
                checked: true,
            },
            _ => BlockKind::Quote { text },
        };
        Block::new(kind)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_inline_runs_alternate(runs in inline_runs_strategy()) {
            for (idx, run) in runs.iter().enumerate() {
                if idx % 2 == 1 {
                    prop_assert_eq!(run.text.as_str(), " ");
                } else {
                    prop_assert!(!run.text.trim().is_empty());
                }
            }
        }

        #[test]
        fn test_tables_are_rectangular(table in table_strategy()) {
            prop_assert!(table.rows().iter().all(|row| row.cells.len() == table.width()));
        }
    }
}
