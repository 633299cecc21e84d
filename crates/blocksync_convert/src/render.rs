//! Block tree to markdown renderer.

use crate::inline::{escape_text, render_inline};
use crate::language::PLAIN_TEXT;
use blocksync_model::{Block, BlockKind, RichTextRun, TableBlock};

const CHILD_INDENT: &str = "    ";
const DEFAULT_CALLOUT_ICON: &str = "💡";

/// Renders blocks as markdown.
///
/// Headings, code, tables, quotes, callouts, toggles and equations are
/// surrounded by blank lines; dividers and images get one before. Other
/// consecutive blocks are separated by a single newline. Empty blocks are
/// skipped. The output ends with a newline unless it is empty.
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut writer = Writer::default();
    writer.blocks(blocks);
    writer.out
}

#[derive(Clone, Copy)]
struct Spacing {
    before: bool,
    after: bool,
}

fn spacing(kind: &BlockKind) -> Spacing {
    let (before, after) = match kind {
        BlockKind::Heading { .. }
        | BlockKind::Code { .. }
        | BlockKind::Table(_)
        | BlockKind::Quote { .. }
        | BlockKind::Callout { .. }
        | BlockKind::Toggle { .. }
        | BlockKind::Equation { .. } => (true, true),
        BlockKind::Divider | BlockKind::Image { .. } => (true, false),
        _ => (false, false),
    };
    Spacing { before, after }
}

#[derive(Default)]
struct Writer {
    out: String,
    prev_after: Option<bool>,
}

impl Writer {
    fn blocks(&mut self, blocks: &[Block]) {
        for block in blocks {
            self.block(block);
        }
    }

    fn block(&mut self, block: &Block) {
        let kind = &block.kind;
        if kind.is_container() {
            self.blocks(block.children());
            return;
        }
        if let BlockKind::Toggle { text } = kind {
            self.push(&render_toggle(text, block.children()), spacing(kind));
            return;
        }

        let own = render_own(kind);
        let children = block.children();
        if children.is_empty() {
            self.push(&own, spacing(kind));
        } else if own.trim().is_empty() {
            self.blocks(children);
        } else if nests_children(kind) {
            let nested = indent(&blocks_to_markdown(children));
            self.push(&format!("{own}\n{nested}"), spacing(kind));
        } else {
            self.push(&own, spacing(kind));
            self.blocks(children);
        }
    }

    fn push(&mut self, markdown: &str, spacing: Spacing) {
        if markdown.trim().is_empty() {
            return;
        }
        if let Some(prev_after) = self.prev_after {
            if prev_after || spacing.before {
                self.out.push('\n');
            }
        }
        self.out.push_str(markdown.trim_end_matches('\n'));
        self.out.push('\n');
        self.prev_after = Some(spacing.after);
    }
}

fn nests_children(kind: &BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::Paragraph { .. }
            | BlockKind::BulletedItem { .. }
            | BlockKind::NumberedItem { .. }
            | BlockKind::Todo { .. }
            | BlockKind::Quote { .. }
            | BlockKind::Callout { .. }
    )
}

fn indent(markdown: &str) -> String {
    markdown
        .trim_end_matches('\n')
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{CHILD_INDENT}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_own(kind: &BlockKind) -> String {
    match kind {
        BlockKind::Paragraph { text } => text_lines("", text, true),
        BlockKind::Heading { level, text } => {
            let marker = "#".repeat(usize::from(*level));
            let line = render_inline(&single_line(text));
            format!("{marker} {line}").trim_end().to_string()
        }
        BlockKind::BulletedItem { text } => text_lines("- ", text, false),
        BlockKind::NumberedItem { text } => text_lines("1. ", text, false),
        BlockKind::Todo { text, checked } => {
            let prefix = if *checked { "- [x] " } else { "- [ ] " };
            text_lines(prefix, text, false)
        }
        BlockKind::Quote { text } => quote_lines(None, text),
        BlockKind::Callout { text, icon } => {
            quote_lines(Some(icon.as_deref().unwrap_or(DEFAULT_CALLOUT_ICON)), text)
        }
        BlockKind::Code { language, text } => render_code(language, text),
        BlockKind::Divider => "---".to_string(),
        BlockKind::Table(table) => render_table(table),
        BlockKind::Image { url, caption } => {
            let caption = escape_text(&single_line_plain(caption));
            format!("![{caption}]({url})")
        }
        BlockKind::Bookmark { url, caption } => {
            let runs: Vec<RichTextRun> = if caption.is_empty() {
                vec![RichTextRun::plain(url.as_str()).with_href(url.as_str())]
            } else {
                single_line(caption)
                    .into_iter()
                    .map(|run| run.with_href(url.as_str()))
                    .collect()
            };
            render_inline(&runs)
        }
        BlockKind::Equation { expression } => render_equation(expression),
        BlockKind::ChildPage { title } => format!("<!-- Child page: {title} -->"),
        BlockKind::ChildDatabase { title } => format!("<!-- Child database: {title} -->"),
        BlockKind::Unsupported { raw_type } => {
            format!("<!-- Unsupported block type: {raw_type} -->")
        }
        BlockKind::Toggle { .. }
        | BlockKind::ColumnList
        | BlockKind::Column
        | BlockKind::SyncedBlock => String::new(),
    }
}

/// Splits runs at newlines into one run list per line.
fn split_lines(runs: &[RichTextRun]) -> Vec<Vec<RichTextRun>> {
    let mut lines = vec![Vec::new()];
    for run in runs {
        for (idx, piece) in run.text.split('\n').enumerate() {
            if idx > 0 {
                lines.push(Vec::new());
            }
            if !piece.is_empty() {
                let mut part = run.clone();
                part.text = piece.to_string();
                if let Some(line) = lines.last_mut() {
                    line.push(part);
                }
            }
        }
    }
    lines
}

fn single_line(runs: &[RichTextRun]) -> Vec<RichTextRun> {
    runs.iter()
        .map(|run| {
            let mut run = run.clone();
            run.text = run.text.replace('\n', " ");
            run
        })
        .collect()
}

fn single_line_plain(runs: &[RichTextRun]) -> String {
    blocksync_model::plain_text(runs).replace('\n', " ")
}

/// Renders a text block line by line. List item lines other than the
/// last end with a backslash hard break so the item reads back whole.
fn text_lines(prefix: &str, text: &[RichTextRun], escape_first: bool) -> String {
    let mut lines = split_lines(text);
    let hard_breaks = !prefix.is_empty();
    if hard_breaks {
        while lines.len() > 1 && lines.last().is_some_and(|l| plain_is_blank(l)) {
            lines.pop();
        }
    }
    let last = lines.len() - 1;
    lines
        .iter()
        .enumerate()
        .map(|(idx, runs)| {
            let line = render_inline(runs);
            let line = line.trim();
            let line = if idx == 0 {
                let line = if escape_first {
                    escape_block_start(line)
                } else {
                    line.to_string()
                };
                format!("{prefix}{line}")
            } else {
                escape_block_start(line)
            };
            if hard_breaks && idx < last {
                format!("{line}\\")
            } else {
                line.trim_end().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn plain_is_blank(runs: &[RichTextRun]) -> bool {
    runs.iter().all(|run| run.text.trim().is_empty())
}

fn quote_lines(icon: Option<&str>, text: &[RichTextRun]) -> String {
    split_lines(text)
        .iter()
        .enumerate()
        .map(|(idx, runs)| {
            let line = render_inline(runs);
            let line = match (idx, icon) {
                (0, Some(icon)) => format!("{icon} {line}"),
                _ => line,
            };
            let line = line.trim_end();
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escapes a line that would otherwise open a block construct.
fn escape_block_start(line: &str) -> String {
    let dashes = line.chars().all(|c| c == '-');
    if line.starts_with(['#', '>', '|'])
        || line.starts_with("<details>")
        || line.starts_with("</details>")
        || line.starts_with("<!--")
        || line.starts_with("$$")
        || line.starts_with("- ")
        || line == "-"
        || (dashes && line.len() >= 3)
    {
        return format!("\\{line}");
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &line[digits..];
        if let Some(rest) = after.strip_prefix('.') {
            if rest.is_empty() || rest.starts_with(' ') {
                return format!("{}\\{after}", &line[..digits]);
            }
        }
    }
    line.to_string()
}

fn render_code(language: &str, text: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    let fence = "`".repeat((longest + 1).max(3));
    let tag = if language.is_empty() || language == PLAIN_TEXT {
        ""
    } else {
        language
    };
    format!("{fence}{tag}\n{text}\n{fence}")
}

/// Lines that would read as the closing `$$` (or as an escaped one) get
/// one more backslash.
fn render_equation(expression: &str) -> String {
    let body = expression
        .split('\n')
        .map(|line| {
            let t = line.trim();
            let guarded = t.ends_with("$$") && t[..t.len() - 2].chars().all(|c| c == '\\');
            if guarded {
                let lead = line.len() - line.trim_start().len();
                format!("{}\\{}", &line[..lead], &line[lead..])
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("$$\n{body}\n$$")
}

fn render_table(table: &TableBlock) -> String {
    if table.is_empty() {
        return "<!-- Empty table -->".to_string();
    }
    let mut lines = Vec::with_capacity(table.rows().len() + 1);
    for (idx, row) in table.rows().iter().enumerate() {
        let cells: Vec<String> = row.cells.iter().map(|cell| render_cell(cell)).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if idx == 0 && table.has_header_row() {
            lines.push(format!("|{}", "---|".repeat(table.width())));
        }
    }
    lines.join("\n")
}

fn render_cell(cell: &[RichTextRun]) -> String {
    let rendered = render_inline(&single_line(cell)).trim().replace('|', "\\|");
    if !rendered.is_empty() && rendered.chars().all(|c| matches!(c, '-' | ':' | ' ')) {
        format!("\\{rendered}")
    } else {
        rendered
    }
}

fn render_toggle(summary: &[RichTextRun], children: &[Block]) -> String {
    let summary = render_inline(&single_line(summary));
    let body = blocks_to_markdown(children);
    if body.is_empty() {
        format!("<details>\n<summary>{}</summary>\n</details>", summary.trim())
    } else {
        format!(
            "<details>\n<summary>{}</summary>\n\n{}\n\n</details>",
            summary.trim(),
            body.trim_end_matches('\n')
        )
    }
}
