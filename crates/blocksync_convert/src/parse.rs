//! Markdown to block tree scanner.
//!
//! A line-oriented scanner: each non-blank line is classified by its
//! prefix, and multi-line constructs (fences, tables, quotes, toggles,
//! equations) consume their following lines. Lines indented by four or
//! more columns after a text block become that block's children.

use crate::clean::{clean_markdown, closes_fence, fence_len};
use crate::inline::parse_inline;
use crate::language::normalize_language;
use blocksync_model::{Block, BlockKind, FrontMatter, ModelResult, RichTextRun, TableBlock, TableRow};

/// Largest code block, in characters, produced by the scanner.
pub const MAX_CODE_CHARS: usize = 1900;

const INDENT: usize = 4;

/// Converts markdown (without front matter) to blocks.
///
/// The text is normalized with [`clean_markdown`] first.
pub fn markdown_to_blocks(text: &str) -> Vec<Block> {
    let cleaned = clean_markdown(text);
    let lines: Vec<String> = cleaned.lines().map(str::to_string).collect();
    parse_lines(&lines)
}

/// Splits a whole file into its front matter and body blocks.
pub fn markdown_file_to_blocks(text: &str) -> ModelResult<(FrontMatter, Vec<Block>)> {
    let (front, body) = FrontMatter::extract(text)?;
    Ok((front, markdown_to_blocks(body)))
}

/// Builds code blocks from `text`, splitting at line boundaries so that
/// no block exceeds [`MAX_CODE_CHARS`].
///
/// Joining the blocks' texts with `\n` reproduces `text` exactly. A
/// single line longer than the limit is kept whole in its own block.
pub fn split_code(text: &str, language: &str) -> Vec<Block> {
    if text.chars().count() <= MAX_CODE_CHARS {
        return vec![Block::code(language, text)];
    }

    let mut blocks = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();
    let mut chunk_len = 0;
    for line in text.split('\n') {
        let line_len = line.chars().count() + 1;
        if chunk_len + line_len > MAX_CODE_CHARS && !chunk.is_empty() {
            blocks.push(Block::code(language, chunk.join("\n")));
            chunk.clear();
            chunk_len = 0;
        }
        chunk.push(line);
        chunk_len += line_len;
    }
    if !chunk.is_empty() {
        blocks.push(Block::code(language, chunk.join("\n")));
    }
    blocks
}

fn parse_lines(lines: &[String]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }
        let (mut parsed, next) = parse_block(lines, i);
        i = next;

        if parsed.len() == 1 && accepts_children(&parsed[0].kind) {
            let (children, after) = collect_children(lines, i);
            i = after;
            if !children.is_empty() {
                if let Some(parent) = parsed.pop() {
                    parsed.push(parent.with_children(children));
                }
            }
        }
        blocks.extend(parsed);
    }
    blocks
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
    )
}

fn collect_children(lines: &[String], start: usize) -> (Vec<Block>, usize) {
    let mut last_content = None;
    let mut k = start;
    while k < lines.len() {
        let line = &lines[k];
        if line.trim().is_empty() {
            k += 1;
            continue;
        }
        if indent_width(line) < INDENT {
            break;
        }
        last_content = Some(k);
        k += 1;
    }
    match last_content {
        None => (Vec::new(), start),
        Some(last) => {
            let dedented: Vec<String> = lines[start..=last].iter().map(|l| dedent(l)).collect();
            (parse_lines(&dedented), last + 1)
        }
    }
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += INDENT,
            _ => break,
        }
    }
    width
}

fn dedent(line: &str) -> String {
    if let Some(rest) = line.strip_prefix('\t') {
        return rest.to_string();
    }
    let spaces = line.chars().take(INDENT).take_while(|&c| c == ' ').count();
    line[spaces..].to_string()
}

fn parse_block(lines: &[String], i: usize) -> (Vec<Block>, usize) {
    let t = lines[i].trim();

    if let Some(len) = fence_len(t) {
        return parse_code(lines, i, len);
    }
    if t.starts_with("$$") {
        if let Some(parsed) = parse_equation(lines, i) {
            return parsed;
        }
    }
    if t.starts_with("<details>") {
        if let Some(parsed) = parse_toggle(lines, i) {
            return parsed;
        }
    }
    if t.starts_with('>') {
        return parse_quote(lines, i);
    }
    if t.starts_with('|') && t.len() >= 2 && t.ends_with('|') {
        return parse_table(lines, i);
    }

    if let Some((joined, next)) = hard_break_lines(lines, i) {
        if let Some(item) = parse_list_item(&joined) {
            return (vec![item], next);
        }
    }

    let block = parse_comment_marker(t)
        .or_else(|| parse_heading(t))
        .or_else(|| is_divider(t).then(|| Block::new(BlockKind::Divider)))
        .or_else(|| parse_list_item(t))
        .or_else(|| parse_image(t))
        .unwrap_or_else(|| Block::paragraph(parse_inline(t)));
    (vec![block], i + 1)
}

/// Joins a line ending in a backslash hard break with the lines it
/// continues onto, one `\n` per break.
fn hard_break_lines(lines: &[String], i: usize) -> Option<(String, usize)> {
    let mut text = strip_hard_break(lines[i].trim())?.to_string();
    let mut j = i + 1;
    while j < lines.len() && !lines[j].trim().is_empty() {
        let t = lines[j].trim();
        text.push('\n');
        j += 1;
        match strip_hard_break(t) {
            Some(rest) => text.push_str(rest),
            None => {
                text.push_str(t);
                break;
            }
        }
    }
    (j > i + 1).then_some((text, j))
}

fn strip_hard_break(t: &str) -> Option<&str> {
    let n = t.chars().rev().take_while(|&c| c == '\\').count();
    (n % 2 == 1).then(|| &t[..t.len() - 1])
}

fn parse_code(lines: &[String], i: usize, len: usize) -> (Vec<Block>, usize) {
    let info = lines[i].trim()[len..].trim();
    let mut content: Vec<&str> = Vec::new();
    let mut j = i + 1;
    while j < lines.len() {
        if closes_fence(lines[j].trim(), len) {
            j += 1;
            break;
        }
        content.push(&lines[j]);
        j += 1;
    }
    let language = normalize_language(info);
    (split_code(&content.join("\n"), &language), j)
}

fn parse_equation(lines: &[String], i: usize) -> Option<(Vec<Block>, usize)> {
    let t = lines[i].trim();
    if t.len() > 4 && t.ends_with("$$") {
        let expression = t[2..t.len() - 2].trim().to_string();
        return Some((vec![Block::new(BlockKind::Equation { expression })], i + 1));
    }
    if t != "$$" {
        return None;
    }
    let close = equation_close(lines, i)?;
    let expression = lines[i + 1..close]
        .iter()
        .map(|line| unescape_equation_line(line))
        .collect::<Vec<_>>()
        .join("\n");
    Some((vec![Block::new(BlockKind::Equation { expression })], close + 1))
}

fn equation_close(lines: &[String], open: usize) -> Option<usize> {
    (open + 1..lines.len()).find(|&j| lines[j].trim() == "$$")
}

/// Drops one backslash from a line of the form `\$$`, `\\$$`, ...
fn unescape_equation_line(line: &str) -> String {
    let t = line.trim();
    let escaped = t.len() > 2
        && t.ends_with("$$")
        && t[..t.len() - 2].chars().all(|c| c == '\\');
    if escaped {
        line.replacen('\\', "", 1)
    } else {
        line.to_string()
    }
}

/// Index just past a fenced code block or multi-line equation opening at
/// `j`, if one does.
fn skip_verbatim(lines: &[String], j: usize) -> Option<usize> {
    let t = lines[j].trim();
    if let Some(len) = fence_len(t) {
        let close = (j + 1..lines.len()).find(|&k| closes_fence(lines[k].trim(), len));
        return Some(close.map_or(lines.len(), |k| k + 1));
    }
    if t == "$$" {
        return equation_close(lines, j).map(|k| k + 1);
    }
    None
}

fn parse_toggle(lines: &[String], i: usize) -> Option<(Vec<Block>, usize)> {
    let mut depth = 0usize;
    let mut close = None;
    let mut j = i;
    while j < lines.len() {
        if j > i {
            if let Some(next) = skip_verbatim(lines, j) {
                j = next;
                continue;
            }
        }
        let t = lines[j].trim();
        if t.starts_with("<details>") {
            depth += 1;
        }
        if t == "</details>" || (j == i && t.ends_with("</details>")) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                close = Some(j);
                break;
            }
        }
        j += 1;
    }
    let close = close?;
    if close == i {
        return None;
    }

    let mut inner: Vec<String> = lines[i + 1..close].to_vec();
    let opening_rest = lines[i].trim()["<details>".len()..].trim();
    let summary = if !opening_rest.is_empty() {
        summary_text(opening_rest)
    } else {
        match inner.iter().position(|l| !l.trim().is_empty()) {
            Some(pos) if inner[pos].trim().starts_with("<summary>") => {
                let text = summary_text(inner[pos].trim());
                inner.drain(..=pos);
                text
            }
            _ => String::new(),
        }
    };

    let toggle = Block::new(BlockKind::Toggle {
        text: parse_inline(&summary),
    })
    .with_children(parse_lines(&inner));
    Some((vec![toggle], close + 1))
}

fn summary_text(line: &str) -> String {
    line.trim_start_matches("<summary>")
        .trim_end_matches("</summary>")
        .trim()
        .to_string()
}

fn parse_quote(lines: &[String], i: usize) -> (Vec<Block>, usize) {
    let mut parts = Vec::new();
    let mut j = i;
    while j < lines.len() {
        let t = lines[j].trim();
        let Some(rest) = t.strip_prefix('>') else {
            break;
        };
        parts.push(rest.strip_prefix(' ').unwrap_or(rest));
        j += 1;
    }
    let text = parse_inline(&parts.join("\n"));
    (vec![Block::new(BlockKind::Quote { text })], j)
}

fn parse_table(lines: &[String], i: usize) -> (Vec<Block>, usize) {
    let mut raw: Vec<&str> = Vec::new();
    let mut j = i;
    while j < lines.len() {
        let t = lines[j].trim();
        if !t.starts_with('|') {
            break;
        }
        raw.push(t);
        j += 1;
    }

    let has_header = raw.len() >= 2 && is_separator(raw[1]);
    let rows = raw
        .iter()
        .enumerate()
        .filter(|(idx, _)| !(has_header && *idx == 1))
        .map(|(_, line)| TableRow::new(split_cells(line).iter().map(|c| parse_inline(c)).collect()))
        .collect();
    (
        vec![Block::new(BlockKind::Table(TableBlock::new(rows, has_header)))],
        j,
    )
}

fn is_separator(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn split_cells(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => cell.push('|'),
                Some(other) => {
                    cell.push('\\');
                    cell.push(other);
                }
                None => cell.push('\\'),
            },
            '|' => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

fn parse_comment_marker(t: &str) -> Option<Block> {
    let inner = t.strip_prefix("<!--")?.strip_suffix("-->")?.trim();
    let kind = if let Some(title) = inner.strip_prefix("Child page:") {
        BlockKind::ChildPage {
            title: title.trim().to_string(),
        }
    } else if let Some(title) = inner.strip_prefix("Child database:") {
        BlockKind::ChildDatabase {
            title: title.trim().to_string(),
        }
    } else if let Some(raw_type) = inner.strip_prefix("Unsupported block type:") {
        BlockKind::Unsupported {
            raw_type: raw_type.trim().to_string(),
        }
    } else if inner == "Empty table" {
        BlockKind::Table(TableBlock::new(Vec::new(), false))
    } else {
        return None;
    };
    Some(Block::new(kind))
}

fn parse_heading(t: &str) -> Option<Block> {
    let level = t.chars().take_while(|&c| c == '#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    let rest = &t[level..];
    if rest.is_empty() {
        return Some(Block::heading(level as u8, Vec::new()));
    }
    let text = rest.strip_prefix(' ')?;
    Some(Block::heading(level as u8, parse_inline(text.trim())))
}

pub(crate) fn is_divider(t: &str) -> bool {
    let mut chars = t.chars();
    match chars.next() {
        Some(first @ ('-' | '*' | '_')) => t.len() >= 3 && chars.all(|c| c == first),
        _ => false,
    }
}

fn parse_list_item(t: &str) -> Option<Block> {
    let bullet_rest = if t == "-" {
        Some("")
    } else {
        t.strip_prefix("- ").or_else(|| t.strip_prefix("* "))
    };
    if let Some(rest) = bullet_rest {
        let todo = |checked: bool, text: &str| {
            Block::new(BlockKind::Todo {
                text: parse_inline(text.trim()),
                checked,
            })
        };
        for (marker, checked) in [("[ ]", false), ("[x]", true), ("[X]", true)] {
            if rest == marker {
                return Some(todo(checked, ""));
            }
            if let Some(text) = rest.strip_prefix(marker).and_then(|r| r.strip_prefix(' ')) {
                return Some(todo(checked, text));
            }
        }
        return Some(Block::new(BlockKind::BulletedItem {
            text: parse_inline(rest.trim()),
        }));
    }

    let digits = t.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let after = t[digits..].strip_prefix('.')?;
    if !after.is_empty() && !after.starts_with(' ') {
        return None;
    }
    Some(Block::new(BlockKind::NumberedItem {
        text: parse_inline(after.trim()),
    }))
}

fn parse_image(t: &str) -> Option<Block> {
    let rest = t.strip_prefix("![")?;
    let chars: Vec<char> = rest.chars().collect();
    let mut depth = 1usize;
    let mut k = 0;
    let label_end = loop {
        match chars.get(k)? {
            '\\' => k += 1,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    break k;
                }
            }
            _ => {}
        }
        k += 1;
    };
    if chars.get(label_end + 1) != Some(&'(') || chars.last() != Some(&')') {
        return None;
    }
    let url: String = chars[label_end + 2..chars.len() - 1].iter().collect();
    let url = url.trim();
    if url.is_empty() || url.contains(char::is_whitespace) {
        return None;
    }
    let label: String = chars[..label_end].iter().collect();
    let caption = unescape(&label);
    Some(Block::new(BlockKind::Image {
        url: url.to_string(),
        caption: if caption.is_empty() {
            Vec::new()
        } else {
            vec![RichTextRun::plain(caption)]
        },
    }))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}
