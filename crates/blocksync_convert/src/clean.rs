//! Markdown normalization pre-pass.

/// Normalizes blank lines before scanning.
///
/// Blank lines between two table rows are removed so the rows form one
/// table. Elsewhere, runs of blank lines collapse to a single empty line.
/// Fenced code is copied untouched, and no non-blank line is altered.
pub fn clean_markdown(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut open_fence: Option<usize> = None;
    let mut after_table_row = false;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if let Some(len) = open_fence {
            out.push(line);
            if closes_fence(trimmed, len) {
                open_fence = None;
            }
            continue;
        }

        if trimmed.is_empty() {
            if after_table_row && next_is_table_row(&lines[idx + 1..]) {
                continue;
            }
            if out.last() != Some(&"") {
                out.push("");
            }
            continue;
        }

        open_fence = fence_len(trimmed);
        after_table_row = trimmed.starts_with('|');
        out.push(line);
    }

    let mut cleaned = out.join("\n");
    if text.ends_with('\n') && !cleaned.is_empty() {
        cleaned.push('\n');
    }
    cleaned
}

fn next_is_table_row(rest: &[&str]) -> bool {
    rest.iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with('|'))
}

/// Returns the backtick count of an opening fence line.
pub(crate) fn fence_len(trimmed: &str) -> Option<usize> {
    let n = trimmed.chars().take_while(|&c| c == '`').count();
    if n >= 3 && !trimmed[n..].contains('`') {
        Some(n)
    } else {
        None
    }
}

/// Returns true if the line closes a fence opened with `len` backticks.
pub(crate) fn closes_fence(trimmed: &str, len: usize) -> bool {
    let n = trimmed.chars().take_while(|&c| c == '`').count();
    n >= len && trimmed[n..].trim().is_empty()
}
