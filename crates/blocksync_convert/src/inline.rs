//! Inline rich text tokenizer and renderer.
//!
//! The tokenizer is a hand-written scanner over a char buffer. Each
//! construct is recognized at its opener, its closer is located with a
//! bounded forward scan, and the enclosed span is parsed recursively with
//! the combined style. Text that does not form a complete construct is
//! kept verbatim.
//!
//! Recognized, in priority order at any position: backslash escapes,
//! code spans, `**`/`__` bold and `*`/`_` italic (with `***` for both),
//! `~~` strikethrough, `<u>` underline, and `[text](url)` links.

use blocksync_model::{Annotations, RichTextRun};

/// Parses inline markdown into runs.
///
/// Adjacent runs with identical formatting are merged.
pub fn parse_inline(text: &str) -> Vec<RichTextRun> {
    let chars: Vec<char> = text.chars().collect();
    let mut scanner = Scanner {
        chars: &chars,
        out: Vec::new(),
    };
    scanner.parse_span(0, chars.len(), &Style::default());
    merge_runs(scanner.out)
}

/// Renders runs as inline markdown.
///
/// Markers are applied in the fixed order code, bold, italic,
/// strikethrough, underline, link, innermost first. Leading and trailing
/// whitespace of a run is moved outside its markers, and plain text is
/// escaped wherever it would otherwise read as markup.
pub fn render_inline(runs: &[RichTextRun]) -> String {
    let mut out = String::new();
    for run in merge_runs(runs.to_vec()) {
        render_run(&run, &mut out);
    }
    out
}

/// Merges adjacent runs that share formatting and drops empty runs.
pub(crate) fn merge_runs(runs: Vec<RichTextRun>) -> Vec<RichTextRun> {
    let mut merged: Vec<RichTextRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.same_format(&run) => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    merged
}

/// Escapes text so that [`parse_inline`] reads it back verbatim.
pub(crate) fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (idx, &c) in chars.iter().enumerate() {
        let escape = match c {
            '\\' | '*' | '`' | '~' | '[' | ']' => true,
            '_' => {
                let prev = idx.checked_sub(1).and_then(|p| chars.get(p));
                let next = chars.get(idx + 1);
                !(prev.is_some_and(|p| p.is_alphanumeric())
                    && next.is_some_and(|n| n.is_alphanumeric()))
            }
            '<' => {
                let rest: String = chars[idx + 1..].iter().take(3).collect();
                rest.starts_with("u>") || rest.starts_with("/u>")
            }
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn render_run(run: &RichTextRun, out: &mut String) {
    let text = run.text.as_str();
    if run.annotations.is_plain() && run.href.is_none() {
        out.push_str(&escape_text(text));
        return;
    }

    let core = text.trim_matches(char::is_whitespace);
    let lead_len = text.len() - text.trim_start_matches(char::is_whitespace).len();
    let lead = &text[..lead_len];
    let trail = &text[lead_len + core.len()..];

    out.push_str(lead);
    if !core.is_empty() {
        let ann = run.annotations;
        let mut s = if ann.code {
            code_span(core)
        } else {
            escape_text(core)
        };
        if ann.bold {
            s = format!("**{s}**");
        }
        if ann.italic {
            s = format!("*{s}*");
        }
        if ann.strikethrough {
            s = format!("~~{s}~~");
        }
        if ann.underline {
            s = format!("<u>{s}</u>");
        }
        if let Some(href) = &run.href {
            s = format!("[{s}]({})", link_destination(href));
        }
        out.push_str(&s);
    }
    out.push_str(trail);
}

/// Writes an href as a link destination, switching to the `<...>` form
/// when the bare form would not read back whole.
fn link_destination(href: &str) -> String {
    let mut depth = 0i32;
    let mut balanced = true;
    for c in href.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                balanced &= depth >= 0;
            }
            _ => {}
        }
    }
    let bare = balanced
        && depth == 0
        && !href.starts_with('<')
        && !href.contains(char::is_whitespace);
    if bare {
        return href.to_string();
    }
    let mut out = String::with_capacity(href.len() + 2);
    out.push('<');
    for c in href.chars() {
        if matches!(c, '<' | '>' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('>');
    out
}

fn code_span(text: &str) -> String {
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
    let fence = "`".repeat(longest + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

#[derive(Debug, Clone, Default)]
struct Style {
    annotations: Annotations,
    href: Option<String>,
}

struct Scanner<'a> {
    chars: &'a [char],
    out: Vec<RichTextRun>,
}

impl Scanner<'_> {
    fn parse_span(&mut self, start: usize, end: usize, style: &Style) {
        let mut buf = String::new();
        let mut i = start;
        while i < end {
            let c = self.chars[i];
            let consumed = match c {
                '\\' if i + 1 < end && self.chars[i + 1].is_ascii_punctuation() => {
                    buf.push(self.chars[i + 1]);
                    Some(i + 2)
                }
                '`' => self.try_code(i, end, style, &mut buf),
                '*' | '_' => self.try_emphasis(i, end, style, &mut buf),
                '~' => self.try_strike(i, end, style, &mut buf),
                '<' if self.starts_with(i, end, "<u>") => self.try_underline(i, end, style, &mut buf),
                '[' => self.try_link(i, end, style, &mut buf),
                _ => None,
            };
            match consumed {
                Some(next) => i = next,
                None => {
                    // Literal: take the whole delimiter run so a failed
                    // opener is not retried from its second character.
                    let n = if matches!(c, '`' | '*' | '_' | '~') {
                        self.run_len(i, end, c)
                    } else {
                        1
                    };
                    for _ in 0..n {
                        buf.push(c);
                    }
                    i += n;
                }
            }
        }
        self.flush(&mut buf, style);
    }

    fn try_code(&mut self, i: usize, end: usize, style: &Style, buf: &mut String) -> Option<usize> {
        let n = self.run_len(i, end, '`');
        let close = self.find_code_close(i + n, end, n)?;
        self.flush(buf, style);
        let raw: String = self.chars[i + n..close].iter().collect();
        let mut code_style = style.clone();
        code_style.annotations.code = true;
        self.push(strip_code_padding(raw), &code_style);
        Some(close + n)
    }

    fn try_emphasis(
        &mut self,
        i: usize,
        end: usize,
        style: &Style,
        buf: &mut String,
    ) -> Option<usize> {
        let c = self.chars[i];
        let n = self.run_len(i, end, c);
        if n > 3 {
            return None;
        }
        let next = *self.chars[..end].get(i + n)?;
        if next.is_whitespace() {
            return None;
        }
        if c == '_' && i > 0 && self.chars[i - 1].is_alphanumeric() {
            return None;
        }

        let widths: &[usize] = match n {
            3 => &[3, 1, 2],
            2 => &[2],
            _ => &[1],
        };
        for &width in widths {
            let inner_start = i + width;
            if let Some(close) = self.find_emphasis_close(inner_start, end, c, width) {
                self.flush(buf, style);
                let mut inner = style.clone();
                match width {
                    3 => {
                        inner.annotations.bold = true;
                        inner.annotations.italic = true;
                    }
                    2 => inner.annotations.bold = true,
                    _ => inner.annotations.italic = true,
                }
                self.parse_span(inner_start, close, &inner);
                return Some(close + width);
            }
        }
        None
    }

    fn find_emphasis_close(&self, from: usize, end: usize, c: char, width: usize) -> Option<usize> {
        let mut k = from;
        while k < end {
            let ch = self.chars[k];
            if ch == '\\' {
                k += 2;
                continue;
            }
            if ch == '`' {
                k = self.skip_code(k, end);
                continue;
            }
            if ch == c {
                let m = self.run_len(k, end, c);
                let long_enough = if width == 1 {
                    m == 1 || m >= 3
                } else {
                    m >= width
                };
                let after_text = k > from && !self.chars[k - 1].is_whitespace();
                let word_boundary = c != '_'
                    || self
                        .chars
                        .get(k + m)
                        .map_or(true, |next| !next.is_alphanumeric());
                if long_enough && after_text && word_boundary {
                    return Some(k);
                }
                k += m;
                continue;
            }
            k += 1;
        }
        None
    }

    fn try_strike(&mut self, i: usize, end: usize, style: &Style, buf: &mut String) -> Option<usize> {
        if self.run_len(i, end, '~') < 2 {
            return None;
        }
        let next = *self.chars[..end].get(i + 2)?;
        if next.is_whitespace() {
            return None;
        }
        let from = i + 2;
        let mut k = from;
        let close = loop {
            if k >= end {
                return None;
            }
            match self.chars[k] {
                '\\' => k += 2,
                '`' => k = self.skip_code(k, end),
                '~' => {
                    let m = self.run_len(k, end, '~');
                    if m >= 2 && k > from && !self.chars[k - 1].is_whitespace() {
                        break k;
                    }
                    k += m;
                }
                _ => k += 1,
            }
        };
        self.flush(buf, style);
        let mut inner = style.clone();
        inner.annotations.strikethrough = true;
        self.parse_span(from, close, &inner);
        Some(close + 2)
    }

    fn try_underline(
        &mut self,
        i: usize,
        end: usize,
        style: &Style,
        buf: &mut String,
    ) -> Option<usize> {
        let from = i + 3;
        let mut k = from;
        let close = loop {
            if k >= end {
                return None;
            }
            if self.chars[k] == '\\' {
                k += 2;
            } else if self.starts_with(k, end, "</u>") {
                break k;
            } else {
                k += 1;
            }
        };
        self.flush(buf, style);
        let mut inner = style.clone();
        inner.annotations.underline = true;
        self.parse_span(from, close, &inner);
        Some(close + 4)
    }

    fn try_link(&mut self, i: usize, end: usize, style: &Style, buf: &mut String) -> Option<usize> {
        let label_end = self.find_bracket_close(i, end)?;
        if label_end + 1 >= end || self.chars[label_end + 1] != '(' {
            return None;
        }
        let (url, url_end) = match self.chars[..end].get(label_end + 2) {
            Some('<') => self.angle_destination(label_end + 2, end)?,
            _ => {
                let url_end = self.find_paren_close(label_end + 1, end)?;
                let url: String = self.chars[label_end + 2..url_end].iter().collect();
                (url.trim().to_string(), url_end)
            }
        };
        if url.is_empty() {
            return None;
        }
        self.flush(buf, style);
        let mut inner = style.clone();
        inner.href = Some(url);
        self.parse_span(i + 1, label_end, &inner);
        Some(url_end + 1)
    }

    /// Reads `<...>)` starting at the `<`, returning the unescaped
    /// destination and the index of the closing paren.
    fn angle_destination(&self, open: usize, end: usize) -> Option<(String, usize)> {
        let mut url = String::new();
        let mut k = open + 1;
        while k < end {
            match self.chars[k] {
                '\\' if k + 1 < end && matches!(self.chars[k + 1], '<' | '>' | '\\') => {
                    url.push(self.chars[k + 1]);
                    k += 2;
                }
                '>' => {
                    return (self.chars[..end].get(k + 1) == Some(&')')).then_some((url, k + 1));
                }
                '<' | '\n' => return None,
                c => {
                    url.push(c);
                    k += 1;
                }
            }
        }
        None
    }

    fn find_bracket_close(&self, open: usize, end: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut k = open;
        while k < end {
            match self.chars[k] {
                '\\' => {
                    k += 2;
                    continue;
                }
                '`' => {
                    k = self.skip_code(k, end);
                    continue;
                }
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(k);
                    }
                }
                _ => {}
            }
            k += 1;
        }
        None
    }

    fn find_paren_close(&self, open: usize, end: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut k = open;
        while k < end {
            match self.chars[k] {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(k);
                    }
                }
                _ => {}
            }
            k += 1;
        }
        None
    }

    /// Returns the index just past a code span starting at `k`, or past
    /// the backtick run when it has no closer.
    fn skip_code(&self, k: usize, end: usize) -> usize {
        let n = self.run_len(k, end, '`');
        match self.find_code_close(k + n, end, n) {
            Some(close) => close + n,
            None => k + n,
        }
    }

    fn find_code_close(&self, from: usize, end: usize, n: usize) -> Option<usize> {
        let mut k = from;
        while k < end {
            if self.chars[k] == '`' {
                let m = self.run_len(k, end, '`');
                if m == n {
                    return Some(k);
                }
                k += m;
            } else {
                k += 1;
            }
        }
        None
    }

    fn run_len(&self, i: usize, end: usize, c: char) -> usize {
        self.chars[i..end].iter().take_while(|&&ch| ch == c).count()
    }

    fn starts_with(&self, i: usize, end: usize, pattern: &str) -> bool {
        let mut k = i;
        for p in pattern.chars() {
            if k >= end || self.chars[k] != p {
                return false;
            }
            k += 1;
        }
        true
    }

    fn flush(&mut self, buf: &mut String, style: &Style) {
        if !buf.is_empty() {
            let text = std::mem::take(buf);
            self.push(text, style);
        }
    }

    fn push(&mut self, text: String, style: &Style) {
        if text.is_empty() {
            return;
        }
        self.out.push(RichTextRun {
            text,
            annotations: style.annotations,
            href: style.href.clone(),
        });
    }
}

fn strip_code_padding(raw: String) -> String {
    let padded = raw.len() >= 2
        && raw.starts_with(' ')
        && raw.ends_with(' ')
        && !raw.chars().all(|c| c == ' ');
    if padded {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksync_model::plain_text;

    fn run(text: &str) -> RichTextRun {
        RichTextRun::plain(text)
    }

    #[test]
    fn plain_text_is_one_run() {
        assert_eq!(parse_inline("just words"), vec![run("just words")]);
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn basic_markers() {
        assert_eq!(parse_inline("**b**"), vec![run("b").bold()]);
        assert_eq!(parse_inline("__b__"), vec![run("b").bold()]);
        assert_eq!(parse_inline("*i*"), vec![run("i").italic()]);
        assert_eq!(parse_inline("_i_"), vec![run("i").italic()]);
        assert_eq!(parse_inline("`c`"), vec![run("c").code()]);
        assert_eq!(parse_inline("~~s~~"), vec![run("s").strikethrough()]);
        assert_eq!(parse_inline("<u>u</u>"), vec![run("u").underline()]);
        assert_eq!(
            parse_inline("[text](https://example.com)"),
            vec![run("text").with_href("https://example.com")]
        );
    }

    #[test]
    fn bold_italic_and_nesting() {
        assert_eq!(parse_inline("***x***"), vec![run("x").bold().italic()]);
        assert_eq!(
            parse_inline("**a *b* c**"),
            vec![run("a ").bold(), run("b").bold().italic(), run(" c").bold()]
        );
        assert_eq!(
            parse_inline("*a **b** c*"),
            vec![run("a ").italic(), run("b").bold().italic(), run(" c").italic()]
        );
        assert_eq!(
            parse_inline("***a** b*"),
            vec![run("a").bold().italic(), run(" b").italic()]
        );
    }

    #[test]
    fn adjacent_runs_without_space() {
        assert_eq!(
            parse_inline("**a***b*"),
            vec![run("a").bold(), run("b").italic()]
        );
        assert_eq!(
            parse_inline("*a***b**"),
            vec![run("a").italic(), run("b").bold()]
        );
        assert_eq!(
            parse_inline("***a****b*"),
            vec![run("a").bold().italic(), run("b").italic()]
        );
        assert_eq!(
            parse_inline("~~a~~~~**b**~~"),
            vec![run("a").strikethrough(), run("b").bold().strikethrough()]
        );
    }

    #[test]
    fn code_wins_over_emphasis() {
        assert_eq!(
            parse_inline("`a*b*c` and *x*"),
            vec![run("a*b*c").code(), run(" and "), run("x").italic()]
        );
        assert_eq!(parse_inline("`` a`b ``"), vec![run("a`b").code()]);
    }

    #[test]
    fn unmatched_markers_are_verbatim() {
        for text in ["2 * 3 = 6", "**unclosed", "a ~ b", "[not a link]", "[x](", "<u>open", "`tick"] {
            assert_eq!(plain_text(&parse_inline(text)), text, "input {text:?}");
        }
    }

    #[test]
    fn intraword_underscores_are_literal() {
        assert_eq!(parse_inline("snake_case_name"), vec![run("snake_case_name")]);
    }

    #[test]
    fn escapes_are_literal() {
        assert_eq!(parse_inline(r"\*not italic\*"), vec![run("*not italic*")]);
        assert_eq!(parse_inline(r"a\\b"), vec![run(r"a\b")]);
        assert_eq!(parse_inline(r"\q"), vec![run(r"\q")]);
    }

    #[test]
    fn formatted_link_label() {
        assert_eq!(
            parse_inline("see [**docs**](https://d.io/a_(b)) now"),
            vec![
                run("see "),
                run("docs").bold().with_href("https://d.io/a_(b)"),
                run(" now"),
            ]
        );
    }

    #[test]
    fn render_applies_fixed_order() {
        let all = run("x")
            .code()
            .bold()
            .italic()
            .strikethrough()
            .underline()
            .with_href("u");
        assert_eq!(render_inline(&[all.clone()]), "[<u>~~***`x`***~~</u>](u)");
        assert_eq!(parse_inline(&render_inline(&[all.clone()])), vec![all]);
    }

    #[test]
    fn render_moves_whitespace_outside_markers() {
        let runs = vec![run("a"), run(" bold ").bold(), run("b")];
        assert_eq!(render_inline(&runs), "a **bold** b");
    }

    #[test]
    fn render_merges_and_escapes() {
        let runs = vec![run("one *"), run("two_")];
        assert_eq!(render_inline(&runs), r"one \*two\_");
        assert_eq!(render_inline(&[run("snake_case")]), "snake_case");
        assert_eq!(render_inline(&[run("[x] <u>")]), r"\[x\] \<u>");
    }

    #[test]
    fn code_span_fence_grows() {
        assert_eq!(render_inline(&[run("a`b").code()]), "``a`b``");
        assert_eq!(render_inline(&[run("`a").code()]), "`` `a ``");
        assert_eq!(parse_inline("`` `a ``"), vec![run("`a").code()]);
    }

    #[test]
    fn unbalanced_href_uses_angle_brackets() {
        let link = run("x").with_href("http://a/b)c");
        assert_eq!(render_inline(&[link.clone()]), "[x](<http://a/b)c>)");
        assert_eq!(parse_inline("[x](<http://a/b)c>)"), vec![link]);

        let odd = run("y").with_href("a <b> (c");
        assert_eq!(render_inline(&[odd.clone()]), r"[y](<a \<b\> (c>)");
        assert_eq!(parse_inline(&render_inline(&[odd.clone()])), vec![odd]);

        let balanced = run("z").with_href("https://d.io/a_(b)");
        assert_eq!(render_inline(&[balanced]), "[z](https://d.io/a_(b))");
    }

    #[test]
    fn unclosed_angle_destination_is_verbatim() {
        assert_eq!(plain_text(&parse_inline("[x](<a)")), "[x](<a)");
    }

    #[test]
    fn whitespace_only_formatting_is_dropped() {
        assert_eq!(render_inline(&[run("a"), run(" ").bold(), run("b")]), "a b");
    }
}
