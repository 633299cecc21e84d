//! Document titles, categories and canonical file names.
//!
//! Final documents are named `YYMMDD-<t>-<domain>-<slug>.md--FINAL.md`,
//! where `t` is a one-letter type code.

use blocksync_model::{Block, BlockKind, FrontMatter};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;

/// Document categories, which double as the remote `Type` values.
pub const CATEGORIES: &[&str] = &["vision", "software", "blog"];

/// Domains accepted by the remote `Domain` select.
pub const DOMAINS: &[&str] = &[
    "research",
    "architecture",
    "economics",
    "strategy",
    "protocol",
    "spec",
];

/// Review states accepted by the remote `Status` select.
pub const STATUSES: &[&str] = &["draft", "review", "final"];

const DEFAULT_CATEGORY: &str = "vision";

/// Maps a front matter `type` to a category.
pub fn category_for_type(doc_type: &str) -> &'static str {
    match doc_type.trim().to_lowercase().as_str() {
        "software" | "spec" => "software",
        "blog" | "post" => "blog",
        _ => DEFAULT_CATEGORY,
    }
}

/// Infers a category from a `YYMMDD-<letter>-...` file name.
pub fn category_from_filename(name: &str) -> &'static str {
    let name = name.to_lowercase();
    let bytes = name.as_bytes();
    let dated = bytes.len() > 9
        && bytes[..6].iter().all(u8::is_ascii_digit)
        && bytes[6] == b'-'
        && bytes[8] == b'-';
    if !dated {
        return DEFAULT_CATEGORY;
    }
    match bytes[7] {
        b's' => "software",
        b'b' => "blog",
        _ => DEFAULT_CATEGORY,
    }
}

/// One-letter code of a category.
pub fn type_code(category: &str) -> char {
    match category_for_type(category) {
        "software" => 's',
        "blog" => 'b',
        _ => 'v',
    }
}

/// Resolves a document's category: front matter `type`, then file name.
pub fn resolve_category(front: &FrontMatter, file_name: &str) -> &'static str {
    match front.get("type") {
        Some(doc_type) => category_for_type(&doc_type),
        None => category_from_filename(file_name),
    }
}

/// Resolves a document's title: front matter `title`, then the first
/// top-level heading block of level one, then the file name.
pub fn resolve_title(front: &FrontMatter, blocks: &[Block], path: &Path) -> String {
    if let Some(title) = front.get("title") {
        return title;
    }
    let heading = blocks
        .iter()
        .filter(|block| matches!(block.kind, BlockKind::Heading { level: 1, .. }))
        .map(|block| block.plain_text().trim().to_string())
        .find(|text| !text.is_empty());
    heading.unwrap_or_else(|| file_stem(path))
}

/// File name without the final-document or markdown extension.
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("untitled");
    let stem = name.split(".md").next().unwrap_or(name);
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem.to_string()
    }
}

/// Lowercase ASCII slug with single hyphens between words.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// Inputs of a canonical file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts<'a> {
    /// Document date.
    pub date: NaiveDate,
    /// Category or raw type.
    pub doc_type: &'a str,
    /// Domain; empty means the default.
    pub domain: &'a str,
    /// Title.
    pub title: &'a str,
}

/// Builds the canonical file name of a document.
pub fn canonical_filename(parts: &NameParts<'_>, suffix: &str) -> String {
    let domain = slugify(parts.domain);
    let domain = if domain.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        domain
    };
    let slug = slugify(parts.title);
    let slug = if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    };
    format!(
        "{}-{}-{}-{}.md{}",
        parts.date.format("%y%m%d"),
        type_code(parts.doc_type),
        domain,
        slug,
        suffix
    )
}

/// Reads a document date, falling back to a timestamp.
///
/// Accepts `YYYY-MM-DD` optionally followed by a time.
pub fn document_date(raw: Option<&str>, fallback: DateTime<Utc>) -> NaiveDate {
    raw.and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| fallback.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksync_convert::markdown_to_blocks;
    use chrono::TimeZone;

    #[test]
    fn test_categories() {
        assert_eq!(category_for_type("Spec"), "software");
        assert_eq!(category_for_type("post"), "blog");
        assert_eq!(category_for_type("whatever"), "vision");
        assert_eq!(
            category_from_filename("251200-s-arch-technical-architecture.md--FINAL.md"),
            "software"
        );
        assert_eq!(category_from_filename("251200-v-thesis-x.md--FINAL.md"), "vision");
        assert_eq!(category_from_filename("notes.md"), "vision");
        assert_eq!(type_code("blog"), 'b');
    }

    #[test]
    fn test_resolve_title() {
        let front = FrontMatter::parse("title: From Front").unwrap();
        let path = Path::new("250101-v-x-slug.md--FINAL.md");
        let title = |front: &FrontMatter, body: &str| {
            resolve_title(front, &markdown_to_blocks(body), path)
        };
        assert_eq!(title(&front, "# Heading"), "From Front");
        let empty = FrontMatter::new();
        assert_eq!(title(&empty, "intro\n\n#  Heading One \n"), "Heading One");
        assert_eq!(title(&empty, "## Not level one\n"), "250101-v-x-slug");
        assert_eq!(title(&empty, "# **Bold** title\n"), "Bold title");
    }

    #[test]
    fn test_resolve_title_ignores_code() {
        let path = Path::new("250101-v-x-slug.md--FINAL.md");
        let body = "```bash\n# install first\nmake\n```\n\n# Real Title\n";
        let blocks = markdown_to_blocks(body);
        assert_eq!(resolve_title(&FrontMatter::new(), &blocks, path), "Real Title");
        let only_code = markdown_to_blocks("```\n# comment\n```\n");
        assert_eq!(
            resolve_title(&FrontMatter::new(), &only_code, path),
            "250101-v-x-slug"
        );
    }

    #[test]
    fn test_resolve_category() {
        let front = FrontMatter::parse("type: spec").unwrap();
        assert_eq!(resolve_category(&front, "250101-b-x.md"), "software");
        assert_eq!(resolve_category(&FrontMatter::new(), "250101-b-x.md"), "blog");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Hello, World! "), "hello-world");
        assert_eq!(slugify("snake_case -- and   spaces"), "snake-case-and-spaces");
        assert_eq!(slugify("Ünïcode ok"), "ncode-ok");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_canonical_filename() {
        let parts = NameParts {
            date: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
            doc_type: "software",
            domain: "Architecture",
            title: "The Sync Engine",
        };
        assert_eq!(
            canonical_filename(&parts, "--FINAL.md"),
            "250307-s-architecture-the-sync-engine.md--FINAL.md"
        );

        let bare = NameParts {
            domain: "",
            title: "???",
            ..parts
        };
        assert_eq!(
            canonical_filename(&bare, "--FINAL.md"),
            "250307-s-vision-untitled.md--FINAL.md"
        );
    }

    #[test]
    fn test_document_date() {
        let fallback = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            document_date(Some("2025-01-15T10:00:00Z"), fallback),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert_eq!(document_date(Some("soon"), fallback), fallback.date_naive());
        assert_eq!(document_date(None, fallback), fallback.date_naive());
    }
}
