//! Markdown fixtures and temporary document workspaces.
//!
//! Provides named markdown documents that together exercise every block
//! type, plus a scratch directory for tests that touch the filesystem.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Named markdown bodies covering every block type the converter reads.
pub const MARKDOWN_FIXTURES: &[(&str, &str)] = &[
    ("headings", "# Level One\n\n## Level Two\n\n### Level Three\n"),
    (
        "lists",
        "- first bullet\n- second bullet\n    - nested bullet\n1. first step\n1. second step\n- [ ] open task\n- [x] finished task\n",
    ),
    ("quote", "> A quoted line\n> continues here\n"),
    ("callout", "> 💡 Remember to sync before editing\n"),
    (
        "code_with_language",
        "```rust\nfn main() {\n    println!(\"hello\");\n}\n```\n",
    ),
    ("code_without_language", "```\nplain output\n\n  indented\n```\n"),
    ("divider", "Above the line\n\n---\nBelow the line\n"),
    (
        "inline",
        "Some **bold**, *italic*, `code`, ~~struck~~ and <u>underlined</u> text.\n***Bold italic*** with a [link](https://example.com/docs) and **[bold link](https://example.com)**.\nEscaped \\*stars\\* and a snake_case_name stay literal.\n",
    ),
    (
        "toggle",
        "<details>\n<summary>Click to expand</summary>\n\nHidden paragraph\n- hidden bullet\n\n</details>\n",
    ),
    ("equation", "$$\n\\int_0^1 x^2 dx\n$$\n"),
    ("image", "![Architecture diagram](https://example.com/diagram.png)\n"),
    (
        "markers",
        "<!-- Child page: Meeting Notes -->\n<!-- Child database: Tasks -->\n<!-- Unsupported block type: embed -->\n",
    ),
    (
        "escaped_block_starts",
        "\\# not a heading\n1\\. not a list\n\\- not a bullet\n\\> not a quote\n",
    ),
    (
        "mixed_document",
        "# Release Plan\n\nThe plan has **three** phases.\n\n## Phases\n\n1. Design\n1. Build\n    - write the *parser*\n    - write the renderer\n1. Ship\n\n| Phase | Owner | Status |\n|---|---|---|\n| Design | Ana | done |\n| Build | Ben | `wip` |\n\n> Keep the scope small.\n\n---\nDone.\n",
    ),
];

/// Returns the fixture with the given name.
///
/// # Panics
///
/// Panics if no fixture has that name.
pub fn markdown_fixture(name: &str) -> &'static str {
    MARKDOWN_FIXTURES
        .iter()
        .find(|(fixture, _)| *fixture == name)
        .map(|(_, body)| *body)
        .unwrap_or_else(|| panic!("unknown markdown fixture: {name}"))
}

/// Builds a pipe table with a header row and `rows` body rows.
pub fn table_markdown(columns: usize, rows: usize) -> String {
    let row = |prefix: &str| {
        let cells: Vec<String> = (1..=columns).map(|c| format!("{prefix}{c}")).collect();
        format!("| {} |", cells.join(" | "))
    };
    let mut lines = vec![row("Col "), format!("|{}", "---|".repeat(columns))];
    for r in 1..=rows {
        lines.push(row(&format!("r{r}c")));
    }
    lines.join("\n") + "\n"
}

/// Every table shape from one to five columns and zero to two body rows.
pub fn table_fixtures() -> Vec<String> {
    (1..=5)
        .flat_map(|columns| (0..=2).map(move |rows| table_markdown(columns, rows)))
        .collect()
}

/// Builds a markdown file with `title` and `type` front matter.
pub fn document(title: &str, doc_type: &str, body: &str) -> String {
    format!("---\ntitle: {title}\ntype: {doc_type}\n---\n\n{body}")
}

/// Builds a body of `paragraphs` paragraphs, each `chars` characters long.
pub fn sized_body(paragraphs: usize, chars: usize) -> String {
    (0..paragraphs)
        .map(|p| {
            let seed = format!("Paragraph {p} ");
            seed.chars().cycle().take(chars).collect::<String>().trim_end().to_string() + "."
        })
        .collect::<Vec<_>>()
        .join("\n\n")
        + "\n"
}

/// A temporary docs directory with automatic cleanup.
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file in the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Default location of the sync state file.
    pub fn state_file(&self) -> PathBuf {
        self.file(".notion_sync_state.json")
    }

    /// Writes a file, creating parent directories.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.file(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
        path
    }

    /// Reads a file as UTF-8.
    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.file(name)).expect("Failed to read workspace file")
    }

    /// Returns true if the file exists.
    pub fn exists(&self, name: &str) -> bool {
        self.file(name).exists()
    }

    /// Names of the top-level files, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dir.path())
            .expect("Failed to list workspace")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
