//! Local markdown documents.

use crate::error::{EngineError, EngineResult};
use crate::naming::{resolve_category, resolve_title};
use crate::state::content_hash;
use blocksync_convert::markdown_to_blocks;
use blocksync_model::{Block, FrontMatter};
use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A local markdown file, parsed.
#[derive(Debug, Clone)]
pub struct LocalDocument {
    /// Path of the file.
    pub path: PathBuf,
    /// File name.
    pub file_name: String,
    /// Whole file text.
    pub text: String,
    /// Parsed front matter.
    pub front: FrontMatter,
    /// Body after the front matter.
    pub body: String,
    /// Body converted to blocks.
    pub blocks: Vec<Block>,
    /// Resolved title.
    pub title: String,
    /// Resolved category.
    pub category: &'static str,
}

impl LocalDocument {
    /// Reads and parses a file.
    ///
    /// Front matter that is not valid YAML makes the document invalid.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(path, text)
    }

    /// Parses file text as if read from `path`.
    pub fn parse(path: &Path, text: String) -> EngineResult<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EngineError::invalid_document(path, "file name is not valid UTF-8"))?
            .to_string();
        let (front, body) = FrontMatter::extract(&text)
            .map_err(|e| EngineError::invalid_document(path, e.to_string()))?;
        let body = body.to_string();
        let blocks = markdown_to_blocks(&body);
        let title = resolve_title(&front, &blocks, path);
        let category = resolve_category(&front, &file_name);
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            text,
            front,
            body,
            blocks,
            title,
            category,
        })
    }

    /// Remote id recorded in the front matter, if any.
    pub fn remote_id(&self) -> Option<String> {
        self.front.get("notion_id")
    }

    /// Hash of the body.
    pub fn content_hash(&self) -> String {
        content_hash(&self.text)
    }
}

/// Final documents directly inside `dir`, sorted by name.
pub fn final_files(dir: &Path, suffix: &str) -> EngineResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_final = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(suffix));
        if is_final && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Copies a file to `<name>.<YYYYmmdd_HHMMSS>.bak` next to it.
///
/// Returns `None` when there is nothing to back up.
pub fn backup_file(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let mut backup = path.with_file_name(format!("{name}.{stamp}.bak"));
    let mut n = 1;
    while backup.exists() {
        backup = path.with_file_name(format!("{name}.{stamp}-{n}.bak"));
        n += 1;
    }
    fs::copy(path, &backup)?;
    warn!(file = %name, backup = %backup.display(), "backed up local file before overwrite");
    Ok(Some(backup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksync_testkit::TempWorkspace;

    #[test]
    fn test_load_resolves_title_and_category() {
        let ws = TempWorkspace::new();
        let path = ws.write(
            "250101-s-protocol-wire.md--FINAL.md",
            "---\nnotion_id: abc\n---\n\n# Wire Format\n\nBody.\n",
        );
        let doc = LocalDocument::load(&path).unwrap();
        assert_eq!(doc.title, "Wire Format");
        assert_eq!(doc.category, "software");
        assert_eq!(doc.remote_id().as_deref(), Some("abc"));
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.content_hash(), content_hash("# Wire Format\n\nBody.\n"));
    }

    #[test]
    fn test_invalid_front_matter() {
        let ws = TempWorkspace::new();
        let path = ws.write("bad.md", "---\ntitle: [unclosed\n---\n\nBody\n");
        let err = LocalDocument::load(&path).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDocument { .. }));
    }

    #[test]
    fn test_final_files_are_sorted() {
        let ws = TempWorkspace::new();
        ws.write("b.md--FINAL.md", "b");
        ws.write("a.md--FINAL.md", "a");
        ws.write("draft.md", "d");
        let names: Vec<String> = final_files(ws.path(), "--FINAL.md")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md--FINAL.md", "b.md--FINAL.md"]);
    }

    #[test]
    fn test_backups_never_collide() {
        let ws = TempWorkspace::new();
        let path = ws.write("doc.md--FINAL.md", "v1");
        assert!(backup_file(&ws.file("missing.md")).unwrap().is_none());

        let first = backup_file(&path).unwrap().unwrap();
        let second = backup_file(&path).unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).unwrap(), "v1");
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("doc.md--FINAL.md."));
        assert!(name.ends_with(".bak"));
    }
}
