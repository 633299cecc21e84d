//! Configuration for the sync engine.

use blocksync_model::Block;
use std::path::{Path, PathBuf};

/// Default state file name, relative to the docs directory.
pub const DEFAULT_STATE_FILE: &str = ".notion_sync_state.json";

/// Default suffix of documents considered final.
pub const DEFAULT_FILE_SUFFIX: &str = "--FINAL.md";

/// Name of the title property on database rows.
pub const TITLE_PROPERTY: &str = "Title";

/// Where pushed documents are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    /// Rows of one database, with mapped properties.
    Database(String),
    /// Sub-pages of per-category parent pages, taken from the state file's
    /// `categories` map.
    CategoryPages,
}

/// Minimum size a document must have before it is pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    /// Minimum body characters, front matter excluded.
    pub min_chars: usize,
    /// Minimum non-empty top-level blocks.
    pub min_blocks: usize,
    /// Whether the gate is applied at all.
    pub enabled: bool,
}

impl QualityGate {
    /// Creates a gate with the given thresholds.
    pub fn new(min_chars: usize, min_blocks: usize) -> Self {
        Self {
            min_chars,
            min_blocks,
            enabled: true,
        }
    }

    /// A gate that accepts everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Checks a document body and its parsed blocks.
    ///
    /// Returns the reason for rejection, or `None` if the document passes.
    pub fn check(&self, body: &str, blocks: &[Block]) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let chars = body.trim().chars().count();
        if chars < self.min_chars {
            return Some(format!(
                "Content too short ({chars} chars < {})",
                self.min_chars
            ));
        }
        let non_empty = blocks.iter().filter(|b| !b.is_empty_paragraph()).count();
        if non_empty < self.min_blocks {
            return Some(format!(
                "Too few content blocks ({non_empty} < {})",
                self.min_blocks
            ));
        }
        None
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(400, 5)
    }
}

/// Configuration for push and pull.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the local documents.
    pub docs_dir: PathBuf,
    /// Sync state file.
    pub state_file: PathBuf,
    /// Where new documents are created.
    pub target: PushTarget,
    /// Push quality gate.
    pub quality: QualityGate,
    /// Warn before writes when the docs directory has uncommitted changes.
    pub check_working_tree: bool,
    /// Suffix identifying final documents.
    pub file_suffix: String,
}

impl EngineConfig {
    /// Creates a configuration for a docs directory and a target.
    pub fn new(docs_dir: impl Into<PathBuf>, target: PushTarget) -> Self {
        let docs_dir = docs_dir.into();
        Self {
            state_file: docs_dir.join(DEFAULT_STATE_FILE),
            docs_dir,
            target,
            quality: QualityGate::default(),
            check_working_tree: true,
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
        }
    }

    /// Sets the state file location.
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }

    /// Sets the quality gate.
    pub fn with_quality(mut self, quality: QualityGate) -> Self {
        self.quality = quality;
        self
    }

    /// Enables or disables the working tree check.
    pub fn with_working_tree_check(mut self, enabled: bool) -> Self {
        self.check_working_tree = enabled;
        self
    }

    /// Sets the final document suffix.
    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = suffix.into();
        self
    }

    /// Resolves a file name or path against the docs directory.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() || file.exists() {
            file.to_path_buf()
        } else {
            self.docs_dir.join(file)
        }
    }

    /// Returns true if `name` is a final document name.
    pub fn is_final_file(&self, name: &str) -> bool {
        name.ends_with(&self.file_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksync_model::RichTextRun;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::new("/docs", PushTarget::CategoryPages);
        assert_eq!(config.state_file, Path::new("/docs/.notion_sync_state.json"));
        assert_eq!(config.quality, QualityGate::new(400, 5));
        assert!(config.check_working_tree);
        assert!(config.is_final_file("250101-v-research-x.md--FINAL.md"));
        assert!(!config.is_final_file("draft.md"));
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new("/docs", PushTarget::Database("db".into()))
            .with_state_file("/tmp/state.json")
            .with_quality(QualityGate::disabled())
            .with_working_tree_check(false)
            .with_file_suffix(".md");
        assert_eq!(config.state_file, Path::new("/tmp/state.json"));
        assert!(!config.quality.enabled);
        assert!(!config.check_working_tree);
        assert_eq!(config.file_suffix, ".md");
    }

    #[test]
    fn test_quality_gate() {
        let gate = QualityGate::default();
        let blocks = |n: usize| -> Vec<Block> {
            (0..n)
                .map(|i| Block::paragraph(vec![RichTextRun::plain(format!("p{i}"))]))
                .collect()
        };

        let short = "x".repeat(300);
        assert_eq!(
            gate.check(&short, &blocks(3)).as_deref(),
            Some("Content too short (300 chars < 400)")
        );

        let long = "x".repeat(1000);
        assert_eq!(gate.check(&long, &blocks(5)), None);
        assert_eq!(
            gate.check(&long, &blocks(4)).as_deref(),
            Some("Too few content blocks (4 < 5)")
        );

        let mut padded = blocks(4);
        padded.push(Block::paragraph(Vec::new()));
        assert!(gate.check(&long, &padded).is_some());

        assert_eq!(QualityGate::disabled().check("", &[]), None);
    }
}
