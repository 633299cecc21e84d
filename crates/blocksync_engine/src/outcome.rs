//! Per-document results and batch reports.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// What happened to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// A new remote document or local file was written.
    Created,
    /// An existing remote document or local file was replaced.
    Updated,
    /// Nothing needed doing, or the pull was refused in favor of a push.
    Skipped,
    /// The document failed the push quality gate.
    SkippedQuality,
    /// Both sides changed; nothing was written.
    Conflict,
    /// Dry run: a create would happen.
    WouldCreate,
    /// Dry run: an update would happen.
    WouldUpdate,
    /// The document failed.
    Error,
}

impl Action {
    /// Report name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Skipped => "skipped",
            Action::SkippedQuality => "skipped_quality",
            Action::Conflict => "conflict",
            Action::WouldCreate => "would_create",
            Action::WouldUpdate => "would_update",
            Action::Error => "error",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of pushing or pulling one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// What happened.
    pub action: Action,
    /// Local file name.
    pub file: Option<String>,
    /// Document title.
    pub title: Option<String>,
    /// Remote id.
    pub remote_id: Option<String>,
    /// Remote URL.
    pub url: Option<String>,
    /// Why, for skips, conflicts, errors and status reports.
    pub reason: Option<String>,
    /// Backup written before a local overwrite.
    pub backup: Option<PathBuf>,
}

impl Outcome {
    /// Creates an outcome with no details.
    pub fn new(action: Action) -> Self {
        Self {
            action,
            file: None,
            title: None,
            remote_id: None,
            url: None,
            reason: None,
            backup: None,
        }
    }

    /// Creates an error outcome.
    pub fn error(reason: impl fmt::Display) -> Self {
        Self::new(Action::Error).with_reason(reason.to_string())
    }

    /// Sets the local file name.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the remote id.
    pub fn with_remote_id(mut self, id: impl Into<String>) -> Self {
        self.remote_id = Some(id.into());
        self
    }

    /// Sets the remote URL.
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    /// Sets the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the backup path.
    pub fn with_backup(mut self, backup: Option<PathBuf>) -> Self {
        self.backup = backup;
        self
    }

    /// Returns true for error outcomes.
    pub fn is_error(&self) -> bool {
        self.action == Action::Error
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<15}", self.action.as_str())?;
        if let Some(file) = self.file.as_ref().or(self.title.as_ref()) {
            write!(f, " {file}")?;
        }
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

/// Outcomes of a batch, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// One outcome per document.
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an outcome.
    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    /// Number of outcomes with the given action.
    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }

    /// Counts per action, omitting actions that did not occur.
    pub fn counts(&self) -> BTreeMap<Action, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *counts.entry(outcome.action).or_insert(0) += 1;
        }
        counts
    }

    /// Returns true if any document failed.
    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(Outcome::is_error)
    }

    /// Number of documents processed.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if no documents were processed.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<String> = self
            .counts()
            .into_iter()
            .map(|(action, n)| format!("{action}: {n}"))
            .collect();
        if counts.is_empty() {
            write!(f, "no documents")
        } else {
            write!(f, "{}", counts.join(", "))
        }
    }
}

/// What a push would do with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    /// No remote document exists yet.
    WouldCreate,
    /// The remote document exists and differs from the file.
    WouldUpdate,
    /// The file matches what was last pushed.
    Synced,
}

impl PushStatus {
    /// Report name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PushStatus::WouldCreate => "would_create",
            PushStatus::WouldUpdate => "would_update",
            PushStatus::Synced => "synced",
        }
    }
}

/// Push status of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    /// Local file name.
    pub file: String,
    /// Resolved title.
    pub title: String,
    /// Resolved category.
    pub category: String,
    /// What a push would do.
    pub status: PushStatus,
}

/// Push status of every final file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    /// One entry per file, sorted by file name.
    pub entries: Vec<StatusEntry>,
    /// Files that could not be inspected, with the reason.
    pub errors: Vec<(String, String)>,
}

impl StatusReport {
    /// Number of entries with the given status.
    pub fn count(&self, status: PushStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_counts() {
        let mut report = BatchReport::new();
        report.push(Outcome::new(Action::Created).with_file("a.md"));
        report.push(Outcome::new(Action::Created).with_file("b.md"));
        report.push(Outcome::error("boom").with_file("c.md"));

        assert_eq!(report.len(), 3);
        assert_eq!(report.count(Action::Created), 2);
        assert!(report.has_errors());
        assert_eq!(report.to_string(), "created: 2, error: 1");
        assert_eq!(BatchReport::new().to_string(), "no documents");
    }

    #[test]
    fn test_outcome_display() {
        let outcome = Outcome::new(Action::Conflict)
            .with_file("a.md")
            .with_reason("conflict");
        assert_eq!(outcome.to_string(), "conflict        a.md (conflict)");
    }
}
