//! Uncommitted-changes warning before local writes.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Warns once per session when the docs directory has uncommitted changes.
///
/// The check is best effort: when `git` is missing or the directory is not
/// in a repository, nothing is reported.
#[derive(Debug)]
pub struct WorkingTreeCheck {
    dir: PathBuf,
    warned: AtomicBool,
}

impl WorkingTreeCheck {
    /// Creates a check for a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            warned: AtomicBool::new(false),
        }
    }

    /// Returns false if uncommitted changes were found by this call.
    ///
    /// Only the first dirty result warns; later calls return true.
    pub fn check(&self) -> bool {
        if self.warned.load(Ordering::Relaxed) {
            return true;
        }
        match dirty_entries(&self.dir) {
            Some(count) if count > 0 => {
                warn!(
                    dir = %self.dir.display(),
                    changes = count,
                    "uncommitted changes in the docs directory; commit before pulling to keep your work"
                );
                self.warned.store(true, Ordering::Relaxed);
                false
            }
            _ => true,
        }
    }

    /// Returns true once a warning has been issued.
    pub fn has_warned(&self) -> bool {
        self.warned.load(Ordering::Relaxed)
    }
}

fn dirty_entries(dir: &Path) -> Option<usize> {
    let output = Command::new("git")
        .arg("status")
        .arg("--porcelain")
        .arg("--")
        .arg(".")
        .current_dir(dir)
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            Some(stdout.lines().filter(|l| !l.trim().is_empty()).count())
        }
        Ok(out) => {
            debug!(status = ?out.status, "git status unavailable");
            None
        }
        Err(e) => {
            debug!(error = %e, "git not available");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_outside_a_repository_is_clean() {
        let dir = TempDir::new().unwrap();
        let check = WorkingTreeCheck::new(dir.path());
        assert!(check.check());
        assert!(!check.has_warned());
    }

    #[test]
    fn test_missing_directory_is_clean() {
        let check = WorkingTreeCheck::new("/definitely/not/a/dir");
        assert!(check.check());
    }
}
