//! Per-run report

use std::fmt;
use std::path::PathBuf;

use crate::patch::EditOperation;
use crate::upgrade::error::UpgradeError;

/// What happened to one file
#[derive(Debug)]
pub enum FileStatus {
    /// No edit changed the file (or none targeted it)
    Unchanged,
    /// New text was produced (and written unless dry-running)
    Patched { applied: usize, skipped: usize },
    Failed(UpgradeError),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    /// Patched text, present when the status is `Patched`
    pub content: Option<String>,
}

impl FileOutcome {
    pub fn unchanged(path: PathBuf) -> Self {
        Self {
            path,
            status: FileStatus::Unchanged,
            content: None,
        }
    }

    pub fn failed(path: PathBuf, error: UpgradeError) -> Self {
        Self {
            path,
            status: FileStatus::Failed(error),
            content: None,
        }
    }
}

/// Result of one upgrade run
#[derive(Debug, Default)]
pub struct UpgradeReport {
    pub files: Vec<FileOutcome>,
    /// Every edit computed for this run, in planning order
    pub edits: Vec<EditOperation>,
    pub dry_run: bool,
}

impl UpgradeReport {
    pub fn file(&self, path: &std::path::Path) -> Option<&FileOutcome> {
        self.files.iter().find(|outcome| outcome.path == path)
    }

    pub fn patched(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files
            .iter()
            .filter(|outcome| matches!(outcome.status, FileStatus::Patched { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &UpgradeError)> {
        self.files.iter().filter_map(|outcome| match &outcome.status {
            FileStatus::Failed(error) => Some((&outcome.path, error)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

impl fmt::Display for UpgradeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for edit in &self.edits {
            writeln!(f, "{edit}")?;
        }
        for outcome in &self.files {
            match &outcome.status {
                FileStatus::Unchanged => {}
                FileStatus::Patched { applied, skipped } => {
                    let verb = if self.dry_run { "would patch" } else { "patched" };
                    writeln!(
                        f,
                        "{} {} ({} applied, {} skipped)",
                        verb,
                        outcome.path.display(),
                        applied,
                        skipped
                    )?;
                }
                FileStatus::Failed(error) => writeln!(f, "failed {error}")?,
            }
        }
        Ok(())
    }
}
