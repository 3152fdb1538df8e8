use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use core_types::{DateSource, ItemStatus};
use metadata::WriteError;
use thiserror::Error;

/// A per-file problem. Never aborts the run on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("copy failed for {path}: {message}")]
    Copy { path: PathBuf, message: String },

    #[error("metadata write failed for {path}: {error}")]
    MetadataWrite { path: PathBuf, error: WriteError },
}

impl ItemError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Copy { path, .. } | Self::MetadataWrite { path, .. } => path,
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, Self::Copy { .. })
    }
}

/// One source file's journey through a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    pub source: PathBuf,
    pub date: Option<NaiveDateTime>,
    pub date_source: Option<DateSource>,
    /// Relative to the destination (and backup) root.
    pub subfolder: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub backup: Option<PathBuf>,
    pub status: ItemStatus,
    pub errors: Vec<ItemError>,
}

impl ImportItem {
    pub(crate) fn pending(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            date: None,
            date_source: None,
            subfolder: None,
            destination: None,
            backup: None,
            status: ItemStatus::Pending,
            errors: Vec::new(),
        }
    }

    pub(crate) fn fail_copy(mut self, path: &Path, message: impl Into<String>) -> Self {
        self.errors.push(ItemError::Copy {
            path: path.to_path_buf(),
            message: message.into(),
        });
        self.status = ItemStatus::Failed;
        self
    }

    pub fn has_copy_error(&self) -> bool {
        self.errors.iter().any(ItemError::is_copy)
    }

    pub fn metadata_failed(&self) -> bool {
        self.errors
            .iter()
            .any(|err| matches!(err, ItemError::MetadataWrite { .. }))
    }

    /// The first problem recorded for this item.
    pub fn error(&self) -> Option<&ItemError> {
        self.errors.first()
    }

    pub fn file_name(&self) -> String {
        display_name(&self.source)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunOutcome {
    #[default]
    Completed,
    /// Stopped by the caller; remaining files were not attempted.
    Cancelled,
    /// Stopped because the destination root disappeared.
    Aborted { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub requested: usize,
    pub attempted: usize,
    /// Files that reached the destination, tagged or not.
    pub copied: usize,
    pub metadata_applied: usize,
    /// Items with any error, including copied files whose tagging failed.
    pub failed: usize,
    pub failures: Vec<ImportItem>,
    pub items: Vec<ImportItem>,
    pub outcome: RunOutcome,
}

impl ImportResult {
    pub(crate) fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, item: ImportItem) {
        self.attempted += 1;
        if item.status.is_copied() {
            self.copied += 1;
        }
        if item.status == ItemStatus::MetadataApplied {
            self.metadata_applied += 1;
        }
        if !item.errors.is_empty() {
            self.failed += 1;
            self.failures.push(item.clone());
        }
        self.items.push(item);
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }

    /// Files that were never attempted because the run stopped early.
    pub fn skipped(&self) -> usize {
        self.requested.saturating_sub(self.attempted)
    }
}
