pub mod capture_date;
mod embedded;
pub mod exiftool;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

use core_types::MetadataProfile;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use capture_date::{read_capture_date, CaptureDateError};
pub use exiftool::{ExifTool, ToolCommand, ToolError, ToolVersion};

/// Failure to tag a single file.
///
/// `ToolUnavailable` is kept apart from the per-file variants so callers can
/// point the user at reinstalling the tool instead of blaming the file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("metadata tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("metadata tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("metadata tool exited with {}: {stderr}", exit_label(.code))]
    Failed { code: Option<i32>, stderr: String },

    #[error("invalid {field} value '{value}'")]
    InvalidTag { field: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl WriteError {
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(self, Self::ToolUnavailable(_))
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Writes profile values into an image file.
///
/// Implementations are shared with the import worker thread.
pub trait MetadataWriter: Send + Sync {
    fn write(&self, path: &Path, profile: &MetadataProfile) -> Result<(), WriteError>;
}

impl<W: MetadataWriter + ?Sized> MetadataWriter for std::sync::Arc<W> {
    fn write(&self, path: &Path, profile: &MetadataProfile) -> Result<(), WriteError> {
        (**self).write(path, profile)
    }
}
