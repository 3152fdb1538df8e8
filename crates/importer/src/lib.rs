//! Copy-and-tag import of camera files into date-named folders.

mod copy;
mod folder;
mod pipeline;
mod progress;
mod report;
mod request;
mod runner;
mod scan;

use std::io;
use thiserror::Error;

pub use folder::FolderFormat;
pub use pipeline::{run_import, ImportPipeline};
pub use progress::{CancellationFlag, ImportEvent, ImportProgress, NoopSink, ProgressSink};
pub use report::{ImportItem, ImportResult, ItemError, RunOutcome};
pub use request::ImportRequest;
pub use runner::{ImportHandle, ImportRunner};
pub use scan::{is_supported_extension, scan_source_folder, SUPPORTED_EXTENSIONS};

/// Errors that stop a run as a whole. Per-file problems are [`ItemError`]s
/// recorded in the [`ImportResult`] instead.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid import configuration: {0}")]
    Configuration(String),

    #[error("An import is already running")]
    Busy,

    #[error("Could not start the import worker: {0}")]
    Worker(#[from] io::Error),

    #[error("The import worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, ImportError>;
