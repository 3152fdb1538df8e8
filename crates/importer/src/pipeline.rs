use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime};
use core_types::{DateSource, ItemStatus, MetadataProfile, OrganizeMode};
use metadata::{read_capture_date, MetadataWriter, WriteError};
use tracing::{debug, error, info, warn};

use crate::copy::{available_name, copy_atomic};
use crate::folder::FolderFormat;
use crate::progress::{CancellationFlag, ImportProgress, ProgressSink};
use crate::report::{display_name, ImportItem, ImportResult, ItemError, RunOutcome};
use crate::request::ImportRequest;
use crate::Result;

/// Copies files into date folders and tags the copies.
///
/// The pipeline itself is stateless between runs; everything a run produces
/// ends up in the returned [`ImportResult`].
pub struct ImportPipeline {
    writer: Option<Arc<dyn MetadataWriter>>,
    clock: fn() -> NaiveDateTime,
}

impl fmt::Debug for ImportPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportPipeline")
            .field("writer", &self.writer.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl ImportPipeline {
    pub fn new() -> Self {
        Self {
            writer: None,
            clock: local_now,
        }
    }

    pub fn with_writer<W: MetadataWriter + 'static>(mut self, writer: W) -> Self {
        self.writer = Some(Arc::new(writer));
        self
    }

    /// Replaces the wall clock read once at run start for `ImportDate` runs.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    /// Imports `request.sources` in order.
    ///
    /// Configuration problems fail the whole call before anything is copied.
    /// Per-file problems are recorded on the items and the run continues.
    pub fn run(
        &self,
        request: &ImportRequest,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationFlag,
    ) -> Result<ImportResult> {
        let total = request.sources.len();
        let mut result = ImportResult::new(total);
        if total == 0 {
            info!("no files selected, nothing to import");
            sink.on_run_complete(&result);
            return Ok(result);
        }

        let format = FolderFormat::parse(&request.folder_format)?;
        request.prepare_roots()?;
        let run_start = (self.clock)();
        info!(
            files = total,
            destination = %request.destination.display(),
            backup = ?request.backup,
            mode = %request.mode,
            folder_format = format.pattern(),
            tagging = request.profile.is_some(),
            "import started"
        );

        for source in &request.sources {
            if cancel.is_canceled() {
                info!(attempted = result.attempted, "import cancelled");
                result.outcome = RunOutcome::Cancelled;
                break;
            }
            if !request.destination.is_dir() {
                let reason = format!(
                    "destination folder {} is no longer available",
                    request.destination.display()
                );
                error!(attempted = result.attempted, %reason, "import aborted");
                result.outcome = RunOutcome::Aborted { reason };
                break;
            }

            sink.on_item_start(source);
            let item = self.import_item(request, &format, run_start, source);
            let lost = if item.destination.is_none() && item.has_copy_error() {
                destination_unwritable(&request.destination)
            } else {
                None
            };
            let progress = ImportProgress {
                completed: result.attempted + 1,
                total,
                current: item.file_name(),
                status: item.status,
            };
            sink.on_item_done(&item, &progress);
            result.record(item);

            if let Some(reason) = lost {
                error!(attempted = result.attempted, %reason, "import aborted");
                result.outcome = RunOutcome::Aborted { reason };
                break;
            }
        }

        info!(
            attempted = result.attempted,
            copied = result.copied,
            tagged = result.metadata_applied,
            failed = result.failed,
            "import finished"
        );
        sink.on_run_complete(&result);
        Ok(result)
    }

    fn import_item(
        &self,
        request: &ImportRequest,
        format: &FolderFormat,
        run_start: NaiveDateTime,
        source: &Path,
    ) -> ImportItem {
        let mut item = ImportItem::pending(source);

        let (date, date_source) = match resolve_date(request.mode, source, run_start) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(?source, %err, "cannot read source file");
                return item.fail_copy(source, format!("cannot read source: {err}"));
            }
        };
        item.date = Some(date);
        item.date_source = Some(date_source);

        let subfolder = match format.subfolder(&date) {
            Ok(subfolder) => subfolder,
            Err(err) => return item.fail_copy(source, err.to_string()),
        };
        let Some(file_name) = source.file_name() else {
            return item.fail_copy(source, "source has no file name");
        };

        let dest_dir = request.destination.join(&subfolder);
        if let Err(err) = fs::create_dir_all(&dest_dir) {
            warn!(folder = ?dest_dir, %err, "cannot create destination folder");
            return item.fail_copy(&dest_dir, format!("cannot create folder: {err}"));
        }
        let backup_dir = request.backup.as_ref().map(|root| root.join(&subfolder));
        item.subfolder = Some(subfolder);

        let mut taken_in: Vec<&Path> = vec![dest_dir.as_path()];
        if let Some(dir) = &backup_dir {
            taken_in.push(dir);
        }
        let name = available_name(file_name, &taken_in);
        if name.as_os_str() != file_name {
            debug!(?source, renamed = %display_name(Path::new(&name)), "name taken, using suffix");
        }

        let target = dest_dir.join(&name);
        if let Err(err) = copy_atomic(source, &target) {
            warn!(?source, ?target, %err, "copy failed");
            return item.fail_copy(&target, err.to_string());
        }
        debug!(?source, ?target, "copied");
        item.destination = Some(target);
        item.status = ItemStatus::Copied;

        if let (Some(root), Some(dir)) = (&request.backup, &backup_dir) {
            let target = dir.join(&name);
            match copy_to_backup(root, dir, source, &target) {
                Ok(()) => item.backup = Some(target),
                Err(err) => {
                    warn!(?source, ?target, %err, "backup copy failed");
                    item.errors.push(ItemError::Copy {
                        path: target,
                        message: err.to_string(),
                    });
                }
            }
        }

        if let Some(profile) = &request.profile {
            self.tag_copies(&mut item, profile);
        }
        item
    }

    fn tag_copies(&self, item: &mut ImportItem, profile: &MetadataProfile) {
        let copies: Vec<PathBuf> = item
            .destination
            .iter()
            .chain(item.backup.iter())
            .cloned()
            .collect();

        let mut all_tagged = true;
        for copy in copies {
            if let Err(error) = self.tag(&copy, profile) {
                warn!(path = ?copy, %error, "metadata write failed, keeping untagged copy");
                item.errors.push(ItemError::MetadataWrite { path: copy, error });
                all_tagged = false;
            }
        }
        if all_tagged && item.status == ItemStatus::Copied {
            item.status = ItemStatus::MetadataApplied;
        }
    }

    fn tag(&self, path: &Path, profile: &MetadataProfile) -> std::result::Result<(), WriteError> {
        if profile.is_empty() {
            return Ok(());
        }
        match &self.writer {
            Some(writer) => writer.write(path, profile),
            None => Err(WriteError::ToolUnavailable(
                "no metadata tool configured".to_string(),
            )),
        }
    }
}

/// Runs one import with a throwaway pipeline.
pub fn run_import(
    request: &ImportRequest,
    writer: Option<Arc<dyn MetadataWriter>>,
    sink: &mut dyn ProgressSink,
    cancel: &CancellationFlag,
) -> Result<ImportResult> {
    let pipeline = ImportPipeline {
        writer,
        ..ImportPipeline::new()
    };
    pipeline.run(request, sink, cancel)
}

fn resolve_date(
    mode: OrganizeMode,
    source: &Path,
    run_start: NaiveDateTime,
) -> io::Result<(NaiveDateTime, DateSource)> {
    if mode == OrganizeMode::ImportDate {
        return Ok((run_start, DateSource::ImportStart));
    }

    match read_capture_date(source) {
        Ok(Some(date)) => return Ok((date, DateSource::Capture)),
        Ok(None) => info!(?source, "no capture date, using file modification time"),
        Err(err) => info!(?source, %err, "unreadable capture date, using file modification time"),
    }
    let modified = fs::metadata(source)?.modified()?;
    Ok((
        DateTime::<Local>::from(modified).naive_local(),
        DateSource::ModifiedTime,
    ))
}

/// Re-checks the destination root after a failed copy. `Some(reason)` when
/// nothing more can be written there (read-only remount, full volume).
fn destination_unwritable(root: &Path) -> Option<String> {
    match tempfile::tempfile_in(root) {
        Ok(_) => None,
        Err(err) => Some(format!(
            "destination folder {} is no longer writable: {err}",
            root.display()
        )),
    }
}

fn copy_to_backup(root: &Path, dir: &Path, source: &Path, target: &Path) -> io::Result<()> {
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("backup folder {} is no longer available", root.display()),
        ));
    }
    fs::create_dir_all(dir)?;
    copy_atomic(source, target)
}
