use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{bail, Context, Result};
use app_settings::AppSettings;
use clap::Args;
use core_types::{DateSource, OrganizeMode};
use importer::{
    scan_source_folder, ImportEvent, ImportPipeline, ImportRequest, ImportResult, ImportRunner,
    RunOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::display::{open_folder, truncate_path};
use crate::{preset, tool};

const STATUS_WIDTH: usize = 50;

#[derive(Args)]
pub struct ImportArgs {
    /// Files to import, or card folders to scan (defaults to the last source folder)
    pub sources: Vec<PathBuf>,

    /// Destination root (defaults to the last one used)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Second root that mirrors the destination layout
    #[arg(short, long)]
    pub backup: Option<PathBuf>,

    /// Skip the saved backup root for this run
    #[arg(long, conflicts_with = "backup")]
    pub no_backup: bool,

    /// shot-date or import-date
    #[arg(short, long)]
    pub mode: Option<OrganizeMode>,

    /// Date pattern for subfolders, e.g. %Y-%m-%d or %Y/%m
    #[arg(short, long)]
    pub format: Option<String>,

    /// Tag the copies with this saved preset
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Do not tag the copies, even if a preset was used last time
    #[arg(long, conflicts_with = "preset")]
    pub no_tags: bool,

    /// Also scan subfolders of source folders
    #[arg(short, long)]
    pub recursive: bool,

    /// Open the destination in the file manager afterwards
    #[arg(long)]
    pub open: bool,
}

pub fn run(args: ImportArgs, settings: &mut AppSettings) -> Result<()> {
    let source_roots = if args.sources.is_empty() {
        let last = settings
            .last_source
            .clone()
            .context("no sources given and no previous source folder saved")?;
        vec![last]
    } else {
        args.sources.clone()
    };
    let sources = collect_sources(&source_roots, args.recursive)?;

    let destination = args
        .dest
        .clone()
        .or_else(|| settings.last_destination.clone())
        .context("no destination given and none saved; pass --dest")?;
    let backup = if args.no_backup {
        None
    } else {
        args.backup.clone().or_else(|| settings.last_backup.clone())
    };
    let preset_name = if args.no_tags {
        None
    } else {
        args.preset.clone().or_else(|| settings.last_preset.clone())
    };
    let profile = match &preset_name {
        Some(name) => Some(
            preset::open_store()?
                .load(name)
                .with_context(|| format!("loading preset '{name}'"))?,
        ),
        None => None,
    };

    let mut request = ImportRequest::new(sources, &destination)
        .with_mode(args.mode.unwrap_or(settings.organize_mode))
        .with_folder_format(
            args.format
                .clone()
                .unwrap_or_else(|| settings.folder_format.clone()),
        );
    request.backup = backup.clone();
    request.profile = profile;
    request.open_destination = args.open || settings.open_destination;

    let mut pipeline = ImportPipeline::new();
    if request.profile.is_some() {
        match tool::locate(&settings.exiftool) {
            Ok(exiftool) => pipeline = pipeline.with_writer(exiftool),
            Err(err) => warn!("{err:#}"),
        }
        if !pipeline.has_writer() {
            warn!("ExifTool unavailable, copies will not be tagged");
        }
    }

    let result = run_with_progress(ImportRunner::new(pipeline), request.clone())?;
    print_summary(&result, &destination);

    settings.last_source = source_roots.first().map(|root| source_folder(root));
    settings.record_destination(destination.clone());
    settings.last_backup = backup;
    settings.organize_mode = request.mode;
    settings.folder_format = request.folder_format.clone();
    if preset_name.is_some() {
        settings.last_preset = preset_name;
    }
    if let Err(err) = settings.save() {
        warn!(%err, "could not save settings");
    }

    if request.open_destination && result.copied > 0 {
        if let Err(err) = open_folder(&destination) {
            warn!(%err, "could not open the destination folder");
        }
    }

    if result.failed > 0 {
        bail!("{} of {} file(s) had problems", result.failed, result.attempted);
    }
    Ok(())
}

/// Expands folders into their importable files; plain files pass through.
fn collect_sources(roots: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for root in roots {
        if root.is_dir() {
            let found = scan_source_folder(root, recursive)
                .with_context(|| format!("scanning {}", root.display()))?;
            info!(folder = %root.display(), files = found.len(), "scanned source folder");
            out.extend(found);
        } else {
            out.push(root.clone());
        }
    }
    Ok(out)
}

fn source_folder(root: &Path) -> PathBuf {
    if root.is_dir() {
        root.to_path_buf()
    } else {
        root.parent().map(Path::to_path_buf).unwrap_or_default()
    }
}

fn run_with_progress(runner: ImportRunner, request: ImportRequest) -> Result<ImportResult> {
    let bar = ProgressBar::new(request.sources.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")?,
    );

    let (tx, rx) = mpsc::channel();
    let handle = runner.start(request, tx)?;
    for event in rx {
        match event {
            ImportEvent::ItemStarted(path) => {
                bar.set_message(truncate_path(&path, STATUS_WIDTH));
            }
            ImportEvent::ItemDone { item, progress } => {
                bar.set_position(progress.completed as u64);
                for err in &item.errors {
                    bar.println(format!("{}: {err}", item.file_name()));
                }
            }
            ImportEvent::Finished(_) => {}
        }
    }
    let result = handle.join()?;
    bar.finish_and_clear();
    Ok(result)
}

fn print_summary(result: &ImportResult, destination: &Path) {
    if result.requested == 0 {
        println!("No images found.");
        return;
    }

    match &result.outcome {
        RunOutcome::Completed => {}
        RunOutcome::Cancelled => println!(
            "Import cancelled, {} file(s) not attempted.",
            result.skipped()
        ),
        RunOutcome::Aborted { reason } => println!(
            "Import stopped: {reason}. {} file(s) not attempted.",
            result.skipped()
        ),
    }
    let undated = result
        .items
        .iter()
        .filter(|item| item.date_source.is_some_and(DateSource::is_fallback))
        .count();
    if undated > 0 {
        println!("{undated} file(s) had no capture date; filed by modification time.");
    }
    println!(
        "Copied {} of {} file(s) into {} ({} tagged, {} with problems)",
        result.copied,
        result.requested,
        truncate_path(destination, STATUS_WIDTH),
        result.metadata_applied,
        result.failed
    );
}
