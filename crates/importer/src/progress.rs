use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};

use core_types::ItemStatus;

use crate::report::{ImportItem, ImportResult};

/// Cooperative stop signal, polled between files.
#[derive(Clone, Default, Debug)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportProgress {
    pub completed: usize,
    pub total: usize,
    /// File name of the item just processed.
    pub current: String,
    pub status: ItemStatus,
}

impl ImportProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }
}

/// Receives run progress on the worker thread. Front ends forward these to
/// their own thread; see the `mpsc::Sender` implementation.
pub trait ProgressSink: Send {
    fn on_item_start(&mut self, _source: &Path) {}

    fn on_item_done(&mut self, _item: &ImportItem, _progress: &ImportProgress) {}

    fn on_run_complete(&mut self, _result: &ImportResult) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {}

/// Owned snapshot of a progress callback, for crossing threads.
#[derive(Debug, Clone)]
pub enum ImportEvent {
    ItemStarted(PathBuf),
    ItemDone {
        item: ImportItem,
        progress: ImportProgress,
    },
    Finished(ImportResult),
}

impl ProgressSink for mpsc::Sender<ImportEvent> {
    // A closed receiver means nobody is watching any more; the run goes on.
    fn on_item_start(&mut self, source: &Path) {
        let _ = self.send(ImportEvent::ItemStarted(source.to_path_buf()));
    }

    fn on_item_done(&mut self, item: &ImportItem, progress: &ImportProgress) {
        let _ = self.send(ImportEvent::ItemDone {
            item: item.clone(),
            progress: progress.clone(),
        });
    }

    fn on_run_complete(&mut self, result: &ImportResult) {
        let _ = self.send(ImportEvent::Finished(result.clone()));
    }
}
