use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::pipeline::ImportPipeline;
use crate::progress::{CancellationFlag, ProgressSink};
use crate::report::ImportResult;
use crate::request::ImportRequest;
use crate::{ImportError, Result};

/// Runs imports on a background thread, one at a time.
#[derive(Debug, Clone)]
pub struct ImportRunner {
    pipeline: Arc<ImportPipeline>,
    active: Arc<AtomicBool>,
}

impl ImportRunner {
    pub fn new(pipeline: ImportPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Starts `request` on a new worker thread. Fails with
    /// [`ImportError::Busy`] while an earlier run is still going.
    pub fn start<S>(&self, request: ImportRequest, mut sink: S) -> Result<ImportHandle>
    where
        S: ProgressSink + 'static,
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ImportError::Busy);
        }
        let guard = ActiveGuard(self.active.clone());

        let cancel = CancellationFlag::default();
        let worker_cancel = cancel.clone();
        let pipeline = self.pipeline.clone();
        let worker = thread::Builder::new()
            .name("import-worker".to_string())
            .spawn(move || {
                let _guard = guard;
                debug!(files = request.sources.len(), "import worker started");
                pipeline.run(&request, &mut sink, &worker_cancel)
            })?;

        Ok(ImportHandle { cancel, worker })
    }
}

/// Clears the running flag however the worker exits.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct ImportHandle {
    cancel: CancellationFlag,
    worker: JoinHandle<Result<ImportResult>>,
}

impl ImportHandle {
    /// Asks the worker to stop after the current file.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the worker and returns its result.
    pub fn join(self) -> Result<ImportResult> {
        self.worker
            .join()
            .map_err(|_| ImportError::WorkerPanicked)?
    }
}
