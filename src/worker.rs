use crate::cleanup::CleanupRegistry;
use crate::error::ExportError;
use crate::export::{run_export_tracked, ExportReport};
use crate::notify::{Dispatcher, ExportCallback, FnCallback, Inline, Reporter};
use crate::progress::ProgressHook;
use crate::request::ExportRequest;
use crate::Result;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

const WORKER_NAME: &str = "dbexport-worker";

/// Runs exports on a dedicated background thread.
///
/// One export per instance should be in flight at a time; overlapping runs
/// against the same destination are not coordinated.
#[derive(Clone)]
pub struct Exporter {
    dispatcher: Arc<dyn Dispatcher>,
    progress: Option<Arc<dyn ProgressHook>>,
    registry: CleanupRegistry,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter {
    /// Exporter reporting inline on the worker thread, without progress
    pub fn new() -> Self {
        Self {
            dispatcher: Arc::new(Inline),
            progress: None,
            registry: CleanupRegistry::new(),
        }
    }

    /// Deliver notifications (and progress dismissal) through `dispatcher`
    pub fn with_dispatcher(mut self, dispatcher: impl Dispatcher + 'static) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressHook>) -> Self {
        self.progress = Some(Arc::from(progress));
        self
    }

    /// Destinations currently being written by this exporter's workers.
    /// Clones share the same registry, so an interrupt handler can hold one.
    pub fn registry(&self) -> &CleanupRegistry {
        &self.registry
    }

    /// Start an export and return immediately.
    ///
    /// `on_exported` fires once if every file was copied; `on_failure` fires
    /// for each failing file. Never both.
    pub fn export<S, F>(
        &self,
        request: ExportRequest,
        on_exported: S,
        on_failure: F,
    ) -> Result<ExportHandle>
    where
        S: Fn() + Send + Sync + 'static,
        F: Fn(&ExportError) + Send + Sync + 'static,
    {
        self.export_with(request, FnCallback::new(on_exported, on_failure))
    }

    /// Start an export reporting to an [`ExportCallback`] implementation
    pub fn export_with(
        &self,
        request: ExportRequest,
        callback: impl ExportCallback + 'static,
    ) -> Result<ExportHandle> {
        let reporter = Reporter::new(Arc::new(callback), Arc::clone(&self.dispatcher));
        let progress = self.progress.clone();
        let registry = self.registry.clone();

        if let Some(progress) = &progress {
            progress.show();
        }
        debug!(source = %request.source_directory.display(), "Export scheduled");

        let spawned = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let report = run_export_tracked(&request, &reporter, &registry);
                if let Some(progress) = progress {
                    reporter.dispatch(Box::new(move || progress.dismiss()));
                }
                report
            });

        match spawned {
            Ok(handle) => Ok(ExportHandle { handle }),
            Err(e) => {
                error!(error = %e, "Could not start export worker");
                if let Some(progress) = &self.progress {
                    progress.dismiss();
                }
                Err(ExportError::Io(e))
            }
        }
    }
}

/// Handle to a running export.
pub struct ExportHandle {
    handle: JoinHandle<ExportReport>,
}

impl ExportHandle {
    /// Wait for the worker and return its report
    pub fn join(self) -> Result<ExportReport> {
        self.handle.join().map_err(|_| {
            ExportError::Io(io::Error::new(
                io::ErrorKind::Other,
                "export worker panicked",
            ))
        })
    }
}
