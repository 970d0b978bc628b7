//! Delivery of export notifications.
//!
//! The orchestrator never calls user callbacks directly. Every notice is
//! handed to a [`Dispatcher`], which decides on which thread it runs: inline
//! on the worker, or queued for the thread that owns a [`ReportingQueue`].

use crate::error::ExportError;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

/// The two terminal notifications of an export.
pub trait ExportCallback: Send + Sync {
    /// Every file of the batch was copied.
    fn on_exported(&self);

    /// One file failed. Called once per failing file.
    fn on_failure(&self, error: &ExportError);
}

/// Adapts a pair of closures to [`ExportCallback`].
pub struct FnCallback<S, F> {
    on_exported: S,
    on_failure: F,
}

impl<S, F> FnCallback<S, F>
where
    S: Fn() + Send + Sync,
    F: Fn(&ExportError) + Send + Sync,
{
    pub fn new(on_exported: S, on_failure: F) -> Self {
        Self {
            on_exported,
            on_failure,
        }
    }
}

impl<S, F> ExportCallback for FnCallback<S, F>
where
    S: Fn() + Send + Sync,
    F: Fn(&ExportError) + Send + Sync,
{
    fn on_exported(&self) {
        (self.on_exported)()
    }

    fn on_failure(&self, error: &ExportError) {
        (self.on_failure)(error)
    }
}

/// A unit of work to run on the reporting context.
pub type Notice = Box<dyn FnOnce() + Send + 'static>;

/// Runs notices on the caller's chosen execution context.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, notice: Notice);
}

/// Runs every notice immediately on the dispatching thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Dispatcher for Inline {
    fn dispatch(&self, notice: Notice) {
        notice()
    }
}

/// Sending half of a reporting queue, handed to the exporter.
#[derive(Clone)]
pub struct QueueDispatcher {
    sender: Arc<Mutex<Sender<Notice>>>,
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, notice: Notice) {
        if let Ok(sender) = self.sender.lock() {
            // Receiver gone means nobody is listening any more
            let _ = sender.send(notice);
        }
    }
}

/// Receiving half: notices run on whichever thread drains it.
pub struct ReportingQueue {
    receiver: Receiver<Notice>,
}

/// Create a connected dispatcher / queue pair.
pub fn reporting_queue() -> (QueueDispatcher, ReportingQueue) {
    let (sender, receiver) = mpsc::channel();
    (
        QueueDispatcher {
            sender: Arc::new(Mutex::new(sender)),
        },
        ReportingQueue { receiver },
    )
}

impl ReportingQueue {
    /// Run the notices already queued without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(notice) => {
                    notice();
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return ran,
            }
        }
    }

    /// Block, running notices as they arrive, until every dispatcher is dropped.
    pub fn run_until_closed(&self) -> usize {
        let mut ran = 0;
        while let Ok(notice) = self.receiver.recv() {
            notice();
            ran += 1;
        }
        ran
    }
}

/// Pairs the caller's callback with its reporting context.
#[derive(Clone)]
pub struct Reporter {
    callback: Arc<dyn ExportCallback>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Reporter {
    pub fn new(callback: Arc<dyn ExportCallback>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            callback,
            dispatcher,
        }
    }

    /// Report on the calling thread
    pub fn inline(callback: impl ExportCallback + 'static) -> Self {
        Self::new(Arc::new(callback), Arc::new(Inline))
    }

    pub fn exported(&self) {
        let callback = Arc::clone(&self.callback);
        self.dispatcher.dispatch(Box::new(move || callback.on_exported()));
    }

    pub fn failure(&self, error: Arc<ExportError>) {
        let callback = Arc::clone(&self.callback);
        self.dispatcher.dispatch(Box::new(move || callback.on_failure(&error)));
    }

    /// Run an arbitrary notice on the same reporting context
    pub fn dispatch(&self, notice: Notice) {
        self.dispatcher.dispatch(notice)
    }
}
