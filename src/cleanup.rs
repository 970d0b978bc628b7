use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Tracks backup files that are currently being written, so an interrupt
/// handler can remove half-written copies before the process exits.
#[derive(Clone, Default)]
pub struct CleanupRegistry {
    active: Arc<Mutex<HashSet<PathBuf>>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a destination file about to be written
    pub fn register(&self, destination: PathBuf) -> PartialFileGuard {
        if let Ok(mut active) = self.active.lock() {
            active.insert(destination.clone());
        }
        PartialFileGuard {
            destination,
            registry: self.clone(),
            completed: false,
        }
    }

    /// Snapshot of destinations currently being written
    pub fn active(&self) -> Vec<PathBuf> {
        self.active
            .lock()
            .map(|active| active.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Delete every in-flight destination file. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        for destination in self.active() {
            match remove_partial(&destination) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    path = %destination.display(),
                    error = %e,
                    "Could not clean up incomplete backup"
                ),
            }
        }

        if let Ok(mut active) = self.active.lock() {
            active.clear();
        }
        removed
    }

    fn remove(&self, destination: &Path) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(destination);
        }
    }
}

/// Removes its destination on drop unless [`PartialFileGuard::complete`] was called.
pub struct PartialFileGuard {
    destination: PathBuf,
    registry: CleanupRegistry,
    completed: bool,
}

impl PartialFileGuard {
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Mark the copy as finished; the file is kept
    pub fn complete(mut self) {
        self.registry.remove(&self.destination);
        self.completed = true;
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        match remove_partial(&self.destination) {
            Ok(true) => debug!(path = %self.destination.display(), "Removed incomplete backup"),
            Ok(false) => {}
            Err(e) => warn!(
                path = %self.destination.display(),
                error = %e,
                "Could not remove incomplete backup"
            ),
        }
        self.registry.remove(&self.destination);
    }
}

fn remove_partial(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
