use std::path::{Path, PathBuf};

/// What the orchestrator does after a file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Abort the remaining batch at the first failing file.
    #[default]
    FailFast,
    /// Attempt every file and report each failure. Opt-in: the batch still
    /// fails if any single file failed, but later files are copied anyway.
    ContinueOnError,
}

/// Immutable description of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub source_directory: PathBuf,
    pub destination_directory: PathBuf,
    pub backup_prefix: String,
    pub policy: BatchPolicy,
}

impl ExportRequest {
    pub fn new(
        source_directory: impl Into<PathBuf>,
        destination_directory: impl Into<PathBuf>,
        backup_prefix: impl Into<String>,
    ) -> Self {
        Self {
            source_directory: source_directory.into(),
            destination_directory: destination_directory.into(),
            backup_prefix: backup_prefix.into(),
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn source_directory(&self) -> &Path {
        &self.source_directory
    }

    pub fn destination_directory(&self) -> &Path {
        &self.destination_directory
    }
}
