use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Database file does not exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Backup folder cannot be created: {path}")]
    DestinationUncreatable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Existing backup file cannot be deleted: {path}")]
    DestinationNotRemovable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Copy failed: {source_path} -> {destination}")]
    CopyFailed {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation interrupted by user")]
    Interrupted,

    #[error("Validation error: {message}")]
    Validation { message: String },
}

/// Coarse classification of an [`ExportError`], handy for matching in
/// callbacks without destructuring the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceMissing,
    DestinationUncreatable,
    DestinationNotRemovable,
    CopyFailed,
    Io,
    Config,
    Interrupted,
    Validation,
}

impl ExportError {
    /// Create a configuration error with a custom message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a validation error with a custom message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::SourceMissing { .. } => ErrorKind::SourceMissing,
            ExportError::DestinationUncreatable { .. } => ErrorKind::DestinationUncreatable,
            ExportError::DestinationNotRemovable { .. } => ErrorKind::DestinationNotRemovable,
            ExportError::CopyFailed { .. } => ErrorKind::CopyFailed,
            ExportError::Io(_) => ErrorKind::Io,
            ExportError::Config { .. } => ErrorKind::Config,
            ExportError::Interrupted => ErrorKind::Interrupted,
            ExportError::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// Check if this error only concerns a single file of the batch
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExportError::SourceMissing { .. }
                | ExportError::DestinationNotRemovable { .. }
                | ExportError::CopyFailed { .. }
        )
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::Interrupted => 130,
            ExportError::Validation { .. } => 2,
            ExportError::Config { .. } => 2,
            ExportError::DestinationUncreatable { .. } => 3,
            _ => 1,
        }
    }

    /// Provide helpful suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ExportError::SourceMissing { .. } => vec![
                "Check that the application has created its databases".to_string(),
                "Pass the databases directory with --source".to_string(),
            ],
            ExportError::DestinationUncreatable { path, .. } => vec![
                format!("Ensure the parent of {} is writable", path.display()),
                "Choose a different backup location with --destination".to_string(),
            ],
            ExportError::DestinationNotRemovable { .. } => vec![
                "Check permissions on the existing backup file".to_string(),
                "Remove the old backup manually".to_string(),
            ],
            ExportError::CopyFailed { .. } => vec![
                "Free up disk space".to_string(),
                "Check file permissions".to_string(),
            ],
            _ => vec![],
        }
    }
}
