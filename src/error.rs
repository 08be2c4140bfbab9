//! Error types for the media checker

use std::path::PathBuf;
use thiserror::Error;

/// Error kinds that abort a run before or around the check itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Permission denied when accessing a file or directory
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Check path is neither a regular file nor a directory
    InvalidPath,
    /// I/O error during file operations
    IoError,
    /// Writing the CSV report failed
    ReportError,
    /// The worker pool could not be started
    WorkerPool,
}

/// Represents a run-level fault (setup, traversal root, report output)
#[derive(Debug, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct ScanError {
    /// The kind of error
    pub kind: ScanErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl ScanError {
    /// Create a new scan error
    pub fn new(kind: ScanErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: PathBuf) -> Self {
        Self::new(
            ScanErrorKind::InvalidPath,
            Some(path.clone()),
            format!("Not a file or directory: {:?}", path),
        )
    }

    /// Attach a path to an error that was converted without one
    pub fn with_path(mut self, path: PathBuf) -> Self {
        if self.path.is_none() {
            self.path = Some(path);
        }
        self
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScanErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => ScanErrorKind::NotFound,
            _ => ScanErrorKind::IoError,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<csv::Error> for ScanError {
    fn from(err: csv::Error) -> Self {
        Self::new(ScanErrorKind::ReportError, None, err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for ScanError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::new(ScanErrorKind::WorkerPool, None, err.to_string())
    }
}

/// A defect found by one of the integrity probes.
///
/// The `Display` text is what ends up in the outcome and the CSV report.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Zero size file")]
    ZeroSize,

    #[error("Equal value sequence, value: {value}, len: {len}")]
    EqualRun { value: u8, len: usize },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Decode(#[from] image::ImageError),

    #[error("{tool} not available: {message}")]
    ToolUnavailable { tool: String, message: String },

    #[error("Identify error:{code}")]
    Identify { code: i32 },

    #[error("{tool} exited with status {code}: {stderr}")]
    Tool {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("probe panicked: {0}")]
    Panicked(String),
}
