use std::io;
use std::path::PathBuf;

/// Errors that can occur while running a rascal-build goal
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unable to prepare temporary directories for the checker: {0}")]
    ResourcePreparation(#[source] io::Error),

    #[error("Output root {} does not exist", .0.display())]
    MissingOutputRoot(PathBuf),

    #[error("Worker {worker} failed: {source}")]
    WorkerFailed {
        worker: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    #[error("Worker was cancelled before it finished")]
    Cancelled,

    #[error("{goal}: {message}")]
    ErrorsFound { goal: &'static str, message: String },

    #[error("{goal} returned non-zero exit status {exit_code}")]
    ToolFailed { goal: &'static str, exit_code: i32 },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures caused by the checked sources rather than by the build itself
    pub fn is_diagnostic_failure(&self) -> bool {
        matches!(self, Error::ErrorsFound { .. } | Error::ToolFailed { .. })
    }
}

/// Result type alias for rascal-build operations
pub type Result<T> = std::result::Result<T, Error>;
