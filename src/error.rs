//! Error taxonomy for extraction, solving and orchestration.

use thiserror::Error;

/// Source extraction failed for the image.
///
/// Extraction failures are recoverable: every partition that depends on the
/// extraction reports them as a not-solved outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The image buffer does not match its statistics or is otherwise malformed.
    #[error("invalid image: {0}")]
    InvalidImage(String),
    /// Extraction (and filtering) left no usable stars.
    #[error("no stars found in image")]
    NoStars,
    /// The extractor reported a failure of its own.
    #[error("extraction failed: {0}")]
    Failed(String),
}

/// The external solve operation could not run to completion.
///
/// Fatal to the partition that raised it only; sibling partitions continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveExecutionError {
    /// Index data required for the partition's scale range is missing or corrupt.
    #[error("missing or unreadable index data: {0}")]
    MissingIndex(String),
    /// An out-of-process solver exited abnormally.
    #[error("external solver failed: {0}")]
    ToolFailure(String),
    /// Scratch file or marker handling failed.
    #[error("i/o error: {0}")]
    Io(String),
    /// The worker thread running the partition panicked.
    #[error("solve task panicked")]
    TaskPanicked,
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for SolveExecutionError {
    fn from(err: std::io::Error) -> Self {
        SolveExecutionError::Io(err.to_string())
    }
}

/// Two partitions attempted to commit a winner for the same session.
///
/// This is a defect in the orchestrator, never a runtime condition callers
/// are expected to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("partition {attempted} tried to commit a winner after partition {committed} already won")]
pub struct InvariantViolation {
    pub committed: usize,
    pub attempted: usize,
}

/// Logging could not be initialised.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("could not open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialised,
}
