use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for rfc-translator-core
///
/// The first three variants are the "mid-run" interruptions: the pipeline
/// catches them, checkpoints the document and reports an interrupted run
/// instead of failing.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Interruptions
    // ==========================================================================
    /// Backend detected abuse or answered with something unparseable/empty
    #[error("translation backend blocked or unavailable: {0}")]
    BackendBlocked(String),

    /// Backend answered, but the expected result element was not there
    #[error("translation result element not found: {0}")]
    BackendElementMissing(String),

    /// External interrupt (Ctrl-C or a shutdown future)
    #[error("translation cancelled by user")]
    UserCancelled,

    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// Source or checkpoint file is not a valid document
    #[error("malformed document {}: {reason}", path.display())]
    MalformedSource { path: PathBuf, reason: String },

    /// Neither a source nor a checkpoint exists for the document
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    // ==========================================================================
    // Backend Setup Errors
    // ==========================================================================
    /// Failed to set up or talk to the backend outside of a translation call
    #[error("translation backend request failed: {0}")]
    BackendRequest(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the pipeline should checkpoint and stop rather than fail.
    pub const fn is_interruption(&self) -> bool {
        matches!(
            self,
            Self::BackendBlocked(_) | Self::BackendElementMissing(_) | Self::UserCancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
