//! Error types for SigProbe

use thiserror::Error;

/// Result type alias using SigProbe Error
pub type Result<T> = std::result::Result<T, Error>;

/// SigProbe error types
#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    #[error("Invalid probe definition: {path} - {message}")]
    InvalidProbeDefinition { path: String, message: String },

    #[error("Invalid probe '{name}': {message}")]
    InvalidProbe { name: String, message: String },

    #[error("Invalid host on line {line}: {message}")]
    InvalidHost { line: usize, message: String },

    #[error("No probes loaded from {path}")]
    NoProbes { path: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    // === Run Errors ===
    #[error("Worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },
}

impl Error {
    /// Get an error code for logging
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidProbeDefinition { .. } => "INVALID_PROBE_DEF",
            Error::InvalidProbe { .. } => "INVALID_PROBE",
            Error::InvalidHost { .. } => "INVALID_HOST",
            Error::NoProbes { .. } => "NO_PROBES",
            Error::Configuration(_) => "CONFIG_ERROR",
            Error::InvalidConfig { .. } => "INVALID_CONFIG",
            Error::WorkerFailed { .. } => "WORKER_FAILED",
            Error::Io(_) => "IO_ERROR",
            Error::FileNotFound { .. } => "FILE_NOT_FOUND",
        }
    }
}
