//! Error types for the vizdiff engine.
//!
//! Errors are organized by stage so that a failed pair carries a message
//! naming the file and the step that broke. Pair-level errors never escape
//! the batch driver: they are recorded on the page and the run continues.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for vizdiff operations.
#[derive(Error, Debug)]
pub enum DiffError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// An environment override could not be parsed
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidEnv {
        key: String,
        value: String,
        reason: String,
    },

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Screenshot file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Writing a rendered artifact failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// The image store could not resolve or persist an artifact
    #[error("Image store error: {message}")]
    Store { message: String },

    /// The task processing a pair panicked
    #[error("Diff task aborted: {message}")]
    Panicked { message: String },
}

/// Convenience type alias for vizdiff results.
pub type Result<T> = std::result::Result<T, DiffError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
