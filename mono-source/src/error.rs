//! Error types for mono-source
//!
//! Every open-time failure is fatal to that open attempt. Short reads are
//! not errors, and close failures are reported without blocking teardown.

use thiserror::Error;

/// Main error type for mono-source
#[derive(Error, Debug)]
pub enum Error {
    /// Bad path or parameters supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The decoder could not open or parse the file
    #[error("Failed opening {path}: {reason}")]
    Open { path: String, reason: String },

    /// Computed scratch buffer would exceed the fixed ceiling
    #[error("Not able to process more than {max} frames of {channels} channels (requested {frames})")]
    Capacity {
        frames: usize,
        channels: usize,
        max: usize,
    },

    /// Requested rate conversion cannot be served block-for-block
    #[error("Can not resample from {from}Hz to {to}Hz: {reason}")]
    UnsupportedRatio { from: u32, to: u32, reason: String },

    /// The decoder reported a failure while releasing its handle
    #[error("Error closing file {path}: {reason}")]
    Close { path: String, reason: String },

    /// Resampler construction or processing failure
    #[error("Resampling error: {0}")]
    Resample(String),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using mono-source Error
pub type Result<T> = std::result::Result<T, Error>;
