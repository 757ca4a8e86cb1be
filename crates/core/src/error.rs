//! Error types for encal

use thiserror::Error;

/// Main error type for encal operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Class {value} at ({row}, {col}) is outside 0..{classes}")]
    ClassOutOfRange {
        row: usize,
        col: usize,
        value: i64,
        classes: usize,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error on a named parameter
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for encal operations
pub type Result<T> = std::result::Result<T, Error>;
