//! Error types for fieldndvi

use thiserror::Error;

/// Main error type for fieldndvi operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raster content does not have the expected layout (band count, encoding).
    #[error("Format error: {0}")]
    Format(String),

    /// Boundary is empty, malformed, or does not overlap the raster.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Nothing left to aggregate.
    #[error("Empty input: {0}")]
    EmptyInput(String),

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

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        match e {
            tiff::TiffError::IoError(io) => Error::Io(io),
            other => Error::Format(format!("TIFF decode error: {}", other)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Io(e.into())
        } else {
            Error::Geometry(format!("invalid GeoJSON: {}", e))
        }
    }
}

/// Result type alias for fieldndvi operations
pub type Result<T> = std::result::Result<T, Error>;
