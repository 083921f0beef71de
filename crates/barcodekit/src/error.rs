//! Error types for the barcodekit library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for barcodekit operations.
#[derive(Debug, Error)]
pub enum BarcodekitError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV/TSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Empty input file.
    #[error("Empty input: {0}")]
    EmptyInput(PathBuf),

    /// Required header columns missing from a TSV input.
    #[error("Required headers missing in '{path}' (need {needed})")]
    MissingHeaders { path: PathBuf, needed: String },

    /// Structural error in a FASTA stream.
    #[error("FASTA error in '{path}' at line {line}: {message}")]
    Fasta {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// Structural error in a TSV row.
    #[error("Parse error in '{path}' at line {line}: {message}")]
    Row {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// Data-integrity violation that would corrupt split guarantees.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BarcodekitError {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for barcodekit operations.
pub type Result<T> = std::result::Result<T, BarcodekitError>;
