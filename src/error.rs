//! Error types for the cellprep library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid count value '{value}' at row {row}, column {col}")]
    InvalidCount {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Expected input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Unknown normalization method '{0}' (expected 'log_cpm' or 'pearson_residuals')")]
    UnknownNormalization(String),

    #[error("Clustering algorithm '{name}' not found. Available: {available:?}")]
    AlgorithmNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, PrepError>;
