//! Error types for the shelter outcome library

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A named column is absent from a table
    #[error("Column not found: {0}")]
    MissingColumn(String),

    /// Two tables that must share a layout do not
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A value was not seen when the encoder was fitted
    #[error("Unseen category '{value}' in column '{column}'")]
    UnseenCategory { column: String, value: String },

    /// ndarray rejected a reshape or concatenation
    #[error("Array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Array or row counts disagree
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Shorthand for a row/column count mismatch
    pub fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        Error::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
