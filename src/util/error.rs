//! Error types for the procedural core.

use std::path::PathBuf;
use thiserror::Error;

use super::{DataType, PlainOldDataType};

/// Main error type for attribute resolution and shape building.
///
/// Most of these are recoverable at the attribute or shape level: callers log
/// them and carry on with the rest of the traversal.
#[derive(Error, Debug)]
pub enum Error {
    /// POD/extent/interpretation combination has no renderer layout
    #[error("Unsupported attribute type {data_type:?} (interpretation '{interpretation}')")]
    UnsupportedType {
        data_type: DataType,
        interpretation: String,
    },

    /// POD type the decoder cannot read at all
    #[error("Unknown POD type: {0}")]
    UnknownPod(PlainOldDataType),

    /// Attribute element count disagrees with the primitive topology
    #[error("Size mismatch for '{name}': expected {expected} elements, got {actual}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Property has no samples or required data is absent
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Property not found by name
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Scene node not found by path
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Sample index out of bounds
    #[error("Sample index {index} out of bounds (count: {count})")]
    SampleOutOfBounds { index: usize, count: usize },

    /// Element range outside of a vector
    #[error("Element range {start}..{end} out of bounds (count: {count})")]
    RangeOutOfBounds { start: usize, end: usize, count: usize },

    /// Two vectors were expected to share a layout
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Indexed vectors cannot be resized in place
    #[error("Cannot resize indexed attribute")]
    IndexedResize,

    /// Index refers past the end of the value table
    #[error("Index {index} out of range for {count} values")]
    InvalidIndex { index: u32, count: usize },

    /// Parameter already declared with another type
    #[error("'{name}' is declared as '{existing}', cannot redeclare as '{incoming}'")]
    DeclarationConflict {
        name: String,
        existing: String,
        incoming: String,
    },

    /// Declaration string could not be parsed
    #[error("Invalid declaration: '{0}'")]
    InvalidDeclaration(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a missing data error.
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    /// Create a size mismatch error.
    pub fn size_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported(data_type: DataType, interpretation: impl Into<String>) -> Self {
        Self::UnsupportedType {
            data_type,
            interpretation: interpretation.into(),
        }
    }
}

/// Result type alias for procedural operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::size_mismatch("Cd", 8, 7);
        let msg = e.to_string();
        assert!(msg.contains("Cd"));
        assert!(msg.contains("8"));
        assert!(msg.contains("7"));

        let e = Error::unsupported(DataType::VEC4D, "point");
        assert!(e.to_string().contains("point"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
