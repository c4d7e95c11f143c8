//! Error types for loading and transforming weather history.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while acquiring or transforming the input table.
///
/// [`DataError::is_input_error`] separates failures to read the source from
/// failures to turn its contents into features.
#[derive(Debug, Error)]
pub enum DataError {
    /// The source file could not be opened or read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The source is not well-formed delimited text.
    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    /// The source has a header but no records.
    #[error("Input table has no records")]
    Empty,

    /// A required column is absent from the header.
    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    /// A timestamp could not be parsed after suffix stripping.
    #[error("Invalid timestamp '{value}' at row {row}")]
    InvalidTimestamp {
        /// The stripped value that failed to parse
        value: String,
        /// 1-based data row
        row: usize,
    },

    /// A numeric column contains a non-numeric value.
    #[error("Invalid number '{value}' in column '{column}' at row {row}")]
    InvalidNumber {
        /// Column name
        column: String,
        /// Offending value
        value: String,
        /// 1-based data row
        row: usize,
    },

    /// A value is still missing after forward fill.
    #[error("Column '{column}' has no value at row {row} and no earlier value to fill from")]
    UnfilledValue {
        /// Column name
        column: String,
        /// 1-based data row
        row: usize,
    },

    /// A matrix does not have the expected width.
    #[error("Shape mismatch: expected {expected} columns, got {actual}")]
    ShapeMismatch {
        /// Expected column count
        expected: usize,
        /// Actual column count
        actual: usize,
    },

    /// A split configuration cannot produce non-empty partitions.
    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    /// The synthetic generator was configured inconsistently.
    #[error("Invalid synthetic data configuration: {0}")]
    InvalidConfig(String),
}

impl DataError {
    /// Returns true for failures to acquire the input (as opposed to
    /// failures to transform it).
    pub fn is_input_error(&self) -> bool {
        matches!(self, DataError::Io { .. } | DataError::Csv(_) | DataError::Empty)
    }
}

/// Result type alias for data operations.
pub type DataResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let io = DataError::Io {
            path: PathBuf::from("missing.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        };
        assert!(io.is_input_error());
        assert!(io.to_string().contains("missing.csv"));

        assert!(DataError::Empty.is_input_error());
        assert!(!DataError::MissingColumn("temp".into()).is_input_error());

        let err = DataError::InvalidTimestamp {
            value: "yesterday".into(),
            row: 3,
        };
        assert_eq!(err.to_string(), "Invalid timestamp 'yesterday' at row 3");
    }
}
