//! Error types for training and artifact persistence.

use std::path::PathBuf;

use skycast_data::DataError;
use skycast_layers::LayerError;
use skycast_optimizer::OptimizerError;
use thiserror::Error;

/// Errors raised while fitting or evaluating the network.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// A layer rejected its input or was used out of order.
    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    /// The optimizer configuration is invalid.
    #[error("Optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),

    /// Loading or feature preparation failed.
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Saving or loading an artifact failed.
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// The training loss became NaN or infinite.
    #[error("Non-finite loss at epoch {epoch}, batch {batch}")]
    NonFiniteLoss {
        /// 1-based epoch
        epoch: usize,
        /// 0-based batch within the epoch
        batch: usize,
    },

    /// A partition passed to the trainer has no rows or mismatched lengths.
    #[error("Empty or inconsistent split: {0}")]
    EmptySplit(String),

    /// A training parameter is out of range.
    #[error("Invalid training configuration: {0}")]
    Config(String),
}

/// Result type alias for training operations.
pub type TrainingResult<T> = Result<T, TrainingError>;

/// Errors raised while writing or reading model and scaler files.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The model could not be encoded.
    #[error("Model encoding failed: {0}")]
    Encode(#[source] bincode::Error),

    /// The model file could not be decoded.
    #[error("Model decoding failed: {0}")]
    Decode(#[source] bincode::Error),

    /// The scaler file could not be written or parsed.
    #[error("Scaler JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The model file was written by an incompatible format.
    #[error("Model format version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build reads
        expected: u32,
        /// Version stored in the file
        found: u32,
    },

    /// The decoded artifact is internally inconsistent.
    #[error("Corrupted artifact: {0}")]
    Corrupted(String),
}

/// Result type alias for artifact operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let err: TrainingError = DataError::MissingColumn("temp".into()).into();
        assert!(matches!(err, TrainingError::Data(_)));
        assert!(err.to_string().contains("temp"));

        let err: TrainingError = LayerError::NotInitialized.into();
        assert!(matches!(err, TrainingError::Layer(_)));
    }

    #[test]
    fn test_display() {
        let err = TrainingError::NonFiniteLoss { epoch: 3, batch: 7 };
        assert_eq!(err.to_string(), "Non-finite loss at epoch 3, batch 7");

        let err = ArtifactError::VersionMismatch {
            expected: 1,
            found: 9,
        };
        assert!(err.to_string().contains("expected 1, found 9"));
    }
}
