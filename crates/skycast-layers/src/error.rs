//! Error types for the skycast-layers crate.
//!
//! This module defines error types for network layer operations,
//! including shape mismatches, configuration errors, and missing state.

use thiserror::Error;

/// Error type for layer operations.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Shape mismatch between expected and actual tensor shapes.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape
        expected: Vec<usize>,
        /// The actual shape that was provided
        actual: Vec<usize>,
    },

    /// Invalid input dimension for the layer.
    #[error("Invalid input dimension: expected {expected}, got {actual}")]
    InvalidInputDimension {
        /// The expected input dimension
        expected: usize,
        /// The actual input dimension
        actual: usize,
    },

    /// Invalid output dimension for the layer.
    #[error("Invalid output dimension: expected {expected}, got {actual}")]
    InvalidOutputDimension {
        /// The expected output dimension
        expected: usize,
        /// The actual output dimension
        actual: usize,
    },

    /// Error during forward pass computation.
    #[error("Forward pass error: {message}")]
    ForwardError {
        /// Description of the forward pass error
        message: String,
    },

    /// Layer has not been run forward in training mode before backward.
    #[error("Layer not initialized: forward pass must be called before backward pass")]
    NotInitialized,

    /// Configuration error for the layer.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },
}

/// Result type alias for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;
