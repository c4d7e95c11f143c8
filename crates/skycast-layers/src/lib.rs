//! Feed-forward network layers for skycast.
//!
//! This crate provides the small set of layers needed for tabular regression:
//!
//! - **Dense layers**: Fully connected linear transformations with optional
//!   kernel regularization
//! - **Activations**: ReLU
//! - **Normalization**: Batch normalization with running statistics
//! - **Dropout**: Inverted dropout with seeded masks
//! - **Sequential**: An ordered stack of the above, built from a config
//!
//! # Quick Start
//!
//! ```
//! use skycast_layers::prelude::*;
//!
//! let mut net = SequentialConfig::new(17)
//!     .add_dense(32, ActivationType::ReLU, Regularizer::L2(0.001))
//!     .add_dense(1, ActivationType::None, Regularizer::None)
//!     .build(42)
//!     .unwrap();
//!
//! let input = Tensor::ones(&[4, 17]);
//! let output = net.forward_train(&input).unwrap();
//! net.backward(&Tensor::ones(&[4, 1])).unwrap();
//! assert_eq!(output.shape(), &[4, 1]);
//! ```
//!
//! # Layer Trait
//!
//! All layers implement the [`Layer`] trait, which provides a unified interface
//! for forward and backward passes:
//!
//! ```
//! use skycast_layers::prelude::*;
//!
//! fn process_layer<L: Layer>(layer: &L, input: &Tensor) -> Tensor {
//!     layer.forward(input).unwrap()
//! }
//! ```

#![warn(missing_docs)]

pub mod activation;
pub mod dense;
pub mod dropout;
pub mod error;
pub mod initializer;
pub mod layer;
pub mod normalization;
pub mod regularizer;
pub mod sequential;
pub mod tensor;

pub use activation::{ActivationType, ReLU};
pub use dense::Dense;
pub use dropout::Dropout;
pub use error::{LayerError, LayerResult};
pub use initializer::Initializer;
pub use layer::Layer;
pub use normalization::BatchNorm;
pub use regularizer::Regularizer;
pub use sequential::{LayerSpec, NetworkLayer, Sequential, SequentialConfig};
pub use tensor::Tensor;

/// Commonly used types.
pub mod prelude {
    pub use crate::activation::{ActivationType, ReLU};
    pub use crate::dense::Dense;
    pub use crate::dropout::Dropout;
    pub use crate::error::{LayerError, LayerResult};
    pub use crate::initializer::Initializer;
    pub use crate::layer::Layer;
    pub use crate::normalization::BatchNorm;
    pub use crate::regularizer::Regularizer;
    pub use crate::sequential::{LayerSpec, NetworkLayer, Sequential, SequentialConfig};
    pub use crate::tensor::Tensor;
}
