//! Layer trait definition for network layers.
//!
//! This module defines the core [`Layer`] trait that all layers implement,
//! providing a unified interface for forward and backward passes.

use crate::error::LayerError;
use crate::tensor::Tensor;

/// A network layer that supports forward and backward propagation.
///
/// Each layer must be able to:
/// - Perform a forward pass to compute outputs from inputs
/// - Perform a backward pass to compute gradients
/// - Expose its learnable parameters and the matching gradients
///
/// `forward` takes `&self` and never mutates state. Layers that need to cache
/// activations or update statistics during training expose an inherent
/// `forward_train(&mut self, ..)` that must run before `backward`.
///
/// # Example
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use skycast_layers::dense::Dense;
/// use skycast_layers::layer::Layer;
/// use skycast_layers::tensor::Tensor;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let layer = Dense::new(17, 128, &mut rng);
/// let input = Tensor::zeros(&[32, 17]);
/// let output = layer.forward(&input).unwrap();
/// assert_eq!(output.shape(), &[32, 128]);
/// ```
pub trait Layer: Send + Sync {
    /// Performs a forward pass through the layer.
    ///
    /// # Errors
    ///
    /// Returns a [`LayerError`] if the input shape is incompatible with the layer
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError>;

    /// Performs a backward pass through the layer.
    ///
    /// Takes the gradient of the loss with respect to the layer's output
    /// and returns the gradient with respect to the layer's input. Parameter
    /// gradients are stored on the layer and exposed by [`Layer::gradients`].
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::NotInitialized`] if no training forward pass was
    /// cached, or a shape error if the gradient shape is incompatible
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError>;

    /// Returns references to the layer's learnable parameters.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Returns mutable references to the layer's learnable parameters.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Returns the gradients from the last backward pass, aligned with
    /// [`Layer::parameters`]. `None` marks a gradient that was never computed.
    fn gradients(&self) -> Vec<Option<&Tensor>> {
        Vec::new()
    }

    /// Returns the regularization loss contributed by this layer.
    ///
    /// Default implementation returns 0.0.
    fn regularization_loss(&self) -> f32 {
        0.0
    }

    /// Returns the name of the layer for debugging and logging purposes.
    fn name(&self) -> &str {
        "Layer"
    }

    /// Returns whether the layer is in training mode.
    ///
    /// Some layers behave differently during training vs inference
    /// (e.g., Dropout, BatchNorm).
    fn is_training(&self) -> bool {
        true
    }

    /// Sets the layer's training mode.
    fn set_training(&mut self, _training: bool) {}
}
