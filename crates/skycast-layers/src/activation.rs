//! Activation layers.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Activation function types usable after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActivationType {
    /// Rectified Linear Unit
    #[default]
    ReLU,
    /// No activation (identity)
    None,
}

/// Rectified Linear Unit activation.
///
/// Computes `f(x) = max(0, x)` element-wise.
///
/// # Example
///
/// ```
/// use skycast_layers::activation::ReLU;
/// use skycast_layers::layer::Layer;
/// use skycast_layers::tensor::Tensor;
///
/// let relu = ReLU::new();
/// let input = Tensor::from_data(&[1, 3], vec![-1.0, 0.0, 2.0]);
/// let output = relu.forward(&input).unwrap();
/// assert_eq!(output.data(), &[0.0, 0.0, 2.0]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReLU {
    /// Cached input for backward pass
    #[serde(skip)]
    cached_input: Option<Tensor>,
}

impl ReLU {
    /// Creates a new ReLU activation layer.
    pub fn new() -> Self {
        Self { cached_input: None }
    }

    /// Performs forward pass and caches input for backward pass.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.cached_input = Some(input.clone());
        self.forward(input)
    }
}

impl Layer for ReLU {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        Ok(input.map(|x| x.max(0.0)))
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        if grad.shape() != input.shape() {
            return Err(LayerError::ShapeMismatch {
                expected: input.shape().to_vec(),
                actual: grad.shape().to_vec(),
            });
        }

        // 1 if x > 0, else 0
        let mask = input.map(|x| if x > 0.0 { 1.0 } else { 0.0 });
        Ok(grad.mul(&mask))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "ReLU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_forward() {
        let relu = ReLU::new();
        let input = Tensor::from_data(&[2, 2], vec![-1.0, 2.0, 0.0, -3.0]);
        let output = relu.forward(&input).unwrap();
        assert_eq!(output.data(), &[0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_relu_backward_masks_gradient() {
        let mut relu = ReLU::new();
        let input = Tensor::from_data(&[1, 4], vec![-1.0, 2.0, 0.0, 5.0]);
        relu.forward_train(&input).unwrap();

        let grad = relu.backward(&Tensor::full(&[1, 4], 3.0)).unwrap();
        assert_eq!(grad.data(), &[0.0, 3.0, 0.0, 3.0]);
    }

    #[test]
    fn test_relu_backward_without_forward() {
        let mut relu = ReLU::new();
        assert!(relu.backward(&Tensor::ones(&[1, 1])).is_err());
    }
}
