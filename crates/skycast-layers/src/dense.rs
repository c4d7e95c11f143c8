//! Dense (fully connected) layer implementation.
//!
//! This module provides the [`Dense`] layer, which performs a linear transformation
//! `y = xW + b` where W is the weight matrix and b is the bias vector.

use crate::error::LayerError;
use crate::initializer::Initializer;
use crate::layer::Layer;
use crate::regularizer::Regularizer;
use crate::tensor::Tensor;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A dense (fully connected) layer.
///
/// Performs the transformation `y = xW + b` where:
/// - `x` is the input tensor of shape `[batch_size, in_features]`
/// - `W` is the weight matrix of shape `[in_features, out_features]`
/// - `b` is the bias vector of shape `[out_features]`
/// - `y` is the output tensor of shape `[batch_size, out_features]`
///
/// The kernel regularizer adds its penalty to [`Layer::regularization_loss`]
/// and its gradient to the weight gradient computed by `backward`.
///
/// # Example
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use skycast_layers::dense::Dense;
/// use skycast_layers::layer::Layer;
/// use skycast_layers::regularizer::Regularizer;
/// use skycast_layers::tensor::Tensor;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let layer = Dense::new(64, 32, &mut rng).with_kernel_regularizer(Regularizer::L2(0.001));
/// let output = layer.forward(&Tensor::zeros(&[8, 64])).unwrap();
/// assert_eq!(output.shape(), &[8, 32]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// Weight matrix of shape [in_features, out_features]
    weights: Tensor,
    /// Bias vector of shape [out_features]
    bias: Tensor,
    /// Kernel regularizer
    kernel_regularizer: Regularizer,
    /// Gradient of weights
    #[serde(skip)]
    weights_grad: Option<Tensor>,
    /// Gradient of bias
    #[serde(skip)]
    bias_grad: Option<Tensor>,
    /// Cached input for backward pass
    #[serde(skip)]
    cached_input: Option<Tensor>,
    in_features: usize,
    out_features: usize,
}

impl Dense {
    /// Creates a new dense layer with Glorot-uniform weights and zero bias.
    ///
    /// # Arguments
    ///
    /// * `in_features` - Number of input features
    /// * `out_features` - Number of output features
    /// * `rng` - Source of randomness for the weight initializer
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        Self::new_with_initializer(
            in_features,
            out_features,
            Initializer::GlorotUniform,
            Initializer::Zeros,
            rng,
        )
    }

    /// Creates a new dense layer with custom initializers.
    pub fn new_with_initializer<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        weight_init: Initializer,
        bias_init: Initializer,
        rng: &mut R,
    ) -> Self {
        let weights = weight_init.initialize(&[in_features, out_features], rng);
        let bias = bias_init.initialize(&[out_features], rng);
        Self {
            weights,
            bias,
            kernel_regularizer: Regularizer::None,
            weights_grad: None,
            bias_grad: None,
            cached_input: None,
            in_features,
            out_features,
        }
    }

    /// Creates a dense layer with custom weights and bias.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes are incompatible
    pub fn from_weights(weights: Tensor, bias: Tensor) -> Result<Self, LayerError> {
        if weights.ndim() != 2 {
            return Err(LayerError::ConfigError {
                message: format!("Weights must be 2D, got {}D", weights.ndim()),
            });
        }
        if bias.ndim() != 1 {
            return Err(LayerError::ConfigError {
                message: format!("Bias must be 1D, got {}D", bias.ndim()),
            });
        }
        if weights.shape()[1] != bias.shape()[0] {
            return Err(LayerError::ShapeMismatch {
                expected: vec![weights.shape()[1]],
                actual: vec![bias.shape()[0]],
            });
        }

        let in_features = weights.shape()[0];
        let out_features = weights.shape()[1];
        Ok(Self {
            weights,
            bias,
            kernel_regularizer: Regularizer::None,
            weights_grad: None,
            bias_grad: None,
            cached_input: None,
            in_features,
            out_features,
        })
    }

    /// Sets the kernel regularizer.
    pub fn with_kernel_regularizer(mut self, regularizer: Regularizer) -> Self {
        self.kernel_regularizer = regularizer;
        self
    }

    /// Returns the kernel regularizer.
    pub fn kernel_regularizer(&self) -> Regularizer {
        self.kernel_regularizer
    }

    /// Returns the input feature dimension.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Returns the output feature dimension.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Returns a reference to the weights tensor.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// Returns a reference to the bias tensor.
    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    /// Returns the weight gradients if available.
    pub fn weights_grad(&self) -> Option<&Tensor> {
        self.weights_grad.as_ref()
    }

    /// Returns the bias gradients if available.
    pub fn bias_grad(&self) -> Option<&Tensor> {
        self.bias_grad.as_ref()
    }

    /// Clears the cached input and gradients.
    pub fn clear_cache(&mut self) {
        self.cached_input = None;
        self.weights_grad = None;
        self.bias_grad = None;
    }

    /// Performs forward pass and caches input for backward pass.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        let output = self.forward(input)?;
        self.cached_input = Some(input.clone());
        Ok(output)
    }
}

impl Layer for Dense {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.ndim() != 2 {
            return Err(LayerError::ForwardError {
                message: format!("Dense expects 2D input, got {}D", input.ndim()),
            });
        }
        let in_dim = input.shape()[1];
        if in_dim != self.in_features {
            return Err(LayerError::InvalidInputDimension {
                expected: self.in_features,
                actual: in_dim,
            });
        }

        Ok(input.matmul(&self.weights).add(&self.bias))
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;

        let expected = [input.shape()[0], self.out_features];
        if grad.shape() != expected {
            return Err(LayerError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: grad.shape().to_vec(),
            });
        }

        // dL/dW = x^T @ dL/dy
        let mut weights_grad = input.transpose().matmul(grad);
        if let Some(reg_grad) = self.kernel_regularizer.grad(&self.weights) {
            weights_grad = weights_grad.add(&reg_grad);
        }
        self.weights_grad = Some(weights_grad);

        // dL/db = sum(dL/dy, axis=0)
        self.bias_grad = Some(grad.sum_axis(0));

        // dL/dx = dL/dy @ W^T
        Ok(grad.matmul(&self.weights.transpose()))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weights, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weights, &mut self.bias]
    }

    fn gradients(&self) -> Vec<Option<&Tensor>> {
        vec![self.weights_grad.as_ref(), self.bias_grad.as_ref()]
    }

    fn name(&self) -> &str {
        "Dense"
    }

    fn regularization_loss(&self) -> f32 {
        self.kernel_regularizer.loss(&self.weights)
    }
}
