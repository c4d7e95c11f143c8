//! Batch normalization.
//!
//! Normalizes each feature over the batch, then applies a learnable affine
//! transformation:
//!
//! `y = (x - mean) / sqrt(var + eps) * gamma + beta`
//!
//! In training mode the batch statistics are used and folded into running
//! statistics as `running = momentum * batch + (1 - momentum) * running`.
//! In inference mode the running statistics are used instead.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Batch Normalization layer over `[batch, features]` inputs.
///
/// # Example
///
/// ```
/// use skycast_layers::layer::Layer;
/// use skycast_layers::normalization::BatchNorm;
/// use skycast_layers::tensor::Tensor;
///
/// let mut bn = BatchNorm::with_params(4, 0.01, 1e-3);
/// let input = Tensor::from_data(&[2, 4], vec![1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
/// let output = bn.forward_train(&input).unwrap();
/// assert_eq!(output.shape(), &[2, 4]);
///
/// bn.set_training(false);
/// let output = bn.forward(&input).unwrap();
/// assert_eq!(output.shape(), &[2, 4]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    /// Learnable scale parameter (gamma)
    gamma: Tensor,
    /// Learnable shift parameter (beta)
    beta: Tensor,
    /// Running mean for inference
    running_mean: Tensor,
    /// Running variance for inference
    running_var: Tensor,
    /// Weight of the current batch when updating running statistics
    momentum: f32,
    /// Small constant for numerical stability
    eps: f32,
    num_features: usize,
    training: bool,
    /// Normalized input from the last training pass
    #[serde(skip)]
    cached_x_hat: Option<Tensor>,
    /// `1 / sqrt(var + eps)` from the last training pass
    #[serde(skip)]
    cached_inv_std: Option<Tensor>,
    #[serde(skip)]
    gamma_grad: Option<Tensor>,
    #[serde(skip)]
    beta_grad: Option<Tensor>,
}

impl BatchNorm {
    /// Creates a new Batch Normalization layer with momentum 0.1 and eps 1e-5.
    ///
    /// # Arguments
    ///
    /// * `num_features` - Number of features (C in [N, C] input)
    pub fn new(num_features: usize) -> Self {
        Self {
            gamma: Tensor::ones(&[num_features]),
            beta: Tensor::zeros(&[num_features]),
            running_mean: Tensor::zeros(&[num_features]),
            running_var: Tensor::ones(&[num_features]),
            momentum: 0.1,
            eps: 1e-5,
            num_features,
            training: true,
            cached_x_hat: None,
            cached_inv_std: None,
            gamma_grad: None,
            beta_grad: None,
        }
    }

    /// Creates a Batch Normalization layer with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `num_features` - Number of features
    /// * `momentum` - Weight of the batch statistics in the running update
    /// * `eps` - Small constant for numerical stability
    pub fn with_params(num_features: usize, momentum: f32, eps: f32) -> Self {
        let mut layer = Self::new(num_features);
        layer.momentum = momentum;
        layer.eps = eps;
        layer
    }

    /// Returns the number of features.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Returns the momentum used for the running statistics.
    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    /// Returns the epsilon added to the variance.
    pub fn eps(&self) -> f32 {
        self.eps
    }

    /// Returns references to running mean/var.
    pub fn running_stats(&self) -> (&Tensor, &Tensor) {
        (&self.running_mean, &self.running_var)
    }

    /// Returns gamma gradients if available.
    pub fn gamma_grad(&self) -> Option<&Tensor> {
        self.gamma_grad.as_ref()
    }

    /// Returns beta gradients if available.
    pub fn beta_grad(&self) -> Option<&Tensor> {
        self.beta_grad.as_ref()
    }

    /// Clears cached values and gradients.
    pub fn clear_cache(&mut self) {
        self.cached_x_hat = None;
        self.cached_inv_std = None;
        self.gamma_grad = None;
        self.beta_grad = None;
    }

    /// Performs forward pass and caches values for backward pass.
    ///
    /// In training mode this normalizes with batch statistics and updates the
    /// running statistics. In inference mode it is the same as `forward`.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.check_input(input)?;
        if !self.training {
            return self.forward(input);
        }

        let mean = input.mean_axis(0);
        let var = input.var_axis(0).map(|v| v.max(0.0));

        let m = self.momentum;
        self.running_mean = mean.scale(m).add(&self.running_mean.scale(1.0 - m));
        self.running_var = var.scale(m).add(&self.running_var.scale(1.0 - m));

        let inv_std = var.map(|v| 1.0 / (v + self.eps).sqrt());
        let x_hat = input.sub(&mean).mul(&inv_std);
        let output = x_hat.mul(&self.gamma).add(&self.beta);

        self.cached_x_hat = Some(x_hat);
        self.cached_inv_std = Some(inv_std);
        Ok(output)
    }

    fn check_input(&self, input: &Tensor) -> Result<(), LayerError> {
        if input.ndim() != 2 {
            return Err(LayerError::ForwardError {
                message: format!("BatchNorm expects 2D input, got {}D", input.ndim()),
            });
        }
        if input.shape()[1] != self.num_features {
            return Err(LayerError::InvalidInputDimension {
                expected: self.num_features,
                actual: input.shape()[1],
            });
        }
        Ok(())
    }
}

impl Layer for BatchNorm {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.check_input(input)?;

        let (mean, var) = if self.training {
            (input.mean_axis(0), input.var_axis(0))
        } else {
            (self.running_mean.clone(), self.running_var.clone())
        };
        let inv_std = var.map(|v| 1.0 / (v.max(0.0) + self.eps).sqrt());

        Ok(input
            .sub(&mean)
            .mul(&inv_std)
            .mul(&self.gamma)
            .add(&self.beta))
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let x_hat = self
            .cached_x_hat
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        let inv_std = self
            .cached_inv_std
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        if grad.shape() != x_hat.shape() {
            return Err(LayerError::ShapeMismatch {
                expected: x_hat.shape().to_vec(),
                actual: grad.shape().to_vec(),
            });
        }

        let n = x_hat.shape()[0] as f32;

        let d_beta = grad.sum_axis(0);
        let d_gamma = grad.mul(x_hat).sum_axis(0);

        // dx = inv_std / n * (n * dx_hat - sum(dx_hat) - x_hat * sum(dx_hat * x_hat))
        let dx_hat = grad.mul(&self.gamma);
        let sum_dx_hat = dx_hat.sum_axis(0);
        let sum_dx_hat_x_hat = dx_hat.mul(x_hat).sum_axis(0);
        let dx = dx_hat
            .scale(n)
            .sub(&sum_dx_hat)
            .sub(&x_hat.mul(&sum_dx_hat_x_hat))
            .mul(inv_std)
            .scale(1.0 / n);

        self.beta_grad = Some(d_beta);
        self.gamma_grad = Some(d_gamma);
        Ok(dx)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.gamma, &self.beta]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.gamma, &mut self.beta]
    }

    fn gradients(&self) -> Vec<Option<&Tensor>> {
        vec![self.gamma_grad.as_ref(), self.beta_grad.as_ref()]
    }

    fn name(&self) -> &str {
        "BatchNorm"
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tensor {
        Tensor::from_data(
            &[4, 2],
            vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0],
        )
    }

    #[test]
    fn test_batch_norm_training_normalizes_batch() {
        let mut bn = BatchNorm::with_params(2, 0.01, 1e-3);
        let output = bn.forward_train(&sample()).unwrap();

        let mean = output.mean_axis(0);
        let var = output.var_axis(0);
        for j in 0..2 {
            assert!(mean.data()[j].abs() < 1e-5);
            assert!((var.data()[j] - 1.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_batch_norm_running_stats_update() {
        let mut bn = BatchNorm::with_params(2, 0.01, 1e-3);
        bn.forward_train(&sample()).unwrap();

        let (rm, rv) = bn.running_stats();
        // 0.01 * batch_mean + 0.99 * 0
        assert!((rm.data()[0] - 0.025).abs() < 1e-6);
        assert!((rm.data()[1] - 0.25).abs() < 1e-5);
        // 0.01 * 1.25 + 0.99 * 1
        assert!((rv.data()[0] - 1.0025).abs() < 1e-6);
    }

    #[test]
    fn test_batch_norm_inference_uses_running_stats() {
        let mut bn = BatchNorm::new(2);
        bn.set_training(false);

        // Fresh running stats are mean 0, var 1: output ~= input.
        let input = sample();
        let output = bn.forward(&input).unwrap();
        for (o, i) in output.data().iter().zip(input.data().iter()) {
            assert!((o - i / (1.0f32 + 1e-5).sqrt()).abs() < 1e-4);
        }

        // Inference-mode forward_train leaves the running stats untouched.
        bn.forward_train(&input).unwrap();
        assert_eq!(bn.running_stats().0.sum(), 0.0);
    }

    #[test]
    fn test_batch_norm_backward_matches_numeric_gradient() {
        let input = Tensor::from_data(&[3, 1], vec![1.0, 2.0, 4.0]);
        let weights = Tensor::from_data(&[3, 1], vec![1.0, -2.0, 0.5]);

        let loss = |x: &Tensor| {
            let mut bn = BatchNorm::with_params(1, 0.01, 1e-3);
            bn.forward_train(x).unwrap().mul(&weights).sum()
        };

        let mut bn = BatchNorm::with_params(1, 0.01, 1e-3);
        bn.forward_train(&input).unwrap();
        let dx = bn.backward(&weights).unwrap();

        let h = 1e-2;
        for i in 0..3 {
            let mut plus = input.clone();
            plus.data_mut()[i] += h;
            let mut minus = input.clone();
            minus.data_mut()[i] -= h;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
            assert!(
                (numeric - dx.data()[i]).abs() < 1e-2,
                "index {}: numeric {} vs analytic {}",
                i,
                numeric,
                dx.data()[i]
            );
        }
        assert!(bn.gamma_grad().is_some());
        assert_eq!(bn.beta_grad().unwrap().data(), &[-0.5]);
    }

    #[test]
    fn test_batch_norm_invalid_input() {
        let bn = BatchNorm::new(3);
        assert!(bn.forward(&Tensor::ones(&[2, 4])).is_err());
        assert!(bn.forward(&Tensor::ones(&[3])).is_err());
    }

    #[test]
    fn test_batch_norm_parameters() {
        let bn = BatchNorm::new(8);
        assert_eq!(bn.parameters().len(), 2);
        assert_eq!(bn.gradients().len(), 2);
    }
}
