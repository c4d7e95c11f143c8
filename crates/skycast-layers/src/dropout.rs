//! Inverted dropout.
//!
//! During training each activation is zeroed with probability `rate` and the
//! survivors are scaled by `1 / (1 - rate)`, so inference is the identity.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Dropout layer with a seeded mask generator.
///
/// `forward` never drops anything; masks are only drawn by
/// [`Dropout::forward_train`] while the layer is in training mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    rate: f32,
    seed: u64,
    training: bool,
    #[serde(skip)]
    rng: Option<StdRng>,
    #[serde(skip)]
    cached_mask: Option<Tensor>,
}

impl Dropout {
    /// Creates a dropout layer.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] unless `0 <= rate < 1`.
    pub fn new(rate: f32, seed: u64) -> Result<Self, LayerError> {
        if !(0.0..1.0).contains(&rate) {
            return Err(LayerError::ConfigError {
                message: format!("Dropout rate must be in [0, 1), got {}", rate),
            });
        }
        Ok(Self {
            rate,
            seed,
            training: true,
            rng: None,
            cached_mask: None,
        })
    }

    /// Returns the drop probability.
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Draws a fresh mask and applies it when training; identity otherwise.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        if !self.training || self.rate == 0.0 {
            self.cached_mask = Some(Tensor::ones(input.shape()));
            return Ok(input.clone());
        }

        let keep = 1.0 - self.rate;
        let seed = self.seed;
        let rng = self.rng.get_or_insert_with(|| StdRng::seed_from_u64(seed));
        let data = (0..input.numel())
            .map(|_| {
                if rng.gen::<f32>() < keep {
                    1.0 / keep
                } else {
                    0.0
                }
            })
            .collect();
        let mask = Tensor::from_data(input.shape(), data);
        let output = input.mul(&mask);
        self.cached_mask = Some(mask);
        Ok(output)
    }
}

impl Layer for Dropout {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        Ok(input.clone())
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let mask = self
            .cached_mask
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        if grad.shape() != mask.shape() {
            return Err(LayerError::ShapeMismatch {
                expected: mask.shape().to_vec(),
                actual: grad.shape().to_vec(),
            });
        }
        Ok(grad.mul(mask))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "Dropout"
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}
