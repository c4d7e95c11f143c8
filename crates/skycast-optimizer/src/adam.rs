//! Adam optimizer.
//!
//! Adam (Adaptive Moment Estimation) keeps exponential moving averages of
//! the gradients (first moment) and squared gradients (second moment). The
//! bias correction is folded into the step size, and epsilon is added to the
//! uncorrected second-moment root.
//!
//! # Example
//!
//! ```
//! use skycast_optimizer::{Optimizer, Adam, OptimizerConfig};
//!
//! let mut adam = Adam::new(OptimizerConfig::default()).unwrap();
//! let mut params = vec![1.0, 2.0, 3.0];
//! let gradients = vec![0.1, 0.2, 0.3];
//! adam.apply_gradients(&mut params, &gradients);
//! ```

use crate::{Optimizer, OptimizerConfig, OptimizerError};
use serde::{Deserialize, Serialize};

/// Adam optimizer with adaptive learning rates and momentum.
///
/// Updates parameters using:
/// ```text
/// m = beta1 * m + (1 - beta1) * gradient
/// v = beta2 * v + (1 - beta2) * gradient^2
/// step = learning_rate * sqrt(1 - beta2^t) / (1 - beta1^t)
/// param = param - step * m / (sqrt(v) + epsilon)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// First moment estimates (mean of gradients).
    m: Vec<f32>,
    /// Second moment estimates (mean of squared gradients).
    v: Vec<f32>,
    /// Current timestep for bias correction.
    t: u64,
    config: OptimizerConfig,
}

impl Adam {
    /// Creates a new Adam optimizer with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if a hyperparameter is out of range.
    pub fn with_params(
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    ) -> Result<Self, OptimizerError> {
        Self::new(OptimizerConfig::Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        })
    }

    /// Returns the current first moment state.
    pub fn first_moment(&self) -> &[f32] {
        &self.m
    }

    /// Returns the current second moment state.
    pub fn second_moment(&self) -> &[f32] {
        &self.v
    }

    /// Returns the current timestep.
    pub fn timestep(&self) -> u64 {
        self.t
    }

    /// Resets the optimizer state.
    pub fn reset_state(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }
}

impl Optimizer for Adam {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        config.validate()?;
        match config {
            OptimizerConfig::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Ok(Self {
                learning_rate,
                beta1,
                beta2,
                epsilon,
                m: Vec::new(),
                v: Vec::new(),
                t: 0,
                config,
            }),
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "Adam".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]) {
        assert_eq!(
            params.len(),
            gradients.len(),
            "parameter and gradient lengths differ"
        );
        if self.m.len() != params.len() {
            self.m = vec![0.0; params.len()];
            self.v = vec![0.0; params.len()];
        }

        self.t += 1;
        let t = i32::try_from(self.t).unwrap_or(i32::MAX);
        let bias_correction1 = 1.0 - self.beta1.powi(t);
        let bias_correction2 = 1.0 - self.beta2.powi(t);
        let step = self.learning_rate * bias_correction2.sqrt() / bias_correction1;

        for ((p, g), (m, v)) in params
            .iter_mut()
            .zip(gradients.iter())
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            *p -= step * *m / (v.sqrt() + self.epsilon);
        }
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}
