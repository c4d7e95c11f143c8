//! Gradient-based optimizers for skycast.
//!
//! Each optimizer implements the [`Optimizer`] trait and owns the state for a
//! single flat parameter buffer. Trainers keep one optimizer per parameter
//! tensor.
//!
//! # Available Optimizers
//!
//! - [`Sgd`] - Stochastic Gradient Descent
//! - [`Adam`] - Adaptive Moment Estimation
//!
//! # Example
//!
//! ```
//! use skycast_optimizer::{Optimizer, Sgd, OptimizerConfig};
//!
//! let config = OptimizerConfig::Sgd { learning_rate: 0.01 };
//! let mut optimizer = Sgd::new(config).unwrap();
//!
//! let mut params = vec![1.0, 2.0, 3.0];
//! let gradients = vec![0.1, 0.2, 0.3];
//!
//! optimizer.apply_gradients(&mut params, &gradients);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod adam;
mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

/// Errors that can occur when working with optimizers.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Configuration type does not match the optimizer type.
    #[error("Config mismatch: expected {expected}, got {got}")]
    ConfigMismatch {
        /// Optimizer that was being built
        expected: String,
        /// Optimizer named by the configuration
        got: String,
    },

    /// Invalid configuration parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Configuration for the supported optimizer types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerConfig {
    /// Stochastic Gradient Descent configuration.
    Sgd {
        /// Learning rate for gradient updates.
        learning_rate: f32,
    },
    /// Adam configuration.
    Adam {
        /// Learning rate for gradient updates.
        learning_rate: f32,
        /// Exponential decay rate for first moment estimates.
        beta1: f32,
        /// Exponential decay rate for second moment estimates.
        beta2: f32,
        /// Small constant for numerical stability.
        epsilon: f32,
    },
}

impl Default for OptimizerConfig {
    /// Adam with learning rate 0.001, betas 0.9 / 0.999 and epsilon 1e-7.
    fn default() -> Self {
        OptimizerConfig::Adam {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

impl OptimizerConfig {
    /// Returns the name of the optimizer type.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Sgd { .. } => "Sgd",
            OptimizerConfig::Adam { .. } => "Adam",
        }
    }

    /// Returns the learning rate for the optimizer.
    pub fn learning_rate(&self) -> f32 {
        match self {
            OptimizerConfig::Sgd { learning_rate } => *learning_rate,
            OptimizerConfig::Adam { learning_rate, .. } => *learning_rate,
        }
    }

    /// Checks that every hyperparameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        let lr = self.learning_rate();
        if !(lr.is_finite() && lr > 0.0) {
            return Err(OptimizerError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                lr
            )));
        }
        if let OptimizerConfig::Adam {
            beta1,
            beta2,
            epsilon,
            ..
        } = *self
        {
            for (name, beta) in [("beta1", beta1), ("beta2", beta2)] {
                if !(0.0..1.0).contains(&beta) {
                    return Err(OptimizerError::InvalidParameter(format!(
                        "{} must be in [0, 1), got {}",
                        name, beta
                    )));
                }
            }
            if epsilon <= 0.0 {
                return Err(OptimizerError::InvalidParameter(format!(
                    "epsilon must be positive, got {}",
                    epsilon
                )));
            }
        }
        Ok(())
    }
}

/// Trait for parameter optimizers.
///
/// An optimizer instance tracks the state of one parameter buffer; the buffer
/// length must stay the same across calls.
pub trait Optimizer: Sized {
    /// Creates a new optimizer from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::ConfigMismatch`] if the configuration type
    /// does not match the optimizer type, or
    /// [`OptimizerError::InvalidParameter`] if a hyperparameter is out of range.
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError>;

    /// Applies gradients to update the parameters in place.
    ///
    /// # Panics
    ///
    /// May panic if `params` and `gradients` have different lengths.
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]);

    /// Returns a reference to the optimizer's configuration.
    fn config(&self) -> &OptimizerConfig;
}

/// Dynamic dispatch version of the Optimizer trait.
pub trait OptimizerDyn: Send {
    /// Applies gradients to update the parameters in place.
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]);

    /// Returns a reference to the optimizer's configuration.
    fn config(&self) -> &OptimizerConfig;
}

impl<T: Optimizer + Send> OptimizerDyn for T {
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]) {
        Optimizer::apply_gradients(self, params, gradients)
    }

    fn config(&self) -> &OptimizerConfig {
        Optimizer::config(self)
    }
}

/// Creates the optimizer named by the configuration.
///
/// # Example
///
/// ```
/// use skycast_optimizer::{create_optimizer, OptimizerConfig};
///
/// let mut optimizer = create_optimizer(OptimizerConfig::default()).unwrap();
/// let mut params = vec![1.0];
/// optimizer.apply_gradients(&mut params, &[1.0]);
/// assert!(params[0] < 1.0);
/// ```
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn create_optimizer(config: OptimizerConfig) -> Result<Box<dyn OptimizerDyn>, OptimizerError> {
    Ok(match &config {
        OptimizerConfig::Sgd { .. } => Box::new(Sgd::new(config)?),
        OptimizerConfig::Adam { .. } => Box::new(Adam::new(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_config_name() {
        let sgd = OptimizerConfig::Sgd { learning_rate: 0.01 };
        assert_eq!(sgd.name(), "Sgd");
        assert_eq!(OptimizerConfig::default().name(), "Adam");
    }

    #[test]
    fn test_default_is_adam() {
        match OptimizerConfig::default() {
            OptimizerConfig::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                assert_eq!(learning_rate, 0.001);
                assert_eq!(beta1, 0.9);
                assert_eq!(beta2, 0.999);
                assert_eq!(epsilon, 1e-7);
            }
            other => panic!("unexpected default {:?}", other),
        }
    }

    #[test]
    fn test_validate() {
        assert!(OptimizerConfig::default().validate().is_ok());
        assert!(OptimizerConfig::Sgd { learning_rate: 0.0 }
            .validate()
            .is_err());
        let bad = OptimizerConfig::Adam {
            learning_rate: 0.001,
            beta1: 1.0,
            beta2: 0.999,
            epsilon: 1e-7,
        };
        assert!(matches!(
            bad.validate(),
            Err(OptimizerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_config_json_shape() {
        let json = serde_json::to_string(&OptimizerConfig::Sgd { learning_rate: 0.5 }).unwrap();
        assert_eq!(json, r#"{"type":"sgd","learning_rate":0.5}"#);
        let parsed: OptimizerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, OptimizerConfig::Sgd { learning_rate: 0.5 });
    }

    #[test]
    fn test_create_optimizer() {
        let mut optimizer = create_optimizer(OptimizerConfig::Sgd { learning_rate: 0.5 }).unwrap();

        let mut params = vec![1.0, 2.0];
        optimizer.apply_gradients(&mut params, &[1.0, 1.0]);
        assert_eq!(params, vec![0.5, 1.5]);
        assert_eq!(optimizer.config().name(), "Sgd");

        assert!(create_optimizer(OptimizerConfig::Sgd {
            learning_rate: -1.0
        })
        .is_err());
    }
}
