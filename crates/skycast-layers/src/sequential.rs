//! Sequential feed-forward network.
//!
//! This module provides [`Sequential`], an ordered stack of dense, activation,
//! batch-normalization and dropout layers, and [`SequentialConfig`], the
//! builder that describes it.

use crate::activation::{ActivationType, ReLU};
use crate::dense::Dense;
use crate::dropout::Dropout;
use crate::error::LayerError;
use crate::layer::Layer;
use crate::normalization::BatchNorm;
use crate::regularizer::Regularizer;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One entry of a [`SequentialConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerSpec {
    /// Dense layer followed by an activation.
    Dense {
        /// Output width
        units: usize,
        /// Activation applied to the dense output
        activation: ActivationType,
        /// Kernel regularizer
        regularizer: Regularizer,
    },
    /// Batch normalization over the previous layer's width.
    BatchNorm {
        /// Weight of the batch statistics in the running update
        momentum: f32,
        /// Variance epsilon
        eps: f32,
    },
    /// Inverted dropout.
    Dropout {
        /// Drop probability
        rate: f32,
    },
}

/// Configuration for building a [`Sequential`] network.
///
/// # Example
///
/// ```
/// use skycast_layers::activation::ActivationType;
/// use skycast_layers::regularizer::Regularizer;
/// use skycast_layers::sequential::SequentialConfig;
///
/// let config = SequentialConfig::new(17)
///     .add_dense(64, ActivationType::ReLU, Regularizer::L2(0.001))
///     .add_batch_norm(0.01, 1e-3)
///     .add_dropout(0.2)
///     .add_dense(1, ActivationType::None, Regularizer::None);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.output_dim(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Layers in application order
    pub layers: Vec<LayerSpec>,
}

impl SequentialConfig {
    /// Creates a new configuration with the specified input dimension.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            layers: Vec::new(),
        }
    }

    /// Appends a dense layer and its activation.
    pub fn add_dense(
        mut self,
        units: usize,
        activation: ActivationType,
        regularizer: Regularizer,
    ) -> Self {
        self.layers.push(LayerSpec::Dense {
            units,
            activation,
            regularizer,
        });
        self
    }

    /// Appends a batch normalization layer.
    pub fn add_batch_norm(mut self, momentum: f32, eps: f32) -> Self {
        self.layers.push(LayerSpec::BatchNorm { momentum, eps });
        self
    }

    /// Appends a dropout layer.
    pub fn add_dropout(mut self, rate: f32) -> Self {
        self.layers.push(LayerSpec::Dropout { rate });
        self
    }

    /// Returns the width produced by the last dense layer.
    pub fn output_dim(&self) -> usize {
        self.layers
            .iter()
            .rev()
            .find_map(|spec| match spec {
                LayerSpec::Dense { units, .. } => Some(*units),
                _ => None,
            })
            .unwrap_or(self.input_dim)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), LayerError> {
        if self.input_dim == 0 {
            return Err(LayerError::ConfigError {
                message: "Input dimension must be positive".to_string(),
            });
        }
        if !self
            .layers
            .iter()
            .any(|spec| matches!(spec, LayerSpec::Dense { .. }))
        {
            return Err(LayerError::ConfigError {
                message: "Network must have at least one dense layer".to_string(),
            });
        }
        for (i, spec) in self.layers.iter().enumerate() {
            match *spec {
                LayerSpec::Dense { units: 0, .. } => {
                    return Err(LayerError::ConfigError {
                        message: format!("Layer {} has zero output dimension", i),
                    });
                }
                LayerSpec::BatchNorm { momentum, eps }
                    if !(0.0..=1.0).contains(&momentum) || eps <= 0.0 =>
                {
                    return Err(LayerError::ConfigError {
                        message: format!(
                            "Layer {} has invalid batch norm momentum {} / eps {}",
                            i, momentum, eps
                        ),
                    });
                }
                LayerSpec::Dropout { rate } if !(0.0..1.0).contains(&rate) => {
                    return Err(LayerError::ConfigError {
                        message: format!("Layer {} dropout rate must be in [0, 1)", i),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Builds the network, seeding weight initialization and dropout masks.
    pub fn build(self, seed: u64) -> Result<Sequential, LayerError> {
        Sequential::from_config(self, seed)
    }
}

/// A layer held by [`Sequential`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NetworkLayer {
    /// Fully connected layer
    Dense(Dense),
    /// ReLU activation
    ReLU(ReLU),
    /// Batch normalization
    BatchNorm(BatchNorm),
    /// Dropout
    Dropout(Dropout),
}

impl NetworkLayer {
    fn as_layer(&self) -> &dyn Layer {
        match self {
            Self::Dense(l) => l,
            Self::ReLU(l) => l,
            Self::BatchNorm(l) => l,
            Self::Dropout(l) => l,
        }
    }

    fn as_layer_mut(&mut self) -> &mut dyn Layer {
        match self {
            Self::Dense(l) => l,
            Self::ReLU(l) => l,
            Self::BatchNorm(l) => l,
            Self::Dropout(l) => l,
        }
    }

    fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        match self {
            Self::Dense(l) => l.forward_train(input),
            Self::ReLU(l) => l.forward_train(input),
            Self::BatchNorm(l) => l.forward_train(input),
            Self::Dropout(l) => l.forward_train(input),
        }
    }
}

/// An ordered stack of layers applied one after another.
///
/// # Example
///
/// ```
/// use skycast_layers::activation::ActivationType;
/// use skycast_layers::layer::Layer;
/// use skycast_layers::regularizer::Regularizer;
/// use skycast_layers::sequential::SequentialConfig;
/// use skycast_layers::tensor::Tensor;
///
/// let mut net = SequentialConfig::new(8)
///     .add_dense(4, ActivationType::ReLU, Regularizer::None)
///     .add_dense(1, ActivationType::None, Regularizer::None)
///     .build(42)
///     .unwrap();
///
/// net.set_training(false);
/// let output = net.forward(&Tensor::zeros(&[5, 8])).unwrap();
/// assert_eq!(output.shape(), &[5, 1]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequential {
    layers: Vec<NetworkLayer>,
    config: SequentialConfig,
    training: bool,
}

impl Sequential {
    /// Creates a network from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn from_config(config: SequentialConfig, seed: u64) -> Result<Self, LayerError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::new();
        let mut width = config.input_dim;
        for spec in &config.layers {
            match *spec {
                LayerSpec::Dense {
                    units,
                    activation,
                    regularizer,
                } => {
                    let dense =
                        Dense::new(width, units, &mut rng).with_kernel_regularizer(regularizer);
                    layers.push(NetworkLayer::Dense(dense));
                    if activation == ActivationType::ReLU {
                        layers.push(NetworkLayer::ReLU(ReLU::new()));
                    }
                    width = units;
                }
                LayerSpec::BatchNorm { momentum, eps } => {
                    layers.push(NetworkLayer::BatchNorm(BatchNorm::with_params(
                        width, momentum, eps,
                    )));
                }
                LayerSpec::Dropout { rate } => {
                    layers.push(NetworkLayer::Dropout(Dropout::new(rate, rng.gen())?));
                }
            }
        }

        Ok(Self {
            layers,
            config,
            training: true,
        })
    }

    /// Returns the configuration used to build this network.
    pub fn config(&self) -> &SequentialConfig {
        &self.config
    }

    /// Returns the layers in application order.
    pub fn layers(&self) -> &[NetworkLayer] {
        &self.layers
    }

    /// Returns the input dimension.
    pub fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    /// Returns the output dimension.
    pub fn output_dim(&self) -> usize {
        self.config.output_dim()
    }

    /// Forward pass that caches activations for `backward`, draws dropout
    /// masks and updates batch-norm running statistics.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        let mut x = input.clone();
        for layer in &mut self.layers {
            x = layer.forward_train(&x)?;
        }
        Ok(x)
    }

    /// Collects owned copies of the parameter gradients, aligned with
    /// [`Layer::parameters`].
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::NotInitialized`] if any gradient is missing.
    pub fn collect_gradients(&self) -> Result<Vec<Tensor>, LayerError> {
        self.gradients()
            .into_iter()
            .map(|g| g.cloned().ok_or(LayerError::NotInitialized))
            .collect()
    }
}

impl Layer for Sequential {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.as_layer().forward(&x)?;
        }
        Ok(x)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let mut g = grad.clone();
        for layer in self.layers.iter_mut().rev() {
            g = layer.as_layer_mut().backward(&g)?;
        }
        Ok(g)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.layers
            .iter()
            .flat_map(|layer| layer.as_layer().parameters())
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.as_layer_mut().parameters_mut())
            .collect()
    }

    fn gradients(&self) -> Vec<Option<&Tensor>> {
        self.layers
            .iter()
            .flat_map(|layer| layer.as_layer().gradients())
            .collect()
    }

    fn regularization_loss(&self) -> f32 {
        self.layers
            .iter()
            .map(|layer| layer.as_layer().regularization_loss())
            .sum()
    }

    fn name(&self) -> &str {
        "Sequential"
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
        for layer in &mut self.layers {
            layer.as_layer_mut().set_training(training);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SequentialConfig {
        SequentialConfig::new(6)
            .add_dense(8, ActivationType::ReLU, Regularizer::L2(0.001))
            .add_batch_norm(0.01, 1e-3)
            .add_dropout(0.3)
            .add_dense(1, ActivationType::None, Regularizer::None)
    }

    #[test]
    fn test_config_validation() {
        assert!(small_config().validate().is_ok());
        assert!(SequentialConfig::new(0)
            .add_dense(1, ActivationType::None, Regularizer::None)
            .validate()
            .is_err());
        assert!(SequentialConfig::new(4).validate().is_err());
        assert!(SequentialConfig::new(4)
            .add_dense(0, ActivationType::ReLU, Regularizer::None)
            .validate()
            .is_err());
        assert!(SequentialConfig::new(4)
            .add_dense(2, ActivationType::ReLU, Regularizer::None)
            .add_dropout(1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_layer_layout() {
        let net = small_config().build(42).unwrap();
        let names: Vec<&str> = net.layers().iter().map(|l| l.as_layer().name()).collect();
        assert_eq!(names, vec!["Dense", "ReLU", "BatchNorm", "Dropout", "Dense"]);
        assert_eq!(net.input_dim(), 6);
        assert_eq!(net.output_dim(), 1);
        // dense(w, b) + bn(gamma, beta) + dense(w, b)
        assert_eq!(net.parameters().len(), 6);
    }

    #[test]
    fn test_forward_backward_shapes() {
        let mut net = small_config().build(42).unwrap();
        let input = Tensor::ones(&[5, 6]);
        let output = net.forward_train(&input).unwrap();
        assert_eq!(output.shape(), &[5, 1]);

        let input_grad = net.backward(&Tensor::ones(&[5, 1])).unwrap();
        assert_eq!(input_grad.shape(), &[5, 6]);

        let grads = net.collect_gradients().unwrap();
        let params = net.parameters();
        assert_eq!(grads.len(), params.len());
        for (g, p) in grads.iter().zip(params.iter()) {
            assert_eq!(g.shape(), p.shape());
        }
    }

    #[test]
    fn test_gradients_missing_before_backward() {
        let net = small_config().build(1).unwrap();
        assert!(matches!(
            net.collect_gradients(),
            Err(LayerError::NotInitialized)
        ));
    }

    #[test]
    fn test_training_mode_propagates() {
        let mut net = small_config().build(42).unwrap();
        net.set_training(false);
        assert!(!net.is_training());
        for layer in net.layers() {
            match layer {
                NetworkLayer::BatchNorm(bn) => assert!(!bn.is_training()),
                NetworkLayer::Dropout(d) => assert!(!d.is_training()),
                _ => {}
            }
        }
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = small_config().build(7).unwrap();
        let b = small_config().build(7).unwrap();
        let c = small_config().build(8).unwrap();
        assert_eq!(a.parameters()[0], b.parameters()[0]);
        assert_ne!(a.parameters()[0], c.parameters()[0]);
    }

    #[test]
    fn test_regularization_loss_sums_dense_layers() {
        let net = small_config().build(42).unwrap();
        let expected = match &net.layers()[0] {
            NetworkLayer::Dense(d) => d.weights().sqr().sum() * 0.001,
            _ => unreachable!(),
        };
        assert!((net.regularization_loss() - expected).abs() < 1e-7);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let mut net = small_config().build(3).unwrap();
        net.forward_train(&Tensor::ones(&[4, 6])).unwrap();
        net.set_training(false);
        let x = Tensor::from_data(&[2, 6], (0..12).map(|v| v as f32).collect());
        assert_eq!(net.forward(&x).unwrap(), net.forward(&x).unwrap());
    }
}
