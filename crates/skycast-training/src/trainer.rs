//! Mini-batch training with validation monitoring.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use skycast_layers::{Layer, Sequential, Tensor};
use skycast_optimizer::{create_optimizer, OptimizerConfig, OptimizerDyn};
use tracing::{debug, info};

use crate::error::{TrainingError, TrainingResult};
use crate::hooks::{EarlyStopping, Hook, HookAction, HookList};
use crate::metrics::{EpochRecord, EvaluationReport, MetricsRecorder, TrainingHistory};
use crate::model::build_model;

/// Hyperparameters of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Maximum number of epochs.
    pub epochs: usize,
    /// Rows per gradient step.
    pub batch_size: usize,
    /// Epochs without validation improvement before stopping.
    pub patience: usize,
    /// Minimum validation loss decrease that counts as improvement.
    pub min_delta: f64,
    /// Share of all rows held out for the final test score.
    pub test_fraction: f64,
    /// Share of the training rows used for validation.
    pub validation_fraction: f64,
    /// Seed for weight init, dropout, the split and shuffling.
    pub seed: u64,
    /// Optimizer settings.
    pub optimizer: OptimizerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            patience: 10,
            min_delta: 0.0,
            test_fraction: 0.2,
            validation_fraction: 0.2,
            seed: 42,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Config`] or [`TrainingError::Optimizer`]
    /// naming the first bad value.
    pub fn validate(&self) -> TrainingResult<()> {
        if self.epochs == 0 {
            return Err(TrainingError::Config("epochs must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::Config("batch_size must be positive".into()));
        }
        if self.min_delta < 0.0 {
            return Err(TrainingError::Config(format!(
                "min_delta must be non-negative, got {}",
                self.min_delta
            )));
        }
        for (name, fraction) in [
            ("test_fraction", self.test_fraction),
            ("validation_fraction", self.validation_fraction),
        ] {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(TrainingError::Config(format!(
                    "{} must be in (0, 1), got {}",
                    name, fraction
                )));
            }
        }
        self.optimizer.validate()?;
        Ok(())
    }
}

/// Fits a [`Sequential`] regressor with mean squared error.
///
/// One optimizer instance is kept per parameter tensor. Each epoch reshuffles
/// the training rows, then scores the validation rows in inference mode and
/// feeds the result to [`EarlyStopping`] and any registered hooks.
pub struct Trainer {
    model: Sequential,
    config: TrainingConfig,
    optimizers: Vec<Box<dyn OptimizerDyn>>,
    rng: StdRng,
    early_stopping: EarlyStopping,
    hooks: HookList,
}

impl Trainer {
    /// Creates a trainer for the fixed network over `input_dim` features.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or `input_dim` is zero.
    pub fn new(input_dim: usize, config: TrainingConfig) -> TrainingResult<Self> {
        config.validate()?;
        let model = build_model(input_dim, config.seed)?;
        Self::with_model(model, config)
    }

    /// Creates a trainer for an arbitrary network.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid.
    pub fn with_model(model: Sequential, config: TrainingConfig) -> TrainingResult<Self> {
        config.validate()?;
        let optimizers = model
            .parameters()
            .iter()
            .map(|_| create_optimizer(config.optimizer.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let early_stopping = EarlyStopping::new("val_loss", config.patience, config.min_delta);
        Ok(Self {
            model,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            optimizers,
            early_stopping,
            hooks: HookList::new(),
        })
    }

    /// Registers an extra hook.
    pub fn add_hook<H: Hook + 'static>(&mut self, hook: H) {
        self.hooks.add(hook);
    }

    /// The network being trained.
    pub fn model(&self) -> &Sequential {
        &self.model
    }

    /// Consumes the trainer, returning the network.
    pub fn into_model(self) -> Sequential {
        self.model
    }

    /// The training configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains until the epoch limit or until validation loss stalls.
    ///
    /// Targets are `[n, 1]`. When early stopping restores weights, the model
    /// ends holding the parameters and running statistics of the best epoch.
    /// The model is left in inference mode.
    ///
    /// # Errors
    ///
    /// Fails on empty or mismatched partitions, a feature width that differs
    /// from the network input, or a non-finite training loss.
    pub fn fit(
        &mut self,
        x_train: &Tensor,
        y_train: &Tensor,
        x_val: &Tensor,
        y_val: &Tensor,
    ) -> TrainingResult<TrainingHistory> {
        check_partition("train", x_train, y_train)?;
        check_partition("validation", x_val, y_val)?;

        info!(
            train_rows = x_train.shape()[0],
            val_rows = x_val.shape()[0],
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            "Starting training"
        );

        let mut history = TrainingHistory::new();
        let mut best_model: Option<Sequential> = None;

        for epoch in 1..=self.config.epochs {
            let (loss, mae) = self.train_epoch(epoch, x_train, y_train)?;
            let val = self.evaluate(x_val, y_val)?;
            let record = EpochRecord {
                epoch,
                loss,
                mae,
                val_loss: val.loss,
                val_mae: val.mae,
            };
            history.push(record);

            let stop_early = self.early_stopping.after_epoch(&record) == HookAction::Stop;
            if self.early_stopping.improved() && self.early_stopping.restore_best_weights() {
                best_model = Some(self.model.clone());
            }
            let stop_hooks = self.hooks.after_epoch(&record) == HookAction::Stop;

            if stop_early || stop_hooks {
                history.stopped_early = true;
                break;
            }
        }

        history.best_epoch = self.early_stopping.best_epoch();
        match best_model {
            Some(best) => {
                debug!(epoch = ?history.best_epoch, "Restoring best weights");
                self.model = best;
            }
            None => history.best_epoch = history.last().map(|r| r.epoch),
        }
        self.model.set_training(false);
        self.hooks.end(&history);
        Ok(history)
    }

    /// Runs one pass over the training rows in shuffled mini-batches.
    ///
    /// Returns the sample-weighted mean loss (including the L2 penalty) and
    /// mean absolute error.
    ///
    /// # Errors
    ///
    /// Fails on an empty or mismatched partition, a layer error, or a
    /// non-finite loss.
    pub fn train_epoch(
        &mut self,
        epoch: usize,
        x: &Tensor,
        y: &Tensor,
    ) -> TrainingResult<(f64, f64)> {
        check_partition("train", x, y)?;
        self.model.set_training(true);

        let mut order: Vec<usize> = (0..x.shape()[0]).collect();
        order.shuffle(&mut self.rng);

        let mut recorder = MetricsRecorder::new();
        for (batch, rows) in order.chunks(self.config.batch_size).enumerate() {
            let xb = x.select_rows(rows);
            let yb = y.select_rows(rows);

            let prediction = self.model.forward_train(&xb)?;
            let diff = prediction.sub(&yb);
            let loss = diff.sqr().mean() + self.model.regularization_loss();
            if !loss.is_finite() {
                return Err(TrainingError::NonFiniteLoss { epoch, batch });
            }

            let grad = diff.scale(2.0 / rows.len() as f32);
            self.model.backward(&grad)?;
            let gradients = self.model.collect_gradients()?;
            for ((param, grad), optimizer) in self
                .model
                .parameters_mut()
                .into_iter()
                .zip(gradients.iter())
                .zip(self.optimizers.iter_mut())
            {
                optimizer.apply_gradients(param.data_mut(), grad.data());
            }

            recorder.record(f64::from(loss), f64::from(diff.abs().sum()), rows.len());
        }

        Ok((recorder.mean_loss(), recorder.mean_abs_error()))
    }

    /// Predicts in inference mode.
    ///
    /// # Errors
    ///
    /// Fails if the feature width differs from the network input.
    pub fn predict(&mut self, x: &Tensor) -> TrainingResult<Tensor> {
        self.model.set_training(false);
        Ok(self.model.forward(x)?)
    }

    /// Scores the model on a partition in inference mode.
    ///
    /// # Errors
    ///
    /// Fails on an empty or mismatched partition or a width mismatch.
    pub fn evaluate(&mut self, x: &Tensor, y: &Tensor) -> TrainingResult<EvaluationReport> {
        check_partition("evaluation", x, y)?;
        let prediction = self.predict(x)?;
        Ok(EvaluationReport::from_predictions(
            prediction.data(),
            y.data(),
            self.model.regularization_loss(),
        ))
    }
}

impl std::fmt::Debug for Trainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field("parameters", &self.optimizers.len())
            .field("early_stopping", &self.early_stopping)
            .field("hooks", &self.hooks)
            .finish()
    }
}

fn check_partition(name: &str, x: &Tensor, y: &Tensor) -> TrainingResult<()> {
    if x.ndim() != 2 || y.ndim() != 2 || y.shape()[1] != 1 {
        return Err(TrainingError::EmptySplit(format!(
            "{} partition must be [n, d] features and [n, 1] targets, got {:?} and {:?}",
            name,
            x.shape(),
            y.shape()
        )));
    }
    if x.shape()[0] == 0 {
        return Err(TrainingError::EmptySplit(format!("{} partition has no rows", name)));
    }
    if x.shape()[0] != y.shape()[0] {
        return Err(TrainingError::EmptySplit(format!(
            "{} partition has {} feature rows but {} targets",
            name,
            x.shape()[0],
            y.shape()[0]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_layers::{ActivationType, Regularizer, SequentialConfig};

    fn linear_data(n: usize) -> (Tensor, Tensor) {
        let mut xs = Vec::with_capacity(n * 2);
        let mut ys = Vec::with_capacity(n);
        for i in 0..n {
            let a = (i as f32 / n as f32) * 2.0 - 1.0;
            let b = ((i * 7) % n) as f32 / n as f32 - 0.5;
            xs.push(a);
            xs.push(b);
            ys.push(3.0 * a - 2.0 * b + 0.5);
        }
        (Tensor::from_data(&[n, 2], xs), Tensor::from_data(&[n, 1], ys))
    }

    fn linear_model() -> Sequential {
        SequentialConfig::new(2)
            .add_dense(1, ActivationType::None, Regularizer::None)
            .build(3)
            .unwrap()
    }

    fn config(epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            batch_size: 8,
            optimizer: OptimizerConfig::Adam {
                learning_rate: 0.05,
                beta1: 0.9,
                beta2: 0.999,
                epsilon: 1e-7,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 100);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.patience, 10);
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad = TrainingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(TrainingError::Config(_))));
        let bad = TrainingConfig {
            validation_fraction: 1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = TrainingConfig {
            optimizer: OptimizerConfig::Sgd { learning_rate: 0.0 },
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(TrainingError::Optimizer(_))));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: TrainingConfig = serde_json::from_str(r#"{"epochs": 5}"#).unwrap();
        assert_eq!(config.epochs, 5);
        assert_eq!(config.batch_size, 32);
    }

    #[test]
    fn test_fits_linear_target() {
        let (x, y) = linear_data(64);
        let (xv, yv) = linear_data(16);
        let mut trainer = Trainer::with_model(linear_model(), config(150)).unwrap();
        let before = trainer.evaluate(&xv, &yv).unwrap();
        let history = trainer.fit(&x, &y, &xv, &yv).unwrap();
        let after = trainer.evaluate(&xv, &yv).unwrap();

        assert!(!history.is_empty());
        assert!(after.loss < before.loss * 0.1, "{} vs {}", after.loss, before.loss);
        assert!(after.r2 > 0.9);
        assert!(!trainer.model().is_training());
    }

    #[test]
    fn test_restores_best_epoch() {
        let (x, y) = linear_data(32);
        let (xv, yv) = linear_data(8);
        let mut trainer = Trainer::with_model(linear_model(), config(40)).unwrap();
        let history = trainer.fit(&x, &y, &xv, &yv).unwrap();

        let best = history.best().unwrap();
        let min = history
            .epochs
            .iter()
            .map(|r| r.val_loss)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(best.val_loss, min);

        let now = trainer.evaluate(&xv, &yv).unwrap();
        assert!((now.loss - best.val_loss).abs() < 1e-6);
    }

    #[test]
    fn test_stops_when_validation_stalls() {
        let (x, y) = linear_data(32);
        // validation targets unrelated to the features
        let xv = Tensor::from_data(&[4, 2], vec![0.0; 8]);
        let yv = Tensor::from_data(&[4, 1], vec![100.0, -100.0, 100.0, -100.0]);
        let mut cfg = config(200);
        cfg.patience = 3;
        let mut trainer = Trainer::with_model(linear_model(), cfg).unwrap();
        let history = trainer.fit(&x, &y, &xv, &yv).unwrap();
        assert!(history.stopped_early);
        assert!(history.len() < 200);
        let best = history.best_epoch.unwrap();
        assert_eq!(history.len(), best + 3);
    }

    #[test]
    fn test_width_mismatch_is_fatal() {
        let (x, y) = linear_data(8);
        let mut trainer = Trainer::new(5, TrainingConfig::default()).unwrap();
        let err = trainer.fit(&x, &y, &x, &y).unwrap_err();
        assert!(matches!(err, TrainingError::Layer(_)));
    }

    #[test]
    fn test_empty_partition() {
        let (x, y) = linear_data(8);
        let empty_x = Tensor::zeros(&[0, 2]);
        let empty_y = Tensor::zeros(&[0, 1]);
        let mut trainer = Trainer::with_model(linear_model(), config(1)).unwrap();
        assert!(matches!(
            trainer.fit(&x, &y, &empty_x, &empty_y),
            Err(TrainingError::EmptySplit(_))
        ));
        assert!(matches!(
            trainer.fit(&x, &Tensor::zeros(&[3, 1]), &x, &y),
            Err(TrainingError::EmptySplit(_))
        ));
    }

    #[test]
    fn test_train_epoch_rejects_short_targets() {
        let (x, _) = linear_data(8);
        let mut trainer = Trainer::with_model(linear_model(), config(1)).unwrap();
        let err = trainer.train_epoch(1, &x, &Tensor::zeros(&[5, 1])).unwrap_err();
        assert!(matches!(err, TrainingError::EmptySplit(_)));
        let err = trainer
            .train_epoch(1, &Tensor::zeros(&[0, 2]), &Tensor::zeros(&[0, 1]))
            .unwrap_err();
        assert!(matches!(err, TrainingError::EmptySplit(_)));
    }

    #[test]
    fn test_non_finite_loss() {
        let (x, _) = linear_data(8);
        let y = Tensor::full(&[8, 1], f32::NAN);
        let mut trainer = Trainer::with_model(linear_model(), config(1)).unwrap();
        let err = trainer.train_epoch(1, &x, &y).unwrap_err();
        assert!(matches!(err, TrainingError::NonFiniteLoss { epoch: 1, batch: 0 }));
    }
}
