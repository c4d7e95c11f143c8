//! Training metrics and evaluation reports.
//!
//! [`EpochRecord`] holds what one epoch produced, [`TrainingHistory`] the
//! whole run, and [`EvaluationReport`] the held-out test score.

use serde::{Deserialize, Serialize};

/// Metrics for a single epoch.
///
/// Losses include the L2 penalty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EpochRecord {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Mean training loss over the epoch's batches, weighted by batch size.
    pub loss: f64,
    /// Mean absolute training error.
    pub mae: f64,
    /// Validation loss after the epoch.
    pub val_loss: f64,
    /// Validation mean absolute error after the epoch.
    pub val_mae: f64,
}

impl EpochRecord {
    /// Looks up a metric by its name (`loss`, `mae`, `val_loss`, `val_mae`).
    ///
    /// # Examples
    ///
    /// ```
    /// use skycast_training::metrics::EpochRecord;
    ///
    /// let record = EpochRecord { epoch: 1, val_loss: 0.5, ..Default::default() };
    /// assert_eq!(record.metric("val_loss"), Some(0.5));
    /// assert_eq!(record.metric("accuracy"), None);
    /// ```
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "loss" => Some(self.loss),
            "mae" => Some(self.mae),
            "val_loss" => Some(self.val_loss),
            "val_mae" => Some(self.val_mae),
            _ => None,
        }
    }
}

/// All epochs of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Records in epoch order.
    pub epochs: Vec<EpochRecord>,
    /// Epoch whose weights the model holds after training.
    pub best_epoch: Option<usize>,
    /// Whether early stopping ended the run before the epoch limit.
    pub stopped_early: bool,
}

impl TrainingHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an epoch.
    pub fn push(&mut self, record: EpochRecord) {
        self.epochs.push(record);
    }

    /// Number of completed epochs.
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    /// Returns true if no epoch completed.
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Most recent epoch.
    pub fn last(&self) -> Option<&EpochRecord> {
        self.epochs.last()
    }

    /// Record of [`TrainingHistory::best_epoch`].
    pub fn best(&self) -> Option<&EpochRecord> {
        let best = self.best_epoch?;
        self.epochs.iter().find(|r| r.epoch == best)
    }
}

/// Sample-weighted running sums for one pass over the data.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    loss_sum: f64,
    abs_error_sum: f64,
    count: usize,
}

impl MetricsRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a batch mean `loss` and its summed absolute error.
    pub fn record(&mut self, loss: f64, abs_error_sum: f64, batch_size: usize) {
        self.loss_sum += loss * batch_size as f64;
        self.abs_error_sum += abs_error_sum;
        self.count += batch_size;
    }

    /// Number of samples seen.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean loss per sample, 0 if nothing was recorded.
    pub fn mean_loss(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.loss_sum / self.count as f64
        }
    }

    /// Mean absolute error per sample, 0 if nothing was recorded.
    pub fn mean_abs_error(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.abs_error_sum / self.count as f64
        }
    }
}

/// Regression quality on a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Number of rows scored.
    pub samples: usize,
    /// Mean squared error plus the L2 penalty.
    pub loss: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error (no penalty).
    pub rmse: f64,
    /// Coefficient of determination.
    pub r2: f64,
}

impl EvaluationReport {
    /// Scores `predictions` against `targets`.
    ///
    /// R² is 1 for a perfect fit; if the targets are constant and the fit is
    /// not perfect it is reported as 0.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length or are empty.
    pub fn from_predictions(predictions: &[f32], targets: &[f32], penalty: f32) -> Self {
        assert_eq!(predictions.len(), targets.len(), "length mismatch");
        assert!(!targets.is_empty(), "no samples to evaluate");

        let n = targets.len() as f64;
        let mean_target = targets.iter().map(|&t| f64::from(t)).sum::<f64>() / n;

        let mut ss_res = 0.0;
        let mut abs_sum = 0.0;
        let mut ss_tot = 0.0;
        for (&p, &t) in predictions.iter().zip(targets) {
            let err = f64::from(p) - f64::from(t);
            ss_res += err * err;
            abs_sum += err.abs();
            let dev = f64::from(t) - mean_target;
            ss_tot += dev * dev;
        }

        let mse = ss_res / n;
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            samples: targets.len(),
            loss: mse + f64::from(penalty),
            mae: abs_sum / n,
            rmse: mse.sqrt(),
            r2,
        }
    }
}
