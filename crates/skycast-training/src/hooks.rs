//! Epoch hooks for the training loop.
//!
//! Hooks observe each finished epoch and can ask the trainer to stop.
//! [`EarlyStopping`] is the one the trainer always runs; extra hooks such as
//! [`LoggingHook`] are registered through a [`HookList`].

use tracing::{debug, info, warn};

use crate::metrics::{EpochRecord, TrainingHistory};

/// Action to take after a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Continue training normally.
    Continue,
    /// Stop training early.
    Stop,
}

/// Trait for training hooks.
///
/// # Examples
///
/// ```
/// use skycast_training::hooks::{Hook, HookAction};
/// use skycast_training::metrics::EpochRecord;
///
/// struct StopAfterFive;
///
/// impl Hook for StopAfterFive {
///     fn name(&self) -> &str {
///         "stop_after_five"
///     }
///
///     fn after_epoch(&mut self, record: &EpochRecord) -> HookAction {
///         if record.epoch >= 5 {
///             HookAction::Stop
///         } else {
///             HookAction::Continue
///         }
///     }
/// }
/// ```
pub trait Hook: Send {
    /// Returns the name of this hook for logging purposes.
    fn name(&self) -> &str;

    /// Called after each epoch with its metrics.
    fn after_epoch(&mut self, _record: &EpochRecord) -> HookAction {
        HookAction::Continue
    }

    /// Called once when training ends.
    fn end(&mut self, _history: &TrainingHistory) {}
}

/// Logs epoch metrics at regular intervals.
#[derive(Debug)]
pub struct LoggingHook {
    every_n_epochs: usize,
}

impl LoggingHook {
    /// Creates a hook that logs every `every_n_epochs` epochs (and the first).
    pub fn new(every_n_epochs: usize) -> Self {
        Self {
            every_n_epochs: every_n_epochs.max(1),
        }
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Hook for LoggingHook {
    fn name(&self) -> &str {
        "logging_hook"
    }

    fn after_epoch(&mut self, record: &EpochRecord) -> HookAction {
        if record.epoch == 1 || record.epoch % self.every_n_epochs == 0 {
            info!(
                epoch = record.epoch,
                loss = record.loss,
                mae = record.mae,
                val_loss = record.val_loss,
                val_mae = record.val_mae,
                "Epoch finished"
            );
        }
        HookAction::Continue
    }

    fn end(&mut self, history: &TrainingHistory) {
        match history.best() {
            Some(best) => info!(
                epochs = history.len(),
                best_epoch = best.epoch,
                val_loss = best.val_loss,
                stopped_early = history.stopped_early,
                "Training finished"
            ),
            None => info!(epochs = history.len(), "Training finished"),
        }
    }
}

/// Stops training when a monitored metric stops improving.
///
/// Lower values are better for every metric an [`EpochRecord`] carries. An
/// epoch improves on the best so far when `current < best - min_delta`.
///
/// # Examples
///
/// ```
/// use skycast_training::hooks::{EarlyStopping, Hook, HookAction};
/// use skycast_training::metrics::EpochRecord;
///
/// let mut stopper = EarlyStopping::new("val_loss", 2, 0.0);
/// let epoch = |epoch, val_loss| EpochRecord { epoch, val_loss, ..Default::default() };
///
/// assert_eq!(stopper.after_epoch(&epoch(1, 1.0)), HookAction::Continue);
/// assert_eq!(stopper.after_epoch(&epoch(2, 1.5)), HookAction::Continue);
/// assert_eq!(stopper.after_epoch(&epoch(3, 1.0)), HookAction::Stop);
/// assert_eq!(stopper.best_epoch(), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    metric_name: String,
    patience: usize,
    min_delta: f64,
    restore_best_weights: bool,
    best_value: Option<f64>,
    best_epoch: Option<usize>,
    epochs_without_improvement: usize,
    improved: bool,
}

impl EarlyStopping {
    /// Creates a monitor.
    ///
    /// # Arguments
    ///
    /// * `metric_name` - Metric to watch (`loss`, `mae`, `val_loss`, `val_mae`).
    /// * `patience` - Epochs without improvement before stopping.
    /// * `min_delta` - Minimum decrease that counts as improvement.
    pub fn new(metric_name: impl Into<String>, patience: usize, min_delta: f64) -> Self {
        Self {
            metric_name: metric_name.into(),
            patience,
            min_delta,
            restore_best_weights: true,
            best_value: None,
            best_epoch: None,
            epochs_without_improvement: 0,
            improved: false,
        }
    }

    /// Sets whether the trainer should roll back to the best epoch's weights.
    pub fn with_restore_best_weights(mut self, restore: bool) -> Self {
        self.restore_best_weights = restore;
        self
    }

    /// Whether the best epoch's weights should be restored at the end.
    pub fn restore_best_weights(&self) -> bool {
        self.restore_best_weights
    }

    /// Best metric value seen so far.
    pub fn best_value(&self) -> Option<f64> {
        self.best_value
    }

    /// Epoch that produced [`EarlyStopping::best_value`].
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Whether the most recent epoch set a new best.
    pub fn improved(&self) -> bool {
        self.improved
    }

    fn is_improvement(&self, current: f64) -> bool {
        match self.best_value {
            None => true,
            Some(best) => current < best - self.min_delta,
        }
    }
}

impl Hook for EarlyStopping {
    fn name(&self) -> &str {
        "early_stopping"
    }

    fn after_epoch(&mut self, record: &EpochRecord) -> HookAction {
        self.improved = false;
        let current = match record.metric(&self.metric_name) {
            Some(v) => v,
            None => {
                warn!(
                    "EarlyStopping: metric '{}' not found in epoch record",
                    self.metric_name
                );
                return HookAction::Continue;
            }
        };

        if self.is_improvement(current) {
            debug!(
                "EarlyStopping: {} improved from {:?} to {} at epoch {}",
                self.metric_name, self.best_value, current, record.epoch
            );
            self.best_value = Some(current);
            self.best_epoch = Some(record.epoch);
            self.epochs_without_improvement = 0;
            self.improved = true;
        } else {
            self.epochs_without_improvement += 1;
            debug!(
                "EarlyStopping: no improvement for {} epochs (patience: {})",
                self.epochs_without_improvement, self.patience
            );

            if self.epochs_without_improvement >= self.patience {
                info!(
                    "EarlyStopping: stopping at epoch {} (no improvement since epoch {:?})",
                    record.epoch, self.best_epoch
                );
                return HookAction::Stop;
            }
        }

        HookAction::Continue
    }
}

/// A collection of hooks that are run together.
#[derive(Default)]
pub struct HookList {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookList {
    /// Creates a new empty hook list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook to the list.
    pub fn add<H: Hook + 'static>(&mut self, hook: H) {
        self.hooks.push(Box::new(hook));
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs `after_epoch` on every hook.
    ///
    /// Returns [`HookAction::Stop`] if any hook requests stopping; all hooks
    /// still see the epoch.
    pub fn after_epoch(&mut self, record: &EpochRecord) -> HookAction {
        let mut action = HookAction::Continue;
        for hook in &mut self.hooks {
            if hook.after_epoch(record) == HookAction::Stop {
                debug!(hook = hook.name(), epoch = record.epoch, "Hook requested stop");
                action = HookAction::Stop;
            }
        }
        action
    }

    /// Runs `end` on every hook.
    pub fn end(&mut self, history: &TrainingHistory) {
        for hook in &mut self.hooks {
            hook.end(history);
        }
    }
}

impl std::fmt::Debug for HookList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("HookList").field("hooks", &names).finish()
    }
}
