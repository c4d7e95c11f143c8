//! Train Command Implementation
//!
//! Runs load, feature building, training, evaluation and persistence in one
//! go. Configuration comes from defaults, an optional JSON file and flags.

use anyhow::{Context, Result};
use clap::Args;
use skycast_training::{run_pipeline, PipelineConfig};
use tracing::info;

use crate::GlobalArgs;

/// Train the temperature model and save it with its scaler
///
/// # Example
///
/// ```bash
/// skycast --data history.csv --output-dir models train --epochs 50
/// ```
#[derive(Args, Debug, Clone, Default)]
pub struct TrainCommand {
    /// Maximum number of epochs [default: 100]
    #[arg(long, short = 'e')]
    pub epochs: Option<usize>,

    /// Rows per gradient step [default: 32]
    #[arg(long, short = 'b')]
    pub batch_size: Option<usize>,

    /// Seed for initialization, splitting and shuffling [default: 42]
    #[arg(long, short = 's')]
    pub seed: Option<u64>,
}

impl TrainCommand {
    /// Applies the flags on top of `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.training.batch_size = batch_size;
        }
        if let Some(seed) = self.seed {
            config.training.seed = seed;
        }
    }

    /// Execute the train command
    pub fn run(&self, global: &GlobalArgs) -> Result<()> {
        let mut config = global.pipeline_config()?;
        self.apply(&mut config);

        info!(
            data = %config.data.path.display(),
            output = %config.output.dir.display(),
            "Starting training pipeline"
        );
        let report = run_pipeline(&config).with_context(|| {
            format!(
                "Training pipeline failed for {}",
                config.data.path.display()
            )
        })?;

        println!(
            "Trained on {} rows with {} features for {} epochs (best epoch {})",
            report.rows,
            report.feature_width,
            report.history.len(),
            report
                .history
                .best_epoch
                .map_or_else(|| "-".to_string(), |e| e.to_string())
        );
        println!(
            "Test MAE: {:.4}  RMSE: {:.4}  R2: {:.4}",
            report.test.mae, report.test.rmse, report.test.r2
        );
        if let Some(baseline) = &report.baseline {
            println!(
                "Baseline temp ~ {}: MAE: {:.4}  RMSE: {:.4}  R2: {:.4}",
                baseline.model.feature, baseline.test.mae, baseline.test.rmse, baseline.test.r2
            );
        }
        println!("Model saved to {}", report.model_path.display());
        println!("Scaler saved to {}", report.scaler_path.display());
        Ok(())
    }
}
