//! End-to-end run: load, build features, train, evaluate, persist.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use skycast_data::{DataSplit, FeatureBuilder, RawTable};
use tracing::info;

use crate::artifacts::{ArtifactWriter, ScalerArtifact};
use crate::baseline::{fit_baseline, BaselineReport};
use crate::error::TrainingResult;
use crate::hooks::LoggingHook;
use crate::metrics::{EvaluationReport, TrainingHistory};
use crate::trainer::{Trainer, TrainingConfig};

/// Default input file.
pub const DEFAULT_DATA_PATH: &str = "Bucharest_Hist_Temp.csv";

/// Default artifact directory.
pub const DEFAULT_OUTPUT_DIR: &str = "models";

/// Input settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Weather history CSV.
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the model and scaler files.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Settings for a full pipeline run. Every section falls back to its
/// defaults when omitted from JSON.
///
/// ```
/// use skycast_training::PipelineConfig;
///
/// let config: PipelineConfig =
///     serde_json::from_str(r#"{"training": {"epochs": 5}}"#).unwrap();
/// assert_eq!(config.training.epochs, 5);
/// assert_eq!(config.training.batch_size, 32);
/// assert_eq!(config.output.dir.to_str(), Some("models"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input section.
    pub data: DataConfig,
    /// Training section.
    pub training: TrainingConfig,
    /// Output section.
    pub output: OutputConfig,
}

/// Outcome of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Rows loaded from the input.
    pub rows: usize,
    /// Width of the feature matrix.
    pub feature_width: usize,
    /// Per-epoch metrics.
    pub history: TrainingHistory,
    /// Score on the held-out test rows.
    pub test: EvaluationReport,
    /// One-feature linear baseline on the same test rows, if it could be fit.
    pub baseline: Option<BaselineReport>,
    /// Written model file.
    pub model_path: PathBuf,
    /// Written scaler file.
    pub scaler_path: PathBuf,
}

/// Runs every stage in order. Any failure aborts the run; artifacts are only
/// left on disk if both were written.
///
/// # Errors
///
/// Propagates the first loading, feature, training or persistence error.
pub fn run_pipeline(config: &PipelineConfig) -> TrainingResult<PipelineReport> {
    config.training.validate()?;

    let table = RawTable::from_path(&config.data.path)?;
    let set = FeatureBuilder::new().build(&table)?;

    let training = &config.training;
    let split = DataSplit::new(
        set.len(),
        training.test_fraction,
        training.validation_fraction,
        training.seed,
    )?;
    info!(
        train = split.train.len(),
        validation = split.validation.len(),
        test = split.test.len(),
        "Split rows"
    );
    let (x_train, y_train) = set.subset(&split.train);
    let (x_val, y_val) = set.subset(&split.validation);
    let (x_test, y_test) = set.subset(&split.test);

    let mut trainer = Trainer::new(set.width(), training.clone())?;
    trainer.add_hook(LoggingHook::default());
    let history = trainer.fit(&x_train, &y_train, &x_val, &y_val)?;

    let test = trainer.evaluate(&x_test, &y_test)?;
    info!(
        mae = test.mae,
        rmse = test.rmse,
        r2 = test.r2,
        loss = test.loss,
        "Test set evaluation"
    );
    let baseline = fit_baseline(&set.schema, &x_train, &y_train, &x_test, &y_test);

    let mut writer = ArtifactWriter::create(&config.output.dir)?;
    let model_path = writer.write_model(trainer.model())?;
    let scaler_path = writer.write_scaler(&ScalerArtifact {
        scaler: set.scaler.clone(),
        schema: set.schema.clone(),
    })?;
    writer.commit();

    Ok(PipelineReport {
        rows: table.len(),
        feature_width: set.width(),
        history,
        test,
        baseline,
        model_path,
        scaler_path,
    })
}
