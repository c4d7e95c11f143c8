//! Training loop and artifact persistence for skycast.
//!
//! This crate wires the data and layer crates into a temperature regressor:
//!
//! - [`model`] - The fixed network topology
//! - [`trainer`] - Mini-batch training with validation and early stopping
//! - [`hooks`] - Epoch hooks, including [`EarlyStopping`]
//! - [`metrics`] - Epoch records, history and test reports
//! - [`baseline`] - Least-squares reference fit on one feature
//! - [`artifacts`] - Model and scaler files
//! - [`pipeline`] - The full load-to-persist run
//!
//! # Example
//!
//! ```no_run
//! use skycast_training::{run_pipeline, PipelineConfig};
//!
//! let report = run_pipeline(&PipelineConfig::default()).unwrap();
//! println!("test MAE: {:.3}", report.test.mae);
//! ```

#![warn(missing_docs)]

pub mod artifacts;
pub mod baseline;
pub mod error;
pub mod hooks;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod trainer;

pub use artifacts::{
    load_model, load_scaler, ArtifactWriter, ModelArtifact, PendingFile, ScalerArtifact,
    MODEL_FILE, SCALER_FILE,
};
pub use baseline::{BaselineReport, LinearBaseline, BASELINE_FEATURE};
pub use error::{ArtifactError, ArtifactResult, TrainingError, TrainingResult};
pub use hooks::{EarlyStopping, Hook, HookAction, HookList, LoggingHook};
pub use metrics::{EpochRecord, EvaluationReport, TrainingHistory};
pub use model::{build_model, network_config};
pub use pipeline::{
    run_pipeline, DataConfig, OutputConfig, PipelineConfig, PipelineReport, DEFAULT_DATA_PATH,
    DEFAULT_OUTPUT_DIR,
};
pub use trainer::{Trainer, TrainingConfig};
