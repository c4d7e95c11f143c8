//! Skycast CLI Library
//!
//! This crate provides the command-line interface for skycast:
//!
//! - **Train**: Run the full pipeline and write the model and scaler (the default)
//! - **Preview**: Show the first rows of the input table
//! - **Synthesize**: Write a synthetic weather history in the input format
//!
//! # Example
//!
//! ```bash
//! # Train on Bucharest_Hist_Temp.csv, writing to models/
//! skycast
//!
//! # Train on another file with a config
//! skycast --data history.csv --config skycast.json train --epochs 50
//!
//! # Generate test data
//! skycast synthesize --rows 1000 --categories 4 --out history.csv
//! ```

pub mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use skycast_training::PipelineConfig;
use tracing::info;

pub use commands::{PreviewCommand, SynthesizeCommand, TrainCommand};

/// Skycast - temperature prediction from historical weather observations
///
/// Without a subcommand, trains on the default input and writes artifacts to
/// the default output directory.
#[derive(Parser, Debug)]
#[command(name = "skycast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Dispatches to the selected command, defaulting to `train`.
    pub fn run(self) -> Result<()> {
        match self.command {
            None => TrainCommand::default().run(&self.global),
            Some(Commands::Train(cmd)) => cmd.run(&self.global),
            Some(Commands::Preview(cmd)) => cmd.run(&self.global),
            Some(Commands::Synthesize(cmd)) => cmd.run(),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: load, build features, train, evaluate, save
    Train(TrainCommand),

    /// Print the header and first rows of the input table
    Preview(PreviewCommand),

    /// Write a synthetic weather history CSV
    Synthesize(SynthesizeCommand),
}

/// Options shared across commands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Pipeline configuration file (JSON)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Weather history CSV [default: Bucharest_Hist_Temp.csv]
    #[arg(long, short = 'd', global = true)]
    pub data: Option<PathBuf>,

    /// Directory for the model and scaler files [default: models]
    #[arg(long, short = 'o', global = true)]
    pub output_dir: Option<PathBuf>,
}

impl GlobalArgs {
    /// Builds the pipeline configuration: defaults, then the config file,
    /// then command-line flags.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config from: {:?}", path);
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse config JSON {}", path.display()))?
            }
            None => PipelineConfig::default(),
        };
        if let Some(data) = &self.data {
            config.data.path = data.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        Ok(config)
    }
}
