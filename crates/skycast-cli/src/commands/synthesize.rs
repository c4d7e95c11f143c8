//! Synthesize Command Implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use skycast_data::{generate, SyntheticConfig};
use tracing::info;

/// Write a synthetic weather history in the input CSV layout
#[derive(Args, Debug, Clone)]
pub struct SynthesizeCommand {
    /// Number of hourly rows
    #[arg(long, short = 'r', default_value_t = 1000)]
    pub rows: usize,

    /// Number of distinct weather labels (1-10)
    #[arg(long, short = 'k', default_value_t = 4)]
    pub categories: usize,

    /// Destination file
    #[arg(long)]
    pub out: PathBuf,

    /// Random seed
    #[arg(long, short = 's', default_value_t = 42)]
    pub seed: u64,

    /// Probability of leaving a cell empty (first row is always complete)
    #[arg(long, default_value_t = 0.0)]
    pub missing_rate: f64,
}

impl SynthesizeCommand {
    /// Generator settings from the flags
    pub fn config(&self) -> SyntheticConfig {
        SyntheticConfig::new(self.rows, self.categories, self.seed)
            .with_missing_rate(self.missing_rate)
    }

    /// Execute the synthesize command
    pub fn run(&self) -> Result<()> {
        let table = generate(&self.config()).context("Invalid synthetic data settings")?;
        table
            .write_csv(&self.out)
            .with_context(|| format!("Failed to write {}", self.out.display()))?;
        info!(path = %self.out.display(), rows = table.len(), "Wrote synthetic history");
        println!("Wrote {} rows to {}", table.len(), self.out.display());
        Ok(())
    }
}
