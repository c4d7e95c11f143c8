//! Preview Command Implementation

use anyhow::{Context, Result};
use clap::Args;
use skycast_data::RawTable;

use crate::GlobalArgs;

/// Print the header and first rows of the input table
#[derive(Args, Debug, Clone)]
pub struct PreviewCommand {
    /// Number of rows to show
    #[arg(long, short = 'n', default_value_t = 10)]
    pub rows: usize,
}

impl PreviewCommand {
    /// Execute the preview command
    pub fn run(&self, global: &GlobalArgs) -> Result<()> {
        let config = global.pipeline_config()?;
        let path = &config.data.path;
        let table = RawTable::from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;

        print!("{}", table.preview(self.rows));
        println!(
            "[{} rows x {} columns]",
            table.len(),
            table.headers().len()
        );
        Ok(())
    }
}
