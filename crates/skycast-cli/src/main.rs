//! Skycast CLI - trains the temperature model from a weather history CSV.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skycast_cli::Cli;

fn main() -> Result<()> {
    // RUST_LOG wins over the default directive
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skycast=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();

    info!("Skycast starting...");
    cli.run()?;
    info!("Skycast completed successfully");
    Ok(())
}
