//! # spikegrad CLI - surrogate-gradient SNN training from the command line
//!
//! Wires a dataset (MNIST IDX files or synthetic blobs) into the core
//! trainer and reports losses and accuracies as the run progresses.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod error;
mod mnist;

use commands::SpikegradCli;
use error::CliResult;

fn main() -> CliResult<()> {
    // Initialize logging with environment variable support
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Parse CLI arguments
    let cli = SpikegradCli::parse();

    // Execute the command
    if let Err(err) = cli.execute() {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }

    Ok(())
}
