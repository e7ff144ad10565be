//! CLI command implementations for spikegrad

use crate::error::CliResult;
use clap::{Parser, Subcommand};

pub mod train;

/// spikegrad - surrogate-gradient spiking network trainer
#[derive(Parser, Debug)]
#[command(
    name = "spikegrad",
    version,
    about = "Train leaky integrate-and-fire networks with surrogate gradients",
    long_about = "spikegrad unrolls a two-layer spiking network over discrete time \
                  steps and trains it by backpropagation-through-time, substituting \
                  a smooth surrogate derivative at every spike decision."
)]
pub struct SpikegradCli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a spiking classifier and report accuracy
    Train(train::TrainCommand),
}

impl SpikegradCli {
    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Train(cmd) => cmd.execute(),
        }
    }
}
