//! SNN training command implementation

use clap::{Args, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;

use crate::error::{CliError, CliResult};
use crate::mnist;
use spikegrad_core::{
    eval, AdamParams, Dataset, LifParams, SimParams, SpikeNet, SpikeNetConfig, Surrogate, Trainer,
    TrainerConfig,
};

/// Train a spiking classifier with surrogate-gradient descent
#[derive(Args, Debug)]
pub struct TrainCommand {
    /// Dataset to train on
    #[arg(long, default_value = "mnist")]
    pub dataset: DatasetKind,

    /// Directory holding the MNIST IDX files
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: PathBuf,

    /// Number of hidden neurons
    #[arg(long, default_value = "1000")]
    pub hidden: usize,

    /// Number of simulation time steps per unroll
    #[arg(long, default_value = "25")]
    pub steps: usize,

    /// Membrane decay coefficient
    #[arg(long, default_value = "0.95")]
    pub beta: f32,

    /// Surrogate gradient shape
    #[arg(long, default_value = "fast-sigmoid")]
    pub surrogate: SurrogateKind,

    /// Surrogate steepness
    #[arg(long, default_value = "25.0")]
    pub slope: f32,

    /// Samples per mini-batch
    #[arg(long, default_value = "128")]
    pub batch_size: usize,

    /// Number of passes over the training data
    #[arg(long, default_value = "1")]
    pub epochs: usize,

    /// Iterations between monitoring snapshots
    #[arg(long, default_value = "50")]
    pub print_freq: usize,

    /// Adam learning rate
    #[arg(long, default_value = "0.001")]
    pub lr: f32,

    /// Random seed for weight init and shuffling
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Output file for training results (JSON)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum DatasetKind {
    /// MNIST handwritten digits from IDX files
    Mnist,
    /// Synthetic separable blobs (smoke runs, no files needed)
    Synthetic,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum SurrogateKind {
    /// Fast sigmoid shape
    FastSigmoid,
    /// Scaled sigmoid derivative
    Sigmoid,
    /// Arctangent shape
    Atan,
}

impl TrainCommand {
    pub fn execute(self) -> CliResult<()> {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let (train, test) = match self.dataset {
            DatasetKind::Mnist => {
                info!("Loading MNIST from {}", self.data_dir.display());
                (
                    mnist::load_train(&self.data_dir)?,
                    mnist::load_test(&self.data_dir)?,
                )
            }
            DatasetKind::Synthetic => {
                info!("Generating synthetic blobs");
                (
                    Dataset::synthetic_blobs(256, 64, 4, 2.0, &mut rng)?,
                    Dataset::synthetic_blobs(64, 64, 4, 2.0, &mut rng)?,
                )
            }
        };

        let num_classes = 1 + train
            .labels()
            .iter()
            .copied()
            .max()
            .ok_or_else(|| CliError::dataset("train split has no labels"))?;

        let surrogate = match self.surrogate {
            SurrogateKind::FastSigmoid => Surrogate::FastSigmoid { slope: self.slope },
            SurrogateKind::Sigmoid => Surrogate::Sigmoid { slope: self.slope },
            SurrogateKind::Atan => Surrogate::Atan { alpha: self.slope },
        };
        let lif = LifParams::new(self.beta, 1.0)?.with_surrogate(surrogate);

        let config = SpikeNetConfig::new(train.num_features(), self.hidden, num_classes)?
            .with_lif(lif);
        let mut net = SpikeNet::new(config, &mut rng)?;

        info!(
            "Training {}-{}-{} network for {} epoch(s), {} steps per unroll",
            train.num_features(),
            self.hidden,
            num_classes,
            self.epochs,
            self.steps
        );

        let mut trainer = Trainer::new(
            &net,
            TrainerConfig::new(self.epochs, self.batch_size, self.print_freq)?,
            SimParams::new(self.steps)?,
            AdamParams::new(self.lr)?,
        )?;

        let report = trainer.run(&mut net, &train, &test, &mut rng)?;

        // Final sweep over the whole held-out split, partial batch kept
        let accuracy = eval::score_dataset(&net, trainer.simulator(), &test, self.batch_size)?;
        info!(
            "Total correctly classified test images: {}/{}",
            accuracy.correct, accuracy.total
        );
        info!("Test set accuracy: {:.2}%", accuracy.percent());

        if let Some(output_path) = self.output {
            info!("Saving results to: {}", output_path.display());
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let results_json = serde_json::json!({
                "network": {
                    "inputs": train.num_features(),
                    "hidden": self.hidden,
                    "outputs": num_classes,
                },
                "parameters": {
                    "beta": self.beta,
                    "steps": self.steps,
                    "batch_size": self.batch_size,
                    "epochs": self.epochs,
                    "lr": self.lr,
                    "seed": self.seed,
                },
                "results": {
                    "iterations": report.iterations(),
                    "train_loss": report.train_loss,
                    "test_loss": report.test_loss,
                    "test_correct": accuracy.correct,
                    "test_total": accuracy.total,
                    "test_accuracy_percent": accuracy.percent(),
                }
            });

            let json_string = serde_json::to_string_pretty(&results_json)
                .map_err(|e| CliError::Generic(anyhow::anyhow!("JSON serialization failed: {}", e)))?;
            std::fs::write(output_path, json_string)?;
        }

        Ok(())
    }
}
