//! Mini-batch training loop
//!
//! One iteration is: fetch batch, unroll forward, aggregate the
//! time-distributed loss, backpropagate through time, apply the optimizer,
//! then evaluate one held-out batch against the freshly updated weights.
//! Monitoring is observability only; it never feeds back into training.

use crate::{
    backprop,
    data::{BatchLoader, Dataset},
    error::*,
    eval::{self, Accuracy},
    loss::temporal_cross_entropy,
    network::{NetGrads, SpikeNet},
    optim::{Adam, AdamParams},
    simulation::{SimParams, TemporalSimulator},
};
use rand::rngs::StdRng;

/// Training loop parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainerConfig {
    /// Full passes over the training data
    pub num_epochs: usize,
    /// Samples per mini-batch
    pub batch_size: usize,
    /// Iterations between monitoring snapshots
    pub print_freq: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            num_epochs: 1,
            batch_size: 128,
            print_freq: 50,
        }
    }
}

impl TrainerConfig {
    /// Create a new configuration with validation
    pub fn new(num_epochs: usize, batch_size: usize, print_freq: usize) -> Result<Self> {
        let config = Self {
            num_epochs,
            batch_size,
            print_freq,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("num_epochs", self.num_epochs),
            ("batch_size", self.batch_size),
            ("print_freq", self.print_freq),
        ] {
            if value == 0 {
                return Err(SnnError::invalid_parameter(name, "0", "> 0"));
            }
        }
        Ok(())
    }
}

/// Append-only loss histories, one entry per training iteration
#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    /// Training loss per iteration
    pub train_loss: Vec<f32>,
    /// Held-out loss per iteration
    pub test_loss: Vec<f32>,
}

impl TrainReport {
    /// Iterations recorded
    pub fn iterations(&self) -> usize {
        self.train_loss.len()
    }
}

/// Orchestrates forward simulation, loss, BPTT, and weight updates
#[derive(Debug)]
pub struct Trainer {
    config: TrainerConfig,
    simulator: TemporalSimulator,
    optimizer: Adam,
}

impl Trainer {
    /// Create a trainer for `net` with the given knobs
    pub fn new(
        net: &SpikeNet,
        config: TrainerConfig,
        sim_params: SimParams,
        adam_params: AdamParams,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            simulator: TemporalSimulator::new(sim_params)?,
            optimizer: Adam::new(net, adam_params)?,
        })
    }

    /// Trainer parameters
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// The simulator driving both training and held-out unrolls
    pub fn simulator(&self) -> &TemporalSimulator {
        &self.simulator
    }

    /// Run the configured number of epochs over `train`, evaluating one
    /// random `test` batch per iteration
    pub fn run(
        &mut self,
        net: &mut SpikeNet,
        train: &Dataset,
        test: &Dataset,
        rng: &mut StdRng,
    ) -> Result<TrainReport> {
        if test.is_empty() {
            return Err(SnnError::invalid_config("empty held-out split"));
        }

        let loader = BatchLoader::new(self.config.batch_size)?;
        let mut report = TrainReport::default();
        let mut grads = NetGrads::zeros_like(net);
        let mut counter = 0usize;

        log::info!(
            "training {} epoch(s), batch size {}, {} steps per unroll",
            self.config.num_epochs,
            self.config.batch_size,
            self.simulator.num_steps()
        );

        for epoch in 0..self.config.num_epochs {
            for (iteration, chunk) in loader.epoch_chunks(train, rng).into_iter().enumerate() {
                let (x, targets) = train.batch(&chunk);

                // Forward unroll and time-summed loss
                let unroll = self.simulator.run(net, &x)?;
                let loss = temporal_cross_entropy(&unroll.output.potentials, &targets)?;

                // Gradients and the single weight mutation of this iteration
                self.optimizer.zero_grads(&mut grads);
                backprop::accumulate(net, &unroll, &x, &loss.logit_grads, &mut grads)?;
                self.optimizer.step(net, &grads)?;
                report.train_loss.push(loss.value);

                // Held-out read, strictly after the update so it observes
                // this iteration's weights; no gradient work
                let (test_x, test_targets) = loader.sample(test, rng)?;
                let test_unroll = self.simulator.run(net, &test_x)?;
                let test_loss =
                    temporal_cross_entropy(&test_unroll.output.potentials, &test_targets)?;
                report.test_loss.push(test_loss.value);

                if counter % self.config.print_freq == 0 {
                    let train_acc = eval::score(&unroll.output.spikes, &targets)?;
                    let test_acc = eval::score(&test_unroll.output.spikes, &test_targets)?;
                    monitor_snapshot(
                        epoch,
                        iteration,
                        loss.value,
                        test_loss.value,
                        train_acc,
                        test_acc,
                    );
                }
                counter += 1;
            }
        }

        if let (Some(first), Some(last)) = (report.train_loss.first(), report.train_loss.last()) {
            log::info!(
                "training loss moved from {:.2} to {:.2} over {} iterations",
                first,
                last,
                report.iterations()
            );
        }

        Ok(report)
    }
}

/// Emit one monitoring line; counters arrive as arguments, not ambient state
fn monitor_snapshot(
    epoch: usize,
    iteration: usize,
    train_loss: f32,
    test_loss: f32,
    train_acc: Accuracy,
    test_acc: Accuracy,
) {
    log::info!(
        "epoch {} iteration {}: train loss {:.2}, test loss {:.2}, \
         train minibatch accuracy {:.2}%, test minibatch accuracy {:.2}%",
        epoch,
        iteration,
        train_loss,
        test_loss,
        train_acc.percent(),
        test_acc.percent()
    );
}
