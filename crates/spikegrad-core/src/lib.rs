//! Surrogate-gradient training for leaky integrate-and-fire networks
//!
//! A two-population feed-forward spiking network is unrolled over a fixed
//! number of discrete time steps, spikes carry the signal between
//! populations, and gradients flow back through the spike decisions via a
//! smooth surrogate derivative. Membrane state is threaded explicitly
//! through every call; nothing persists between unrolls.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod backprop;
pub mod data;
pub mod error;
pub mod eval;
pub mod layer;
pub mod loss;
pub mod network;
pub mod neuron;
pub mod optim;
pub mod simulation;
pub mod surrogate;
pub mod trainer;

// Re-export essential types
pub use data::{BatchLoader, Dataset};
pub use error::{Result, SnnError};
pub use eval::Accuracy;
pub use layer::{Dense, DenseGrads};
pub use loss::{temporal_cross_entropy, TemporalLoss};
pub use network::{NetGrads, SpikeNet, SpikeNetConfig};
pub use neuron::{Lif, LifParams, LifState};
pub use optim::{Adam, AdamParams};
pub use simulation::{SimParams, TemporalSimulator, Trajectory, Unroll};
pub use surrogate::Surrogate;
pub use trainer::{Trainer, TrainerConfig, TrainReport};

/// Default number of time steps per unroll
pub const DEFAULT_NUM_STEPS: usize = 25;

/// Default membrane decay coefficient
pub const DEFAULT_BETA: f32 = 0.95;
