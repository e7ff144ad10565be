//! Temporal unrolling of the layer stack
//!
//! One call runs the network for a fixed number of discrete time steps on a
//! single batch, threading membrane state forward and recording the spike
//! and potential trajectories. States are constructed fresh at every call,
//! so nothing leaks between samples or batches.

use crate::{error::*, network::SpikeNet};
use ndarray::Array2;

/// Simulation parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimParams {
    /// Number of discrete time steps per unroll
    pub num_steps: usize,
}

impl Default for SimParams {
    fn default() -> Self {
        Self { num_steps: 25 }
    }
}

impl SimParams {
    /// Create new simulation parameters with validation
    pub fn new(num_steps: usize) -> Result<Self> {
        if num_steps == 0 {
            return Err(SnnError::invalid_parameter("num_steps", "0", "> 0"));
        }
        Ok(Self { num_steps })
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        Self::new(self.num_steps)?;
        Ok(())
    }
}

/// Ordered spike and potential records of one population over one unroll
///
/// Both sequences have length `num_steps`; every tensor is
/// `(batch, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Binary spike tensors, one per time step
    pub spikes: Vec<Array2<f32>>,
    /// Raw membrane potential tensors, one per time step
    pub potentials: Vec<Array2<f32>>,
}

impl Trajectory {
    fn with_capacity(num_steps: usize) -> Self {
        Self {
            spikes: Vec::with_capacity(num_steps),
            potentials: Vec::with_capacity(num_steps),
        }
    }

    /// Number of recorded time steps
    pub fn num_steps(&self) -> usize {
        self.spikes.len()
    }
}

/// Full record of one forward unroll, both populations
///
/// The hidden records exist so backpropagation-through-time can replay the
/// unroll in reverse; consumers of the classification output only need
/// [`Unroll::output`].
#[derive(Debug, Clone)]
pub struct Unroll {
    /// Hidden population record
    pub hidden: Trajectory,
    /// Output population record
    pub output: Trajectory,
}

/// Fixed-step forward simulator
#[derive(Debug, Clone)]
pub struct TemporalSimulator {
    params: SimParams,
}

impl TemporalSimulator {
    /// Create a new simulator
    pub fn new(params: SimParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Simulation parameters
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Number of steps per unroll
    pub fn num_steps(&self) -> usize {
        self.params.num_steps
    }

    /// Unroll the network over `num_steps` steps on one batch
    ///
    /// The input is re-presented identically at every step. Returns the
    /// spike and potential trajectories of both populations; exactly
    /// `num_steps` tensors each.
    pub fn run(&self, net: &SpikeNet, input: &Array2<f32>) -> Result<Unroll> {
        if input.ncols() != net.config().num_inputs {
            return Err(SnnError::shape_mismatch(
                "simulator input",
                format!("(_, {})", net.config().num_inputs),
                format!("{:?}", input.dim()),
            ));
        }

        let batch = input.nrows();
        let (mut hidden_state, mut output_state) = net.init_states(batch);

        let mut hidden = Trajectory::with_capacity(self.params.num_steps);
        let mut output = Trajectory::with_capacity(self.params.num_steps);

        for _ in 0..self.params.num_steps {
            let step = net.step(input, &hidden_state, &output_state)?;

            hidden.potentials.push(step.hidden_state.mem.clone());
            hidden.spikes.push(step.hidden_spikes);
            output.potentials.push(step.output_state.mem.clone());
            output.spikes.push(step.output_spikes);

            hidden_state = step.hidden_state;
            output_state = step.output_state;
        }

        // NaN/Inf persists through the update rule, so checking the final
        // membranes catches an escape at any earlier step.
        let finite = hidden_state.mem.iter().all(|v| v.is_finite())
            && output_state.mem.iter().all(|v| v.is_finite());
        if !finite {
            return Err(SnnError::non_finite("membrane potential during unroll"));
        }

        log::debug!(
            "unrolled {} steps on batch of {}: {} output spikes",
            self.params.num_steps,
            batch,
            output.spikes.iter().map(|s| s.sum()).sum::<f32>()
        );

        Ok(Unroll { hidden, output })
    }
}
