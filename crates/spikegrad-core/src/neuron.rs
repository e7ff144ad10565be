//! Leaky integrate-and-fire neuron dynamics
//!
//! State is threaded functionally through [`Lif::step`]; nothing here keeps
//! hidden per-call state, so every unroll starts from a fresh [`LifState`].

use crate::{error::*, surrogate::Surrogate};
use ndarray::Array2;

/// Parameters for leaky integrate-and-fire neurons
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LifParams {
    /// Membrane decay coefficient, fraction of potential kept per step
    pub beta: f32,
    /// Firing threshold
    pub threshold: f32,
    /// Membrane potential at the start of an unroll
    pub v_init: f32,
    /// Surrogate derivative used in the backward pass
    pub surrogate: Surrogate,
    /// Treat the subtractive reset as a constant during backpropagation
    pub detach_reset: bool,
}

impl Default for LifParams {
    fn default() -> Self {
        Self {
            beta: 0.95,        // keep 95% of the potential each step
            threshold: 1.0,    // unit firing threshold
            v_init: 0.0,       // leak-free baseline
            surrogate: Surrogate::default(),
            detach_reset: true,
        }
    }
}

impl LifParams {
    /// Create new LIF parameters with validation
    pub fn new(beta: f32, threshold: f32) -> Result<Self> {
        let params = Self {
            beta,
            threshold,
            ..Default::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Set the surrogate gradient shape
    pub fn with_surrogate(mut self, surrogate: Surrogate) -> Self {
        self.surrogate = surrogate;
        self
    }

    /// Set whether the reset term is excluded from the gradient path
    pub fn with_detach_reset(mut self, detach: bool) -> Self {
        self.detach_reset = detach;
        self
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.beta.is_finite() || self.beta <= 0.0 || self.beta >= 1.0 {
            return Err(SnnError::invalid_parameter(
                "beta",
                self.beta.to_string(),
                "in (0.0, 1.0)",
            ));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(SnnError::invalid_parameter(
                "threshold",
                self.threshold.to_string(),
                "finite and > 0.0",
            ));
        }
        if !self.v_init.is_finite() || self.v_init >= self.threshold {
            return Err(SnnError::invalid_parameter(
                "v_init",
                self.v_init.to_string(),
                "finite and < threshold",
            ));
        }
        self.surrogate.validate()?;
        Ok(())
    }
}

/// Membrane state of one neuron population, shape `(batch, width)`
///
/// Carries the previous step's spikes alongside the potential because the
/// subtractive reset at step `t` is driven by the spike of step `t-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct LifState {
    /// Membrane potential
    pub mem: Array2<f32>,
    /// Spikes emitted by the previous step
    pub spk: Array2<f32>,
}

impl LifState {
    /// Fresh state at the configured baseline potential, no prior spikes
    pub fn init(batch: usize, width: usize, v_init: f32) -> Self {
        Self {
            mem: Array2::from_elem((batch, width), v_init),
            spk: Array2::zeros((batch, width)),
        }
    }

    /// Population width
    pub fn width(&self) -> usize {
        self.mem.ncols()
    }

    /// Batch size
    pub fn batch(&self) -> usize {
        self.mem.nrows()
    }
}

/// Leaky integrate-and-fire population
#[derive(Debug, Clone)]
pub struct Lif {
    /// Neuron parameters
    pub params: LifParams,
}

impl Lif {
    /// Create a new LIF population
    pub fn new(params: LifParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Fresh state for one unroll
    pub fn init_state(&self, batch: usize, width: usize) -> LifState {
        LifState::init(batch, width, self.params.v_init)
    }

    /// Advance the population by one time step
    ///
    /// `V_t = beta * V_{t-1} + I_t - threshold * S_{t-1}`, then
    /// `S_t = [V_t >= threshold]`. Returns the spikes and the new state;
    /// the previous state is untouched.
    pub fn step(&self, current: &Array2<f32>, state: &LifState) -> Result<(Array2<f32>, LifState)> {
        if current.dim() != state.mem.dim() {
            return Err(SnnError::shape_mismatch(
                "lif step",
                format!("{:?}", state.mem.dim()),
                format!("{:?}", current.dim()),
            ));
        }

        // Decay, integrate, and subtract the previous step's reset
        let mem =
            &state.mem * self.params.beta + current - &state.spk * self.params.threshold;

        // Hard threshold; the smooth surrogate exists only in the backward pass
        let threshold = self.params.threshold;
        let spk = mem.mapv(|v| if v >= threshold { 1.0 } else { 0.0 });

        let next = LifState {
            mem,
            spk: spk.clone(),
        };
        Ok((spk, next))
    }

    /// Surrogate derivative of the spike output with respect to the potential
    pub fn spike_grad(&self, mem: &Array2<f32>) -> Array2<f32> {
        let shifted = mem - self.params.threshold;
        self.params.surrogate.grad_batch(&shifted)
    }
}
