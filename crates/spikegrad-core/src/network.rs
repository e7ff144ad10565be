//! Two-population feed-forward spiking network

use crate::{
    error::*,
    layer::{Dense, DenseGrads},
    neuron::{Lif, LifParams, LifState},
};
use ndarray::Array2;
use rand::rngs::StdRng;

/// Network architecture parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpikeNetConfig {
    /// Input feature width (flattened image length)
    pub num_inputs: usize,
    /// Hidden population width
    pub num_hidden: usize,
    /// Output population width (number of classes)
    pub num_outputs: usize,
    /// LIF parameters shared by both populations
    pub lif: LifParams,
}

impl Default for SpikeNetConfig {
    fn default() -> Self {
        Self {
            num_inputs: 28 * 28,
            num_hidden: 1000,
            num_outputs: 10,
            lif: LifParams::default(),
        }
    }
}

impl SpikeNetConfig {
    /// Create a new configuration with validation
    pub fn new(num_inputs: usize, num_hidden: usize, num_outputs: usize) -> Result<Self> {
        let config = Self {
            num_inputs,
            num_hidden,
            num_outputs,
            lif: LifParams::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the LIF parameters for both populations
    pub fn with_lif(mut self, lif: LifParams) -> Self {
        self.lif = lif;
        self
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("num_inputs", self.num_inputs),
            ("num_hidden", self.num_hidden),
            ("num_outputs", self.num_outputs),
        ] {
            if value == 0 {
                return Err(SnnError::invalid_parameter(name, "0", "> 0"));
            }
        }
        self.lif.validate()?;
        Ok(())
    }
}

/// Feed-forward stack: `fc1 -> lif1 -> fc2 -> lif2`
///
/// Spikes are the only signal crossing between populations; membrane
/// potential travels only along the time axis inside each population.
#[derive(Debug, Clone)]
pub struct SpikeNet {
    /// Input-to-hidden affine map
    pub fc1: Dense,
    /// Hidden population
    pub lif1: Lif,
    /// Hidden-to-output affine map
    pub fc2: Dense,
    /// Output population
    pub lif2: Lif,
    config: SpikeNetConfig,
}

/// One spatial step through the stack
#[derive(Debug)]
pub struct StackStep {
    /// Hidden spikes
    pub hidden_spikes: Array2<f32>,
    /// New hidden state
    pub hidden_state: LifState,
    /// Output spikes
    pub output_spikes: Array2<f32>,
    /// New output state
    pub output_state: LifState,
}

impl SpikeNet {
    /// Create a network with freshly initialized weights
    pub fn new(config: SpikeNetConfig, rng: &mut StdRng) -> Result<Self> {
        config.validate()?;

        let fc1 = Dense::new(config.num_inputs, config.num_hidden, rng)?;
        let lif1 = Lif::new(config.lif.clone())?;
        let fc2 = Dense::new(config.num_hidden, config.num_outputs, rng)?;
        let lif2 = Lif::new(config.lif.clone())?;

        Ok(Self {
            fc1,
            lif1,
            fc2,
            lif2,
            config,
        })
    }

    /// Architecture parameters
    pub fn config(&self) -> &SpikeNetConfig {
        &self.config
    }

    /// Fresh membrane states for both populations
    pub fn init_states(&self, batch: usize) -> (LifState, LifState) {
        (
            self.lif1.init_state(batch, self.config.num_hidden),
            self.lif2.init_state(batch, self.config.num_outputs),
        )
    }

    /// Run one time step: the static input drives the hidden population,
    /// whose spikes drive the output population
    pub fn step(
        &self,
        input: &Array2<f32>,
        hidden: &LifState,
        output: &LifState,
    ) -> Result<StackStep> {
        let hidden_current = self.fc1.forward(input)?;
        let (hidden_spikes, hidden_state) = self.lif1.step(&hidden_current, hidden)?;

        let output_current = self.fc2.forward(&hidden_spikes)?;
        let (output_spikes, output_state) = self.lif2.step(&output_current, output)?;

        Ok(StackStep {
            hidden_spikes,
            hidden_state,
            output_spikes,
            output_state,
        })
    }
}

/// Gradient buffers for every learned parameter in the stack
#[derive(Debug, Clone)]
pub struct NetGrads {
    /// Input-to-hidden gradients
    pub fc1: DenseGrads,
    /// Hidden-to-output gradients
    pub fc2: DenseGrads,
}

impl NetGrads {
    /// Zeroed buffers shaped like `net`
    pub fn zeros_like(net: &SpikeNet) -> Self {
        Self {
            fc1: DenseGrads::zeros_like(&net.fc1),
            fc2: DenseGrads::zeros_like(&net.fc2),
        }
    }

    /// Clear accumulated gradients
    pub fn zero(&mut self) {
        self.fc1.zero();
        self.fc2.zero();
    }

    /// Whether every entry is finite
    pub fn is_finite(&self) -> bool {
        self.fc1.is_finite() && self.fc2.is_finite()
    }
}
