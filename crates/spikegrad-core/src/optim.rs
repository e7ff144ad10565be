//! Adaptive moment estimation for the network weights
//!
//! The optimizer is the single writer of the learned parameters: nothing
//! else mutates weights, and it runs strictly between the backward pass and
//! the next forward unroll.

use crate::{
    error::*,
    network::{NetGrads, SpikeNet},
};
use ndarray::{Array, Array1, Array2, Dimension, Zip};

/// Adam hyperparameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdamParams {
    /// Learning rate
    pub lr: f32,
    /// First-moment decay
    pub beta1: f32,
    /// Second-moment decay
    pub beta2: f32,
    /// Denominator fuzz
    pub eps: f32,
}

impl Default for AdamParams {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

impl AdamParams {
    /// Create new Adam parameters with validation
    pub fn new(lr: f32) -> Result<Self> {
        let params = Self {
            lr,
            ..Default::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(SnnError::invalid_parameter(
                "lr",
                self.lr.to_string(),
                "finite and > 0.0",
            ));
        }
        for (name, value) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&value) {
                return Err(SnnError::invalid_parameter(
                    name,
                    value.to_string(),
                    "in [0.0, 1.0)",
                ));
            }
        }
        if self.eps <= 0.0 {
            return Err(SnnError::invalid_parameter(
                "eps",
                self.eps.to_string(),
                "> 0.0",
            ));
        }
        Ok(())
    }
}

/// First and second moment estimates for one parameter tensor set
#[derive(Debug, Clone)]
struct Moments {
    fc1_w: Array2<f32>,
    fc1_b: Array1<f32>,
    fc2_w: Array2<f32>,
    fc2_b: Array1<f32>,
}

impl Moments {
    fn zeros_like(net: &SpikeNet) -> Self {
        Self {
            fc1_w: Array2::zeros(net.fc1.weight.dim()),
            fc1_b: Array1::zeros(net.fc1.bias.len()),
            fc2_w: Array2::zeros(net.fc2.weight.dim()),
            fc2_b: Array1::zeros(net.fc2.bias.len()),
        }
    }
}

/// Adam optimizer with per-tensor moment state
#[derive(Debug, Clone)]
pub struct Adam {
    params: AdamParams,
    m: Moments,
    v: Moments,
    t: i32,
}

fn update_tensor<D: Dimension>(
    weights: &mut Array<f32, D>,
    grads: &Array<f32, D>,
    m: &mut Array<f32, D>,
    v: &mut Array<f32, D>,
    params: &AdamParams,
    bc1: f32,
    bc2: f32,
) {
    let (lr, b1, b2, eps) = (params.lr, params.beta1, params.beta2, params.eps);
    Zip::from(weights)
        .and(grads)
        .and(m)
        .and(v)
        .for_each(|w, &g, m, v| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            let m_hat = *m / bc1;
            let v_hat = *v / bc2;
            *w -= lr * m_hat / (v_hat.sqrt() + eps);
        });
}

impl Adam {
    /// Create an optimizer with zeroed moments shaped like `net`
    pub fn new(net: &SpikeNet, params: AdamParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            m: Moments::zeros_like(net),
            v: Moments::zeros_like(net),
            t: 0,
        })
    }

    /// Hyperparameters
    pub fn params(&self) -> &AdamParams {
        &self.params
    }

    /// Number of update steps taken so far
    pub fn steps_taken(&self) -> i32 {
        self.t
    }

    /// Clear gradient buffers for the next iteration
    pub fn zero_grads(&self, grads: &mut NetGrads) {
        grads.zero();
    }

    /// Apply one bias-corrected Adam update to every parameter tensor
    pub fn step(&mut self, net: &mut SpikeNet, grads: &NetGrads) -> Result<()> {
        if !grads.is_finite() {
            return Err(SnnError::non_finite("optimizer step gradients"));
        }

        self.t += 1;
        let bc1 = 1.0 - self.params.beta1.powi(self.t);
        let bc2 = 1.0 - self.params.beta2.powi(self.t);

        update_tensor(
            &mut net.fc1.weight,
            &grads.fc1.weight,
            &mut self.m.fc1_w,
            &mut self.v.fc1_w,
            &self.params,
            bc1,
            bc2,
        );
        update_tensor(
            &mut net.fc1.bias,
            &grads.fc1.bias,
            &mut self.m.fc1_b,
            &mut self.v.fc1_b,
            &self.params,
            bc1,
            bc2,
        );
        update_tensor(
            &mut net.fc2.weight,
            &grads.fc2.weight,
            &mut self.m.fc2_w,
            &mut self.v.fc2_w,
            &self.params,
            bc1,
            bc2,
        );
        update_tensor(
            &mut net.fc2.bias,
            &grads.fc2.bias,
            &mut self.m.fc2_b,
            &mut self.v.fc2_b,
            &self.params,
            bc1,
            bc2,
        );
        Ok(())
    }
}
