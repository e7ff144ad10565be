//! Surrogate gradients for the spike nonlinearity
//!
//! The spike step function has zero derivative almost everywhere, so the
//! backward pass substitutes a smooth surrogate evaluated at the distance
//! from threshold. Each shape carries one steepness knob.

use crate::error::*;
use core::f32::consts::PI;
use ndarray::Array2;

/// Smooth stand-in derivative for the hard threshold function
///
/// The forward pass always uses the hard step; these shapes only ever
/// appear in the backward pass, evaluated at `v - threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Surrogate {
    /// Fast sigmoid: `1 / (slope * |x| + 1)^2`
    FastSigmoid {
        /// Steepness parameter
        slope: f32,
    },
    /// Scaled sigmoid derivative: `slope * s(slope * x) * (1 - s(slope * x))`
    Sigmoid {
        /// Steepness parameter
        slope: f32,
    },
    /// Arctangent shape: `alpha / (2 * (1 + (pi/2 * alpha * x)^2))`
    Atan {
        /// Steepness parameter
        alpha: f32,
    },
}

impl Default for Surrogate {
    fn default() -> Self {
        Self::FastSigmoid { slope: 25.0 }
    }
}

impl Surrogate {
    /// Validate the steepness parameter
    pub fn validate(&self) -> Result<()> {
        let (name, value) = match self {
            Self::FastSigmoid { slope } | Self::Sigmoid { slope } => ("slope", *slope),
            Self::Atan { alpha } => ("alpha", *alpha),
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(SnnError::invalid_parameter(
                name,
                value.to_string(),
                "finite and > 0.0",
            ));
        }
        Ok(())
    }

    /// Evaluate the surrogate derivative at a single distance from threshold
    pub fn grad(&self, v_shift: f32) -> f32 {
        match *self {
            Self::FastSigmoid { slope } => {
                let denom = slope * v_shift.abs() + 1.0;
                1.0 / (denom * denom)
            }
            Self::Sigmoid { slope } => {
                let sig = 1.0 / (1.0 + (-slope * v_shift).exp());
                slope * sig * (1.0 - sig)
            }
            Self::Atan { alpha } => {
                let scaled = PI / 2.0 * alpha * v_shift;
                alpha / (2.0 * (1.0 + scaled * scaled))
            }
        }
    }

    /// Evaluate the surrogate derivative elementwise over a batch
    pub fn grad_batch(&self, v_shift: &Array2<f32>) -> Array2<f32> {
        v_shift.mapv(|x| self.grad(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_validation() {
        assert!(Surrogate::default().validate().is_ok());
        assert!(Surrogate::FastSigmoid { slope: -1.0 }.validate().is_err());
        assert!(Surrogate::Sigmoid { slope: 0.0 }.validate().is_err());
        assert!(Surrogate::Atan { alpha: f32::NAN }.validate().is_err());
    }

    #[test]
    fn test_peak_at_threshold() {
        // All shapes peak where the potential sits exactly at threshold
        for sg in [
            Surrogate::FastSigmoid { slope: 25.0 },
            Surrogate::Sigmoid { slope: 25.0 },
            Surrogate::Atan { alpha: 2.0 },
        ] {
            let peak = sg.grad(0.0);
            assert!(peak > 0.0);
            assert!(sg.grad(0.5) < peak);
            assert!(sg.grad(-0.5) < peak);
        }
    }

    #[test]
    fn test_symmetry() {
        let sg = Surrogate::default();
        assert_eq!(sg.grad(0.3), sg.grad(-0.3));
    }

    #[test]
    fn test_steepness_narrows_the_bump() {
        let shallow = Surrogate::FastSigmoid { slope: 5.0 };
        let steep = Surrogate::FastSigmoid { slope: 50.0 };
        assert!(steep.grad(0.2) < shallow.grad(0.2));
    }

    #[test]
    fn test_grad_batch_matches_scalar() {
        let sg = Surrogate::Sigmoid { slope: 10.0 };
        let shift = array![[-0.2, 0.0], [0.4, 1.0]];
        let grads = sg.grad_batch(&shift);
        assert_eq!(grads[[0, 1]], sg.grad(0.0));
        assert_eq!(grads[[1, 0]], sg.grad(0.4));
    }
}
