//! Error types for spiking-network simulation and training

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, SnnError>;

/// Errors that can occur during simulation or training
#[derive(Error, Debug)]
pub enum SnnError {
    /// Invalid network or trainer configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Tensor shape inconsistent with the configured architecture
    #[error("Shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Where the mismatch was detected
        context: String,
        /// Expected shape description
        expected: String,
        /// Actual shape description
        got: String,
    },

    /// Class label outside the valid range
    #[error("Invalid label {label} (num_classes: {num_classes})")]
    InvalidLabel {
        /// Offending label value
        label: usize,
        /// Number of configured classes
        num_classes: usize,
    },

    /// Membrane potential or gradient became NaN/Inf
    #[error("Non-finite state in {context}")]
    NonFiniteState {
        /// Where the non-finite value was detected
        context: String,
    },
}

impl SnnError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an invalid label error
    pub fn invalid_label(label: usize, num_classes: usize) -> Self {
        Self::InvalidLabel { label, num_classes }
    }

    /// Create a non-finite state error
    pub fn non_finite(context: impl Into<String>) -> Self {
        Self::NonFiniteState {
            context: context.into(),
        }
    }
}
