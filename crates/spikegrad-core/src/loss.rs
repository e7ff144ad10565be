//! Time-distributed classification loss
//!
//! Cross-entropy between the raw output-layer membrane potential and the
//! target class, evaluated at every time step and summed. Keeping the loss
//! on at every step pushes the correct class's potential up across the
//! whole window, which is what makes that class accumulate spikes.

use crate::error::*;
use ndarray::{Array2, Axis};

/// Aggregated loss for one unroll
#[derive(Debug, Clone)]
pub struct TemporalLoss {
    /// Sum over all time steps of the per-step batch-mean cross-entropy
    pub value: f32,
    /// Per-step gradients with respect to the potentials,
    /// `(softmax - onehot) / batch`, one tensor per step
    pub logit_grads: Vec<Array2<f32>>,
}

/// Row-wise softmax with max subtraction
fn softmax_rows(logits: &Array2<f32>) -> Array2<f32> {
    let mut out = logits.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum: f32 = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

/// Check every label against the configured class count
pub fn validate_labels(targets: &[usize], num_classes: usize) -> Result<()> {
    for &label in targets {
        if label >= num_classes {
            return Err(SnnError::invalid_label(label, num_classes));
        }
    }
    Ok(())
}

/// Sum the per-step cross-entropy of a potential trajectory
///
/// `potentials` is the output-layer membrane record, one `(batch,
/// num_classes)` tensor per step. Labels are validated before any math;
/// per-step losses are batch means, matching the summed trajectory loss of
/// the reference training setup.
pub fn temporal_cross_entropy(
    potentials: &[Array2<f32>],
    targets: &[usize],
) -> Result<TemporalLoss> {
    let first = potentials
        .first()
        .ok_or_else(|| SnnError::invalid_config("empty potential trajectory"))?;
    let (batch, num_classes) = first.dim();

    if targets.len() != batch {
        return Err(SnnError::shape_mismatch(
            "loss targets",
            format!("{} labels", batch),
            format!("{} labels", targets.len()),
        ));
    }
    validate_labels(targets, num_classes)?;

    let mut total = 0.0f64;
    let mut logit_grads = Vec::with_capacity(potentials.len());

    for logits in potentials {
        if logits.dim() != (batch, num_classes) {
            return Err(SnnError::shape_mismatch(
                "potential trajectory",
                format!("({}, {})", batch, num_classes),
                format!("{:?}", logits.dim()),
            ));
        }

        let probs = softmax_rows(logits);

        // Batch-mean negative log-likelihood for this step
        let mut step_loss = 0.0f64;
        for (row, &label) in probs.axis_iter(Axis(0)).zip(targets) {
            step_loss -= (row[label].max(f32::MIN_POSITIVE) as f64).ln();
        }
        total += step_loss / batch as f64;

        // d(step loss)/d(logits) = (softmax - onehot) / batch
        let mut grad = probs;
        for (i, &label) in targets.iter().enumerate() {
            grad[[i, label]] -= 1.0;
        }
        grad.mapv_inplace(|g| g / batch as f32);
        logit_grads.push(grad);
    }

    let value = total as f32;
    if !value.is_finite() {
        return Err(SnnError::non_finite("loss aggregation"));
    }

    Ok(TemporalLoss { value, logit_grads })
}
