//! Spike-count readout and accuracy accounting
//!
//! The predicted class of a sample is the output neuron that spiked most
//! over the simulation window. Ties resolve to the lowest class index, so
//! an all-silent trajectory predicts class 0 deterministically.

use crate::{
    data::Dataset,
    error::*,
    loss::validate_labels,
    network::SpikeNet,
    simulation::TemporalSimulator,
};
use ndarray::{Array2, Axis};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Correct/total tally over one or more batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Accuracy {
    /// Correctly classified samples
    pub correct: usize,
    /// Samples seen
    pub total: usize,
}

impl Accuracy {
    /// Fraction correct, zero on an empty tally
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }

    /// Percentage correct
    pub fn percent(&self) -> f32 {
        100.0 * self.ratio()
    }

    /// Combine two tallies
    pub fn merge(self, other: Self) -> Self {
        Self {
            correct: self.correct + other.correct,
            total: self.total + other.total,
        }
    }
}

/// Sum spikes over the time axis, `(batch, num_classes)`
pub fn spike_counts(spikes: &[Array2<f32>]) -> Result<Array2<f32>> {
    let first = spikes
        .first()
        .ok_or_else(|| SnnError::invalid_config("empty spike trajectory"))?;
    let mut counts = first.clone();
    for step in &spikes[1..] {
        if step.dim() != counts.dim() {
            return Err(SnnError::shape_mismatch(
                "spike trajectory",
                format!("{:?}", counts.dim()),
                format!("{:?}", step.dim()),
            ));
        }
        counts += step;
    }
    Ok(counts)
}

/// Arg-max class per sample from a spike trajectory
pub fn predict(spikes: &[Array2<f32>]) -> Result<Vec<usize>> {
    let counts = spike_counts(spikes)?;
    let predictions = counts
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best, max), (i, &c)| {
                    if c > max {
                        (i, c)
                    } else {
                        (best, max)
                    }
                })
                .0
        })
        .collect();
    Ok(predictions)
}

/// Score one batch: spike-count arg-max against integer labels
pub fn score(spikes: &[Array2<f32>], targets: &[usize]) -> Result<Accuracy> {
    let counts = spike_counts(spikes)?;
    let (batch, num_classes) = counts.dim();
    if targets.len() != batch {
        return Err(SnnError::shape_mismatch(
            "evaluator targets",
            format!("{} labels", batch),
            format!("{} labels", targets.len()),
        ));
    }
    validate_labels(targets, num_classes)?;

    let predictions = predict(spikes)?;
    let correct = predictions
        .iter()
        .zip(targets)
        .filter(|(p, t)| p == t)
        .count();

    Ok(Accuracy {
        correct,
        total: batch,
    })
}

/// Score a whole dataset, never dropping the final partial batch
///
/// Weights are read-only here, so batches are independent and evaluated in
/// parallel when the `parallel` feature is enabled.
pub fn score_dataset(
    net: &SpikeNet,
    simulator: &TemporalSimulator,
    data: &Dataset,
    batch_size: usize,
) -> Result<Accuracy> {
    if batch_size == 0 {
        return Err(SnnError::invalid_parameter("batch_size", "0", "> 0"));
    }
    if data.is_empty() {
        return Err(SnnError::invalid_config("empty evaluation dataset"));
    }
    let chunks = data.ordered_chunks(batch_size, false);

    let score_chunk = |chunk: &Vec<usize>| -> Result<Accuracy> {
        let (x, y) = data.batch(chunk);
        let unroll = simulator.run(net, &x)?;
        score(&unroll.output.spikes, &y)
    };

    #[cfg(feature = "parallel")]
    let tallies: Result<Vec<Accuracy>> = chunks.par_iter().map(score_chunk).collect();

    #[cfg(not(feature = "parallel"))]
    let tallies: Result<Vec<Accuracy>> = chunks.iter().map(score_chunk).collect();

    Ok(tallies?
        .into_iter()
        .fold(Accuracy::default(), Accuracy::merge))
}
