//! In-memory datasets and shuffled mini-batch iteration
//!
//! The core only ever sees flattened `(N, features)` images with integer
//! labels; where those come from (IDX files, synthetic generators) is the
//! caller's concern.

use crate::error::*;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Flattened images with integer class labels
#[derive(Debug, Clone)]
pub struct Dataset {
    images: Array2<f32>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Create a dataset, checking that rows and labels line up
    pub fn new(images: Array2<f32>, labels: Vec<usize>) -> Result<Self> {
        if images.nrows() != labels.len() {
            return Err(SnnError::shape_mismatch(
                "dataset labels",
                format!("{} labels", images.nrows()),
                format!("{} labels", labels.len()),
            ));
        }
        Ok(Self { images, labels })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.images.nrows()
    }

    /// Whether the dataset holds no samples
    pub fn is_empty(&self) -> bool {
        self.images.nrows() == 0
    }

    /// Flattened feature width per sample
    pub fn num_features(&self) -> usize {
        self.images.ncols()
    }

    /// All labels
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Materialize one batch from sample indices
    pub fn batch(&self, indices: &[usize]) -> (Array2<f32>, Vec<usize>) {
        let x = self.images.select(Axis(0), indices);
        let y = indices.iter().map(|&i| self.labels[i]).collect();
        (x, y)
    }

    /// Sequential index chunks covering the dataset
    pub fn ordered_chunks(&self, batch_size: usize, drop_last: bool) -> Vec<Vec<usize>> {
        let indices: Vec<usize> = (0..self.len()).collect();
        chunk_indices(indices, batch_size, drop_last)
    }

    /// Synthetic two-or-more-class blobs for smoke runs and tests
    ///
    /// Class `c` lights up its own slice of the feature vector at
    /// `amplitude`, everything else is low-level noise, so the classes are
    /// linearly separable.
    pub fn synthetic_blobs(
        samples_per_class: usize,
        num_features: usize,
        num_classes: usize,
        amplitude: f32,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if samples_per_class == 0 || num_classes == 0 {
            return Err(SnnError::invalid_parameter(
                "samples_per_class/num_classes",
                "0",
                "> 0",
            ));
        }
        if num_features < num_classes {
            return Err(SnnError::invalid_parameter(
                "num_features",
                num_features.to_string(),
                ">= num_classes",
            ));
        }

        let total = samples_per_class * num_classes;
        let slice = num_features / num_classes;
        let mut images = Array2::<f32>::zeros((total, num_features));
        let mut labels = Vec::with_capacity(total);

        for sample in 0..total {
            let class = sample % num_classes;
            for feature in 0..num_features {
                let in_slice = feature / slice == class;
                let base = if in_slice { amplitude } else { 0.0 };
                images[[sample, feature]] = base + rng.gen_range(0.0..0.05);
            }
            labels.push(class);
        }

        Self::new(images, labels)
    }
}

fn chunk_indices(indices: Vec<usize>, batch_size: usize, drop_last: bool) -> Vec<Vec<usize>> {
    let mut chunks: Vec<Vec<usize>> = indices
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect();
    if drop_last {
        if let Some(last) = chunks.last() {
            if last.len() < batch_size {
                chunks.pop();
            }
        }
    }
    chunks
}

/// Shuffled mini-batch index source
#[derive(Debug, Clone)]
pub struct BatchLoader {
    /// Samples per batch
    pub batch_size: usize,
    /// Discard a trailing batch smaller than `batch_size`
    pub drop_last: bool,
}

impl BatchLoader {
    /// Create a loader with validation; trailing partial batches dropped
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(SnnError::invalid_parameter("batch_size", "0", "> 0"));
        }
        Ok(Self {
            batch_size,
            drop_last: true,
        })
    }

    /// Keep or drop trailing partial batches
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// One epoch of shuffled index chunks
    pub fn epoch_chunks(&self, data: &Dataset, rng: &mut StdRng) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..data.len()).collect();
        indices.shuffle(rng);
        chunk_indices(indices, self.batch_size, self.drop_last)
    }

    /// Draw one random batch without replacement
    pub fn sample(&self, data: &Dataset, rng: &mut StdRng) -> Result<(Array2<f32>, Vec<usize>)> {
        if data.is_empty() {
            return Err(SnnError::invalid_config("sampling from an empty dataset"));
        }
        let amount = self.batch_size.min(data.len());
        let indices = rand::seq::index::sample(rng, data.len(), amount).into_vec();
        Ok(data.batch(&indices))
    }
}
