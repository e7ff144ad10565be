//! Learned affine transformations between neuron populations

use crate::error::*;
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;

/// Dense affine map, `weight` is `(out_features, in_features)`
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    /// Weight matrix
    pub weight: Array2<f32>,
    /// Bias vector
    pub bias: Array1<f32>,
}

impl Dense {
    /// Create a new layer with uniform `±1/sqrt(in_features)` initialization
    pub fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Result<Self> {
        if in_features == 0 {
            return Err(SnnError::invalid_parameter("in_features", "0", "> 0"));
        }
        if out_features == 0 {
            return Err(SnnError::invalid_parameter("out_features", "0", "> 0"));
        }

        let bound = 1.0 / (in_features as f32).sqrt();
        let weight = Array2::random_using(
            (out_features, in_features),
            Uniform::new(-bound, bound),
            rng,
        );
        let bias = Array1::random_using(out_features, Uniform::new(-bound, bound), rng);

        Ok(Self { weight, bias })
    }

    /// Input width
    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    /// Output width
    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    /// Apply the affine map to a batch, `(batch, in) -> (batch, out)`
    pub fn forward(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.in_features() {
            return Err(SnnError::shape_mismatch(
                "dense forward",
                format!("(_, {})", self.in_features()),
                format!("{:?}", x.dim()),
            ));
        }
        Ok(x.dot(&self.weight.t()) + &self.bias)
    }
}

/// Gradient buffers for one [`Dense`] layer
///
/// Kept outside the layer so weights stay read-only during the unroll and
/// mutate only in the optimizer step.
#[derive(Debug, Clone)]
pub struct DenseGrads {
    /// Gradient of the weight matrix
    pub weight: Array2<f32>,
    /// Gradient of the bias vector
    pub bias: Array1<f32>,
}

impl DenseGrads {
    /// Zeroed buffers shaped like `layer`
    pub fn zeros_like(layer: &Dense) -> Self {
        Self {
            weight: Array2::zeros(layer.weight.dim()),
            bias: Array1::zeros(layer.bias.len()),
        }
    }

    /// Clear accumulated gradients
    pub fn zero(&mut self) {
        self.weight.fill(0.0);
        self.bias.fill(0.0);
    }

    /// Accumulate the contribution of one time step
    ///
    /// `delta` is `dL/d(pre-activation)`, shape `(batch, out)`; `input` is
    /// the layer input at that step, shape `(batch, in)`.
    pub fn accumulate(&mut self, delta: &Array2<f32>, input: &Array2<f32>) {
        self.weight += &delta.t().dot(input);
        self.bias += &delta.sum_axis(Axis(0));
    }

    /// Whether every entry is finite
    pub fn is_finite(&self) -> bool {
        self.weight.iter().all(|v| v.is_finite()) && self.bias.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_layer_creation() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = Dense::new(4, 3, &mut rng).unwrap();
        assert_eq!(layer.in_features(), 4);
        assert_eq!(layer.out_features(), 3);

        let bound = 1.0 / 2.0;
        assert!(layer.weight.iter().all(|w| w.abs() <= bound));
    }

    #[test]
    fn test_zero_width_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(Dense::new(0, 3, &mut rng).is_err());
        assert!(Dense::new(4, 0, &mut rng).is_err());
    }

    #[test]
    fn test_forward_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = Dense::new(4, 3, &mut rng).unwrap();

        let x = Array2::<f32>::zeros((5, 4));
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.dim(), (5, 3));

        let bad = Array2::<f32>::zeros((5, 6));
        assert!(layer.forward(&bad).is_err());
    }

    #[test]
    fn test_forward_is_affine() {
        let layer = Dense {
            weight: array![[1.0, 2.0], [0.0, -1.0]],
            bias: array![0.5, 0.0],
        };
        let x = array![[3.0, 1.0]];
        let y = layer.forward(&x).unwrap();
        assert_eq!(y, array![[5.5, -1.0]]);
    }

    #[test]
    fn test_grads_accumulate() {
        let layer = Dense {
            weight: Array2::zeros((2, 3)),
            bias: Array1::zeros(2),
        };
        let mut grads = DenseGrads::zeros_like(&layer);

        let delta = array![[1.0, 0.0], [0.0, 2.0]];
        let input = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        grads.accumulate(&delta, &input);
        grads.accumulate(&delta, &input);

        // Two identical accumulations double the single-step contribution
        assert_eq!(grads.weight[[0, 0]], 2.0);
        assert_eq!(grads.weight[[1, 2]], 24.0);
        assert_eq!(grads.bias, array![2.0, 4.0]);

        grads.zero();
        assert!(grads.weight.iter().all(|&g| g == 0.0));
    }
}
