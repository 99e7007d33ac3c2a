//! Dense (Fully Connected) Layer Implementation
//!
//! A dense layer performs: output = dropout(activation(input * weights + bias))

use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::activation::{create_activation, ActivationType};
use super::dropout::Dropout;
use crate::error::{Error, Result};

/// Dense layer with weights, biases, activation and dropout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weight matrix (input_size x output_size)
    pub weights: Array2<f64>,
    /// Bias vector (output_size)
    pub biases: Array1<f64>,
    /// Activation function type
    pub activation_type: ActivationType,
    pub dropout: Dropout,

    // Cached values for backpropagation (not serialized)
    #[serde(skip)]
    last_input: Option<Array2<f64>>,
    #[serde(skip)]
    last_z: Option<Array2<f64>>,
    #[serde(skip)]
    pub grad_weights: Option<Array2<f64>>,
    #[serde(skip)]
    pub grad_biases: Option<Array1<f64>>,
}

impl DenseLayer {
    /// Weights and biases drawn from U(-1/sqrt(in), 1/sqrt(in))
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: ActivationType,
        rng: &mut R,
    ) -> Self {
        let bound = if input_size > 0 {
            1.0 / (input_size as f64).sqrt()
        } else {
            1.0
        };
        let dist = Uniform::new(-bound, bound);

        Self {
            weights: Array2::random_using((input_size, output_size), dist, rng),
            biases: Array1::random_using(output_size, dist, rng),
            activation_type: activation,
            dropout: Dropout::new(0.0),
            last_input: None,
            last_z: None,
            grad_weights: None,
            grad_biases: None,
        }
    }

    /// Create layer with specific dropout rate
    pub fn with_dropout(mut self, rate: f64) -> Self {
        self.dropout = Dropout::new(rate);
        self
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Forward pass through the layer
    pub fn forward<R: Rng + ?Sized>(
        &mut self,
        input: &Array2<f64>,
        training: bool,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        if input.ncols() != self.input_size() {
            return Err(Error::shape(
                format!("{} inputs", self.input_size()),
                format!("{} inputs", input.ncols()),
            ));
        }
        self.last_input = Some(input.clone());

        // Linear transformation: z = input @ weights + bias
        let z = input.dot(&self.weights) + &self.biases;

        let activation = create_activation(self.activation_type);
        let output = activation.forward_batch(&z);
        self.last_z = Some(z);

        Ok(self.dropout.forward(&output, training, rng))
    }

    /// Backward pass. Stores parameter gradients and returns the input gradient.
    pub fn backward(&mut self, output_gradient: &Array2<f64>) -> Result<Array2<f64>> {
        let (z, input) = match (&self.last_z, &self.last_input) {
            (Some(z), Some(input)) => (z, input),
            _ => {
                return Err(Error::InvalidInput(
                    "dense backward before forward".into(),
                ))
            }
        };

        let grad = self.dropout.backward(output_gradient);

        let activation = create_activation(self.activation_type);
        let delta = &grad * &activation.backward_batch(z);

        self.grad_weights = Some(input.t().dot(&delta));
        self.grad_biases = Some(delta.sum_axis(Axis(0)));

        Ok(delta.dot(&self.weights.t()))
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_layer_creation() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(10, 5, ActivationType::ReLU, &mut rng);
        assert_eq!(layer.weights.dim(), (10, 5));
        assert_eq!(layer.biases.len(), 5);
        let bound = 1.0 / 10f64.sqrt();
        assert!(layer.weights.iter().all(|w| w.abs() <= bound));
    }

    #[test]
    fn test_forward_pass() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = DenseLayer::new(4, 3, ActivationType::ReLU, &mut rng);
        let input = Array2::ones((2, 4)); // batch of 2, input size 4
        let output = layer.forward(&input, false, &mut rng).unwrap();
        assert_eq!(output.dim(), (2, 3));
        assert!(output.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_wrong_input_width() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = DenseLayer::new(4, 3, ActivationType::Linear, &mut rng);
        assert!(layer.forward(&Array2::ones((2, 5)), false, &mut rng).is_err());
    }

    #[test]
    fn test_linear_gradients() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = DenseLayer::new(2, 1, ActivationType::Linear, &mut rng);
        layer.weights = array![[2.0], [-1.0]];
        layer.biases = array![0.5];

        let x = array![[1.0, 3.0], [2.0, 0.0]];
        layer.forward(&x, true, &mut rng).unwrap();
        let input_grad = layer.backward(&array![[1.0], [1.0]]).unwrap();

        let gw = layer.grad_weights.as_ref().unwrap();
        assert_relative_eq!(gw[[0, 0]], 3.0);
        assert_relative_eq!(gw[[1, 0]], 3.0);
        assert_relative_eq!(layer.grad_biases.as_ref().unwrap()[0], 2.0);
        assert_eq!(input_grad, array![[2.0, -1.0], [2.0, -1.0]]);
    }

    #[test]
    fn test_num_parameters() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(10, 5, ActivationType::ReLU, &mut rng);
        assert_eq!(layer.num_parameters(), 10 * 5 + 5);
    }
}
