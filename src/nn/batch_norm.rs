//! Batch normalization over the feature axis of a 2D batch

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MOMENTUM: f64 = 0.1;
const EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm1d {
    /// Scale
    pub gamma: Array1<f64>,
    /// Shift
    pub beta: Array1<f64>,
    pub running_mean: Array1<f64>,
    pub running_var: Array1<f64>,

    #[serde(skip)]
    x_hat: Option<Array2<f64>>,
    #[serde(skip)]
    inv_std: Option<Array1<f64>>,
    #[serde(skip)]
    pub grad_gamma: Option<Array1<f64>>,
    #[serde(skip)]
    pub grad_beta: Option<Array1<f64>>,
}

impl BatchNorm1d {
    pub fn new(num_features: usize) -> Self {
        Self {
            gamma: Array1::ones(num_features),
            beta: Array1::zeros(num_features),
            running_mean: Array1::zeros(num_features),
            running_var: Array1::ones(num_features),
            x_hat: None,
            inv_std: None,
            grad_gamma: None,
            grad_beta: None,
        }
    }

    pub fn num_features(&self) -> usize {
        self.gamma.len()
    }

    /// Normalise with batch statistics in training, running statistics otherwise
    pub fn forward(&mut self, input: &Array2<f64>, training: bool) -> Result<Array2<f64>> {
        if input.ncols() != self.num_features() {
            return Err(Error::shape(
                format!("{} features", self.num_features()),
                format!("{} features", input.ncols()),
            ));
        }
        if self.num_features() == 0 {
            return Ok(input.clone());
        }

        let (mean, var) = if training {
            let n = input.nrows();
            if n < 2 {
                return Err(Error::InvalidInput(format!(
                    "batch norm needs more than one row per batch in training, got {}",
                    n
                )));
            }
            let mean = input.sum_axis(Axis(0)) / n as f64;
            let centered = input - &mean;
            let var = (&centered * &centered).sum_axis(Axis(0)) / n as f64;

            let unbiased = &var * (n as f64 / (n as f64 - 1.0));
            self.running_mean = &self.running_mean * (1.0 - MOMENTUM) + &mean * MOMENTUM;
            self.running_var = &self.running_var * (1.0 - MOMENTUM) + &unbiased * MOMENTUM;
            (mean, var)
        } else {
            (self.running_mean.clone(), self.running_var.clone())
        };

        let inv_std = var.mapv(|v| 1.0 / (v + EPSILON).sqrt());
        let x_hat = (input - &mean) * &inv_std;
        let output = &x_hat * &self.gamma + &self.beta;

        self.x_hat = Some(x_hat);
        self.inv_std = Some(inv_std);
        Ok(output)
    }

    /// Gradient through a training-mode forward pass
    pub fn backward(&mut self, output_gradient: &Array2<f64>) -> Result<Array2<f64>> {
        if self.num_features() == 0 {
            return Ok(output_gradient.clone());
        }
        let (x_hat, inv_std) = match (&self.x_hat, &self.inv_std) {
            (Some(x), Some(s)) => (x, s),
            _ => {
                return Err(Error::InvalidInput(
                    "batch norm backward before forward".into(),
                ))
            }
        };
        if output_gradient.dim() != x_hat.dim() {
            return Err(Error::shape(
                format!("{:?}", x_hat.dim()),
                format!("{:?}", output_gradient.dim()),
            ));
        }

        let n = output_gradient.nrows() as f64;
        self.grad_gamma = Some((output_gradient * x_hat).sum_axis(Axis(0)));
        self.grad_beta = Some(output_gradient.sum_axis(Axis(0)));

        let dx_hat = output_gradient * &self.gamma;
        let sum_dx_hat = dx_hat.sum_axis(Axis(0));
        let sum_dx_hat_x = (&dx_hat * x_hat).sum_axis(Axis(0));

        let input_gradient =
            ((&dx_hat * n - &sum_dx_hat) - &(x_hat * &sum_dx_hat_x)) * &(inv_std / n);
        Ok(input_gradient)
    }

    pub fn num_parameters(&self) -> usize {
        self.gamma.len() + self.beta.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_training_output_is_standardised() {
        let mut bn = BatchNorm1d::new(2);
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let y = bn.forward(&x, true).unwrap();

        for col in y.axis_iter(Axis(1)) {
            assert_relative_eq!(col.sum() / 4.0, 0.0, epsilon = 1e-10);
            let var = col.mapv(|v| v * v).sum() / 4.0;
            assert_relative_eq!(var, 1.0, epsilon = 1e-4);
        }

        // mean 2.5, unbiased var 5/3 for the first column
        assert_relative_eq!(bn.running_mean[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(bn.running_var[0], 0.9 + 0.1 * 5.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eval_uses_running_stats() {
        let mut bn = BatchNorm1d::new(1);
        let x = array![[4.0]];
        let y = bn.forward(&x, false).unwrap();
        assert_relative_eq!(y[[0, 0]], 4.0 / (1.0 + EPSILON).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_single_row_training_batch_rejected() {
        let mut bn = BatchNorm1d::new(3);
        assert!(bn.forward(&Array2::ones((1, 3)), true).is_err());
    }

    #[test]
    fn test_zero_features_passthrough() {
        let mut bn = BatchNorm1d::new(0);
        let x = Array2::<f64>::zeros((5, 0));
        assert_eq!(bn.forward(&x, true).unwrap().dim(), (5, 0));
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let x = array![[0.5, -1.0], [1.5, 2.0], [-0.3, 0.7]];
        let weights = array![[1.0, -2.0], [0.5, 3.0], [2.0, 1.0]];

        // loss = sum(weights * bn(x))
        let loss = |input: &Array2<f64>| {
            let mut bn = BatchNorm1d::new(2);
            bn.gamma = array![1.5, 0.5];
            (&bn.forward(input, true).unwrap() * &weights).sum()
        };

        let mut bn = BatchNorm1d::new(2);
        bn.gamma = array![1.5, 0.5];
        bn.forward(&x, true).unwrap();
        let grad = bn.backward(&weights).unwrap();

        let h = 1e-6;
        for i in 0..3 {
            for j in 0..2 {
                let mut plus = x.clone();
                plus[[i, j]] += h;
                let mut minus = x.clone();
                minus[[i, j]] -= h;
                let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
                assert_relative_eq!(grad[[i, j]], numeric, epsilon = 1e-5);
            }
        }
    }
}
