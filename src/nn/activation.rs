//! Activation Functions for Neural Networks
//!
//! Element-wise activations with their derivatives, plus a row-wise softmax
//! for turning logits into class probabilities.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Types of activation functions available
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivationType {
    /// Rectified Linear Unit: max(0, x)
    ReLU,
    /// Linear (identity): x
    Linear,
}

/// Activation function trait with forward and backward passes
pub trait Activation: Send + Sync {
    /// Apply to a batch
    fn forward_batch(&self, x: &Array2<f64>) -> Array2<f64>;

    /// Derivative with respect to the pre-activation input
    fn backward_batch(&self, x: &Array2<f64>) -> Array2<f64>;
}

/// ReLU activation function
pub struct ReLU;

impl Activation for ReLU {
    fn forward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        x.mapv(|v| v.max(0.0))
    }

    fn backward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        x.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
    }
}

/// Linear (identity) activation function
pub struct Linear;

impl Activation for Linear {
    fn forward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        x.clone()
    }

    fn backward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        Array2::ones(x.dim())
    }
}

/// Create an activation function from type
pub fn create_activation(activation_type: ActivationType) -> Box<dyn Activation> {
    match activation_type {
        ActivationType::ReLU => Box::new(ReLU),
        ActivationType::Linear => Box::new(Linear),
    }
}

/// Row-wise softmax. The row maximum is subtracted first for stability.
pub fn softmax(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

/// Index of the largest entry of each row
pub fn argmax_rows(values: &Array2<f64>) -> Vec<usize> {
    values
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 {
                        (i, v)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}
