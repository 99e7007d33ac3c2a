//! Inverted dropout

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Zeroes activations with probability `rate` during training and rescales
/// the survivors so the expected value is unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    pub rate: f64,
    #[serde(skip)]
    mask: Option<Array2<f64>>,
}

impl Dropout {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            mask: None,
        }
    }

    pub fn forward<R: Rng + ?Sized>(
        &mut self,
        input: &Array2<f64>,
        training: bool,
        rng: &mut R,
    ) -> Array2<f64> {
        if !training || self.rate <= 0.0 {
            self.mask = None;
            return input.clone();
        }

        let keep = 1.0 - self.rate;
        let mask = Array2::from_shape_fn(input.dim(), |_| {
            if rng.gen::<f64>() < keep {
                1.0 / keep
            } else {
                0.0
            }
        });
        let output = input * &mask;
        self.mask = Some(mask);
        output
    }

    /// Route the gradient through the mask of the last forward pass
    pub fn backward(&self, output_gradient: &Array2<f64>) -> Array2<f64> {
        match &self.mask {
            Some(mask) => output_gradient * mask,
            None => output_gradient.clone(),
        }
    }
}
