//! Categorical embedding table
//!
//! Row `k` of the table is the learned vector for category code `k`.

use ndarray::{Array2, ArrayView1};
use rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// Lookup table (n_categories x dim)
    pub weights: Array2<f64>,
    #[serde(skip)]
    last_codes: Option<Vec<usize>>,
    #[serde(skip)]
    pub grad_weights: Option<Array2<f64>>,
}

impl Embedding {
    /// Table initialised from N(0, 1)
    pub fn new<R: Rng + ?Sized>(n_categories: usize, dim: usize, rng: &mut R) -> Self {
        Self {
            weights: Array2::random_using((n_categories, dim), StandardNormal, rng),
            last_codes: None,
            grad_weights: None,
        }
    }

    pub fn n_categories(&self) -> usize {
        self.weights.nrows()
    }

    pub fn dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Look up one vector per code
    pub fn forward(&mut self, codes: ArrayView1<usize>) -> Result<Array2<f64>> {
        let n = self.n_categories();
        if let Some(&bad) = codes.iter().find(|&&c| c >= n) {
            return Err(Error::InvalidInput(format!(
                "category code {} out of range for embedding with {} rows",
                bad, n
            )));
        }

        let mut out = Array2::zeros((codes.len(), self.dim()));
        for (i, &code) in codes.iter().enumerate() {
            out.row_mut(i).assign(&self.weights.row(code));
        }
        self.last_codes = Some(codes.to_vec());
        Ok(out)
    }

    /// Scatter-add the output gradient into the rows used by the last forward pass
    pub fn backward(&mut self, output_gradient: &Array2<f64>) -> Result<()> {
        let codes = self
            .last_codes
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("embedding backward before forward".into()))?;
        if output_gradient.dim() != (codes.len(), self.dim()) {
            return Err(Error::shape(
                format!("{:?}", (codes.len(), self.dim())),
                format!("{:?}", output_gradient.dim()),
            ));
        }

        let mut grad = Array2::zeros(self.weights.dim());
        for (i, &code) in codes.iter().enumerate() {
            let mut row = grad.row_mut(code);
            row += &output_gradient.row(i);
        }
        self.grad_weights = Some(grad);
        Ok(())
    }

    pub fn num_parameters(&self) -> usize {
        self.weights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lookup() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut emb = Embedding::new(4, 3, &mut rng);
        let codes = array![2, 0, 2];
        let out = emb.forward(codes.view()).unwrap();

        assert_eq!(out.dim(), (3, 3));
        assert_eq!(out.row(0), emb.weights.row(2));
        assert_eq!(out.row(1), emb.weights.row(0));
        assert_eq!(out.row(2), emb.weights.row(2));
    }

    #[test]
    fn test_out_of_range_code() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut emb = Embedding::new(2, 2, &mut rng);
        assert!(emb.forward(array![0, 2].view()).is_err());
    }

    #[test]
    fn test_gradient_accumulates_repeated_codes() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut emb = Embedding::new(3, 2, &mut rng);
        emb.forward(array![1, 1, 0].view()).unwrap();
        emb.backward(&array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();

        let grad = emb.grad_weights.as_ref().unwrap();
        assert_eq!(grad.row(0).to_vec(), vec![5.0, 6.0]);
        assert_eq!(grad.row(1).to_vec(), vec![4.0, 6.0]);
        assert_eq!(grad.row(2).to_vec(), vec![0.0, 0.0]);
    }
}
