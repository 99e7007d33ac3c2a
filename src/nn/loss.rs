//! Cross-entropy loss on raw logits

use ndarray::Array2;

use super::activation::softmax;
use crate::error::{Error, Result};

/// Mean cross-entropy of `logits` against class indices.
///
/// Returns the loss and its gradient with respect to the logits,
/// `(softmax(logits) - one_hot(labels)) / batch`.
pub fn cross_entropy(logits: &Array2<f64>, labels: &[usize]) -> Result<(f64, Array2<f64>)> {
    let (n, k) = logits.dim();
    if labels.len() != n {
        return Err(Error::shape(format!("{} labels", n), format!("{} labels", labels.len())));
    }
    if n == 0 {
        return Err(Error::InvalidInput("cross entropy of an empty batch".into()));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= k) {
        return Err(Error::InvalidInput(format!(
            "label {} out of range for {} classes",
            bad, k
        )));
    }

    let probs = softmax(logits);
    let mut loss = 0.0;
    for (i, &label) in labels.iter().enumerate() {
        let row = logits.row(i);
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let log_sum_exp = max + row.mapv(|v| (v - max).exp()).sum().ln();
        loss += log_sum_exp - logits[[i, label]];
    }

    let mut grad = probs;
    for (i, &label) in labels.iter().enumerate() {
        grad[[i, label]] -= 1.0;
    }
    grad /= n as f64;

    Ok((loss / n as f64, grad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_uniform_logits() {
        let logits = Array2::zeros((2, 5));
        let (loss, _) = cross_entropy(&logits, &[0, 4]).unwrap();
        assert_relative_eq!(loss, 5f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let logits = array![[0.3, -1.2, 2.0], [1.0, 0.0, -0.5]];
        let labels = [2, 1];
        let (_, grad) = cross_entropy(&logits, &labels).unwrap();

        let h = 1e-6;
        for i in 0..2 {
            for j in 0..3 {
                let mut plus = logits.clone();
                plus[[i, j]] += h;
                let mut minus = logits.clone();
                minus[[i, j]] -= h;
                let numeric = (cross_entropy(&plus, &labels).unwrap().0
                    - cross_entropy(&minus, &labels).unwrap().0)
                    / (2.0 * h);
                assert_relative_eq!(grad[[i, j]], numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_large_logits_stay_finite() {
        let logits = array![[1000.0, -1000.0]];
        let (loss, grad) = cross_entropy(&logits, &[1]).unwrap();
        assert!(loss.is_finite());
        assert_relative_eq!(loss, 2000.0, epsilon = 1e-9);
        assert!(grad.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_bad_labels() {
        let logits = Array2::zeros((2, 3));
        assert!(cross_entropy(&logits, &[0]).is_err());
        assert!(cross_entropy(&logits, &[0, 3]).is_err());
    }
}
