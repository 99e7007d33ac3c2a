//! Seeded train/validation split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

/// Shuffle `0..n_rows` with a seeded RNG and cut off a validation share.
///
/// The validation side gets `ceil(test_fraction * n_rows)` rows. Both sides
/// must end up non-empty.
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Error::InvalidInput(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n_test = (test_fraction * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(Error::InvalidInput(format!(
            "cannot split {} rows with test fraction {}",
            n_rows, test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let val = indices.split_off(n_rows - n_test);
    Ok((indices, val))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes() {
        let (train, val) = train_test_split(26729, 0.10, 0).unwrap();
        assert_eq!(val.len(), 2673);
        assert_eq!(train.len(), 26729 - 2673);
    }

    #[test]
    fn test_split_is_partition() {
        let (train, val) = train_test_split(100, 0.25, 7).unwrap();
        let all: HashSet<usize> = train.iter().chain(val.iter()).copied().collect();
        assert_eq!(all.len(), 100);
        assert!(all.iter().all(|&i| i < 100));
    }

    #[test]
    fn test_split_deterministic_for_seed() {
        let a = train_test_split(50, 0.1, 3).unwrap();
        let b = train_test_split(50, 0.1, 3).unwrap();
        let c = train_test_split(50, 0.1, 4).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_rejects_degenerate_inputs() {
        assert!(train_test_split(1, 0.1, 0).is_err());
        assert!(train_test_split(0, 0.1, 0).is_err());
        assert!(train_test_split(10, 0.0, 0).is_err());
    }
}
