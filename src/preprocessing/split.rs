//! Seeded train/test splitting

use crate::dataset::Dataset;
use crate::error::{CostBenchError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row positions of a shuffled train/test split.
///
/// The test side takes `ceil(test_size * n)` rows, the train side the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub fn split_indices(n_samples: usize, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(CostBenchError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must lie strictly between 0 and 1".to_string(),
        });
    }

    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(CostBenchError::DataError(format!(
            "cannot split {} rows with test_size {}",
            n_samples, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices { train, test: indices })
}

/// Shuffle rows with `seed` and cut off a test set
pub fn train_test_split(dataset: &Dataset, test_size: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    let split = split_indices(dataset.height(), test_size, seed)?;
    Ok((dataset.take_rows(&split.train)?, dataset.take_rows(&split.test)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes_and_disjointness() {
        let split = split_indices(95, 0.1, 42).unwrap();
        assert_eq!(split.test.len(), 10);
        assert_eq!(split.train.len(), 85);

        let all: HashSet<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        assert_eq!(all.len(), 95);
    }

    #[test]
    fn test_split_is_reproducible() {
        assert_eq!(split_indices(50, 0.2, 7).unwrap(), split_indices(50, 0.2, 7).unwrap());
        assert_ne!(split_indices(50, 0.2, 7).unwrap(), split_indices(50, 0.2, 8).unwrap());
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(split_indices(10, 0.0, 1).is_err());
        assert!(split_indices(10, 1.0, 1).is_err());
        assert!(split_indices(1, 0.5, 1).is_err());
    }

    #[test]
    fn test_dataset_split() {
        let ds = Dataset::from_columns(
            vec![
                ("x".to_string(), (0..20).map(|v| Some(v as f64)).collect()),
                ("y".to_string(), (0..20).map(|v| Some(2.0 * v as f64)).collect()),
            ],
            "y",
        )
        .unwrap();

        let (train, test) = train_test_split(&ds, 0.25, 42).unwrap();
        assert_eq!(train.height(), 15);
        assert_eq!(test.height(), 5);

        // Rows stay aligned across columns
        let x = test.column_array("x").unwrap();
        let y = test.target_array().unwrap();
        for (a, b) in x.iter().zip(y.iter()) {
            assert_eq!(*b, 2.0 * a);
        }
    }
}
