//! Deterministic train/validation/test partitioning by row index.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Row indices of each partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSplit {
    /// Rows used for gradient updates.
    pub train: Vec<usize>,
    /// Rows monitored for early stopping.
    pub validation: Vec<usize>,
    /// Held-out rows, only scored once after training.
    pub test: Vec<usize>,
}

impl DataSplit {
    /// Shuffles `0..n` with `seed` and carves out the partitions.
    ///
    /// The first `ceil(n * test_fraction)` shuffled rows form the test set.
    /// Of the rest, the trailing `n_train - floor(n_train * (1 - validation_fraction))`
    /// rows become the validation set, so it stays fixed across epochs.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidSplit`] if a fraction is outside `(0, 1)`
    /// or any partition would be empty.
    pub fn new(n: usize, test_fraction: f64, validation_fraction: f64, seed: u64) -> DataResult<Self> {
        for (name, fraction) in [("test", test_fraction), ("validation", validation_fraction)] {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(DataError::InvalidSplit(format!(
                    "{} fraction must be in (0, 1), got {}",
                    name, fraction
                )));
            }
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_test = (n as f64 * test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(DataError::InvalidSplit(format!(
                "{} rows cannot be split into train and test partitions",
                n
            )));
        }
        let test = indices[..n_test].to_vec();
        let rest = &indices[n_test..];

        let split_at = (rest.len() as f64 * (1.0 - validation_fraction)).floor() as usize;
        if split_at == 0 || split_at >= rest.len() {
            return Err(DataError::InvalidSplit(format!(
                "{} training rows cannot be split into train and validation partitions",
                rest.len()
            )));
        }

        Ok(Self {
            train: rest[..split_at].to_vec(),
            validation: rest[split_at..].to_vec(),
            test,
        })
    }
}
