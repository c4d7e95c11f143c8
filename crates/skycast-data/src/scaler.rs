//! Per-column standardization.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Standardizes each column to zero mean and unit variance.
///
/// Statistics use the population variance. A column with zero variance gets
/// a scale of 1, so it maps to all zeros instead of dividing by zero.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use skycast_data::scaler::StandardScaler;
///
/// let x = array![[1.0, 10.0], [3.0, 10.0]];
/// let (scaler, scaled) = StandardScaler::fit_transform(&x).unwrap();
/// assert_eq!(scaler.mean(), &[2.0, 10.0]);
/// assert_eq!(scaled, array![[-1.0, 0.0], [1.0, 0.0]]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    var: Vec<f64>,
    scale: Vec<f64>,
    n_samples: usize,
}

impl StandardScaler {
    /// Computes column statistics.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Empty`] if `x` has no rows.
    pub fn fit(x: &Array2<f64>) -> DataResult<Self> {
        if x.nrows() == 0 {
            return Err(DataError::Empty);
        }
        let mean = x.mean_axis(Axis(0)).ok_or(DataError::Empty)?;
        let var = x.var_axis(Axis(0), 0.0);
        let scale = var.mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 });
        Ok(Self {
            mean: mean.to_vec(),
            var: var.to_vec(),
            scale: scale.to_vec(),
            n_samples: x.nrows(),
        })
    }

    /// Applies the fitted statistics.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ShapeMismatch`] if the column count differs from
    /// the fitted data.
    pub fn transform(&self, x: &Array2<f64>) -> DataResult<Array2<f64>> {
        self.check_width(x)?;
        let mean = Array1::from(self.mean.clone());
        let scale = Array1::from(self.scale.clone());
        Ok((x - &mean) / &scale)
    }

    /// Maps standardized values back to the original units.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ShapeMismatch`] on a column count mismatch.
    pub fn inverse_transform(&self, x: &Array2<f64>) -> DataResult<Array2<f64>> {
        self.check_width(x)?;
        let mean = Array1::from(self.mean.clone());
        let scale = Array1::from(self.scale.clone());
        Ok(x * &scale + &mean)
    }

    /// Fits on `x` and returns the scaler with the transformed data.
    ///
    /// # Errors
    ///
    /// See [`StandardScaler::fit`].
    pub fn fit_transform(x: &Array2<f64>) -> DataResult<(Self, Array2<f64>)> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }

    /// Per-column means.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-column population variances.
    pub fn var(&self) -> &[f64] {
        &self.var
    }

    /// Per-column divisors.
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Number of rows the scaler was fitted on.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of columns the scaler expects.
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn check_width(&self, x: &Array2<f64>) -> DataResult<()> {
        if x.ncols() != self.n_features() {
            return Err(DataError::ShapeMismatch {
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }
        Ok(())
    }
}
