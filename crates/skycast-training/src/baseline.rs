//! One-feature least-squares baseline.
//!
//! Fits `temp ≈ slope * x + intercept` on a single feature column so the
//! network's test score has a reference point.

use serde::{Deserialize, Serialize};
use skycast_data::FeatureSchema;
use skycast_layers::Tensor;
use tracing::info;

use crate::metrics::EvaluationReport;

/// Feature the pipeline regresses the target on.
pub const BASELINE_FEATURE: &str = "feels_like";

/// Ordinary least squares on one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearBaseline {
    /// Feature column name.
    pub feature: String,
    /// Fitted slope.
    pub slope: f64,
    /// Fitted intercept.
    pub intercept: f64,
}

impl LinearBaseline {
    /// Fits `y` on `x`.
    ///
    /// Returns `None` when the inputs are empty, differ in length, or `x` is
    /// constant.
    pub fn fit(feature: &str, x: &[f32], y: &[f32]) -> Option<Self> {
        if x.is_empty() || x.len() != y.len() {
            return None;
        }
        let n = x.len() as f64;
        let mean_x = x.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let mean_y = y.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (&xi, &yi) in x.iter().zip(y) {
            let dx = f64::from(xi) - mean_x;
            numerator += dx * (f64::from(yi) - mean_y);
            denominator += dx * dx;
        }
        if denominator <= 0.0 {
            return None;
        }

        let slope = numerator / denominator;
        Some(Self {
            feature: feature.to_string(),
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    /// Predictions for `x`.
    pub fn predict(&self, x: &[f32]) -> Vec<f32> {
        x.iter()
            .map(|&v| (self.slope * f64::from(v) + self.intercept) as f32)
            .collect()
    }

    /// Scores the baseline on `x` against `y`.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length or are empty.
    pub fn evaluate(&self, x: &[f32], y: &[f32]) -> EvaluationReport {
        EvaluationReport::from_predictions(&self.predict(x), y, 0.0)
    }
}

/// Baseline fitted on the training rows and scored on the test rows.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineReport {
    /// Fitted line.
    pub model: LinearBaseline,
    /// Test set score.
    pub test: EvaluationReport,
}

/// Values of one column of a `[n, d]` tensor.
pub fn feature_column(x: &Tensor, column: usize) -> Vec<f32> {
    assert_eq!(x.ndim(), 2, "expected a [n, d] tensor");
    let width = x.shape()[1];
    assert!(column < width, "column {} out of range for width {}", column, width);
    x.data().iter().skip(column).step_by(width).copied().collect()
}

/// Fits [`BASELINE_FEATURE`] on the training partition and scores it on the
/// test partition. Returns `None` if the schema lacks the feature, either
/// partition is empty, or the training column is constant.
pub fn fit_baseline(
    schema: &FeatureSchema,
    x_train: &Tensor,
    y_train: &Tensor,
    x_test: &Tensor,
    y_test: &Tensor,
) -> Option<BaselineReport> {
    let column = schema
        .column_names()
        .iter()
        .position(|name| name == BASELINE_FEATURE)?;
    if x_test.shape()[0] == 0 || x_test.shape()[0] != y_test.numel() {
        return None;
    }

    let model = LinearBaseline::fit(
        BASELINE_FEATURE,
        &feature_column(x_train, column),
        y_train.data(),
    )?;
    let test = model.evaluate(&feature_column(x_test, column), y_test.data());
    info!(
        feature = BASELINE_FEATURE,
        slope = model.slope,
        intercept = model.intercept,
        rmse = test.rmse,
        r2 = test.r2,
        "Linear baseline"
    );
    Some(BaselineReport { model, test })
}
