//! Feature engineering for weather observations.
//!
//! [`FeatureBuilder::build`] turns a [`RawTable`] into a standardized feature
//! matrix and a temperature target:
//!
//! 1. strip ` +0000 UTC` from `dt_iso` and parse it,
//! 2. derive hour, day, month and year,
//! 3. one-hot encode `weather_main` from the raw labels,
//! 4. forward-fill missing values down each column,
//! 5. select the fixed numeric features plus the indicators and standardize.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use skycast_layers::Tensor;
use tracing::{debug, info};

use crate::error::{DataError, DataResult};
use crate::scaler::StandardScaler;
use crate::table::RawTable;
use crate::timestamp::{parse_timestamp, strip_suffix, TimeParts};

/// Timestamp column.
pub const TIMESTAMP_COLUMN: &str = "dt_iso";
/// Categorical weather condition column.
pub const WEATHER_COLUMN: &str = "weather_main";
/// Regression target column.
pub const TARGET_COLUMN: &str = "temp";
/// Prefix of the indicator column names.
pub const INDICATOR_PREFIX: &str = "weather_";

/// Numeric source columns, in feature order.
pub const NUMERIC_COLUMNS: [&str; 9] = [
    "visibility",
    "dew_point",
    "feels_like",
    "temp_min",
    "temp_max",
    "pressure",
    "wind_speed",
    "wind_deg",
    "clouds_all",
];

/// Calendar features derived from the timestamp, in feature order.
pub const TIME_COLUMNS: [&str; 4] = ["hour", "day", "month", "year"];

/// How many timestamps are logged before and after suffix stripping.
const TIMESTAMP_SAMPLE: usize = 10;

/// Replaces each missing value with the nearest preceding present value.
///
/// Leading missing values stay missing.
///
/// ```
/// use skycast_data::features::forward_fill;
///
/// let mut values = vec![None, Some(1.0), None, Some(3.0), None];
/// forward_fill(&mut values);
/// assert_eq!(values, vec![None, Some(1.0), Some(1.0), Some(3.0), Some(3.0)]);
/// ```
pub fn forward_fill<T: Clone>(values: &mut [Option<T>]) {
    let mut last: Option<T> = None;
    for value in values.iter_mut() {
        match value {
            Some(v) => last = Some(v.clone()),
            None => *value = last.clone(),
        }
    }
}

/// Column layout of a built feature matrix.
///
/// The indicator set depends on the labels present in the training data, so
/// it is persisted with the scaler and checked at inference time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Names of the fixed numeric features, in column order.
    pub numeric_features: Vec<String>,
    /// Weather label to indicator column index (within the full matrix).
    pub weather_categories: BTreeMap<String, usize>,
}

impl FeatureSchema {
    /// Builds the schema for the given distinct labels.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let numeric_features: Vec<String> = NUMERIC_COLUMNS
            .iter()
            .chain(TIME_COLUMNS.iter())
            .map(|s| s.to_string())
            .collect();
        let sorted: BTreeSet<&str> = labels.into_iter().collect();
        let weather_categories = sorted
            .into_iter()
            .enumerate()
            .map(|(i, label)| (label.to_string(), numeric_features.len() + i))
            .collect();
        Self {
            numeric_features,
            weather_categories,
        }
    }

    /// Total number of feature columns.
    pub fn width(&self) -> usize {
        self.numeric_features.len() + self.weather_categories.len()
    }

    /// Column holding the indicator for `label`, if that label was seen.
    pub fn indicator_index(&self, label: &str) -> Option<usize> {
        self.weather_categories.get(label).copied()
    }

    /// All column names in matrix order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.numeric_features.clone();
        let mut indicators: Vec<(&String, &usize)> = self.weather_categories.iter().collect();
        indicators.sort_by_key(|(_, idx)| **idx);
        names.extend(
            indicators
                .into_iter()
                .map(|(label, _)| format!("{}{}", INDICATOR_PREFIX, label)),
        );
        names
    }
}

/// Standardized features, raw targets and the fitted preprocessing state.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// `[rows, schema.width()]` standardized features.
    pub features: Tensor,
    /// Unscaled temperature per row.
    pub targets: Vec<f32>,
    /// Statistics used to standardize `features`.
    pub scaler: StandardScaler,
    /// Column layout of `features`.
    pub schema: FeatureSchema,
}

impl FeatureSet {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of feature columns.
    pub fn width(&self) -> usize {
        self.schema.width()
    }

    /// Gathers the given rows as a feature tensor and a `[n, 1]` target tensor.
    pub fn subset(&self, indices: &[usize]) -> (Tensor, Tensor) {
        let features = self.features.select_rows(indices);
        let targets = indices.iter().map(|&i| self.targets[i]).collect();
        (features, Tensor::from_data(&[indices.len(), 1], targets))
    }
}

/// Builds [`FeatureSet`]s from raw weather tables.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Creates a builder.
    pub fn new() -> Self {
        Self
    }

    /// Runs the full feature pipeline and fits a scaler on the result.
    ///
    /// # Errors
    ///
    /// Fails on a missing required column, a malformed timestamp, a
    /// non-numeric value in a numeric column, or a value that is still
    /// missing after forward fill.
    pub fn build(&self, table: &RawTable) -> DataResult<FeatureSet> {
        let (raw, targets, schema) = self.extract(table)?;
        let (scaler, scaled) = StandardScaler::fit_transform(&raw)?;
        info!(
            rows = raw.nrows(),
            features = schema.width(),
            categories = schema.weather_categories.len(),
            "Built feature matrix"
        );

        let (rows, cols) = scaled.dim();
        let data = scaled.iter().map(|&v| v as f32).collect();
        Ok(FeatureSet {
            features: Tensor::from_data(&[rows, cols], data),
            targets,
            scaler,
            schema,
        })
    }

    /// Produces the unscaled feature matrix, the targets and the schema.
    ///
    /// # Errors
    ///
    /// See [`FeatureBuilder::build`].
    pub fn extract(&self, table: &RawTable) -> DataResult<(Array2<f64>, Vec<f32>, FeatureSchema)> {
        let n = table.len();

        let mut times = parse_time_column(table)?;
        let labels = table.column(WEATHER_COLUMN)?;
        let schema = FeatureSchema::new(labels.iter().flatten().copied());

        let mut numeric = Vec::with_capacity(NUMERIC_COLUMNS.len());
        for name in NUMERIC_COLUMNS {
            numeric.push((name, numeric_column(table, name)?));
        }
        let mut target = numeric_column(table, TARGET_COLUMN)?;

        forward_fill(&mut times);
        for (_, column) in numeric.iter_mut() {
            forward_fill(column);
        }
        forward_fill(&mut target);

        let mut matrix = Array2::<f64>::zeros((n, schema.width()));
        for (j, (name, column)) in numeric.iter().enumerate() {
            for (i, value) in column.iter().enumerate() {
                matrix[[i, j]] = value.ok_or_else(|| unfilled(name, i))?;
            }
        }
        let time_offset = NUMERIC_COLUMNS.len();
        for (i, parts) in times.iter().enumerate() {
            let parts = parts.ok_or_else(|| unfilled(TIMESTAMP_COLUMN, i))?;
            for (k, value) in parts.as_features().into_iter().enumerate() {
                matrix[[i, time_offset + k]] = value;
            }
        }
        for (i, label) in labels.iter().enumerate() {
            if let Some(idx) = label.and_then(|l| schema.indicator_index(l)) {
                matrix[[i, idx]] = 1.0;
            }
        }

        let targets = target
            .iter()
            .enumerate()
            .map(|(i, t)| t.map(|v| v as f32).ok_or_else(|| unfilled(TARGET_COLUMN, i)))
            .collect::<DataResult<Vec<f32>>>()?;

        Ok((matrix, targets, schema))
    }
}

fn unfilled(column: &str, row: usize) -> DataError {
    DataError::UnfilledValue {
        column: column.to_string(),
        row: row + 1,
    }
}

fn parse_time_column(table: &RawTable) -> DataResult<Vec<Option<TimeParts>>> {
    let raw = table.column(TIMESTAMP_COLUMN)?;

    let sample: Vec<&str> = raw
        .iter()
        .take(TIMESTAMP_SAMPLE)
        .map(|v| v.unwrap_or(""))
        .collect();
    debug!(values = ?sample, "Timestamps before suffix removal");
    let stripped: Vec<Option<&str>> = raw.iter().map(|v| v.map(strip_suffix)).collect();
    let sample: Vec<&str> = stripped
        .iter()
        .take(TIMESTAMP_SAMPLE)
        .map(|v| v.unwrap_or(""))
        .collect();
    debug!(values = ?sample, "Timestamps after suffix removal");

    stripped
        .iter()
        .enumerate()
        .map(|(i, value)| match value {
            None => Ok(None),
            Some(s) => parse_timestamp(s)
                .map(|dt| Some(TimeParts::from(dt)))
                .ok_or_else(|| DataError::InvalidTimestamp {
                    value: s.to_string(),
                    row: i + 1,
                }),
        })
        .collect()
}

fn numeric_column(table: &RawTable, name: &str) -> DataResult<Vec<Option<f64>>> {
    table
        .column(name)?
        .into_iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            None => Ok(None),
            Some(s) => s
                .parse::<f64>()
                .map(Some)
                .map_err(|_| DataError::InvalidNumber {
                    column: name.to_string(),
                    value: s.to_string(),
                    row: i + 1,
                }),
        })
        .collect()
}
