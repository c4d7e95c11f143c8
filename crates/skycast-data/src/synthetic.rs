//! Synthetic weather history in the source CSV layout.
//!
//! Rows are hourly from `1979-01-01 00:00:00 +0000 UTC`. Temperature follows a
//! seasonal and a diurnal cycle plus uniform noise; the other columns are
//! derived from it so that a model has something to learn.

use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDate, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DataError, DataResult};
use crate::features::{NUMERIC_COLUMNS, TARGET_COLUMN, TIMESTAMP_COLUMN, WEATHER_COLUMN};
use crate::table::RawTable;
use crate::timestamp::TIMESTAMP_SUFFIX;

/// Labels drawn from, in order, for the requested number of categories.
pub const WEATHER_LABELS: [&str; 10] = [
    "Clear",
    "Clouds",
    "Rain",
    "Snow",
    "Mist",
    "Fog",
    "Drizzle",
    "Thunderstorm",
    "Haze",
    "Smoke",
];

/// Parameters of the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Number of data rows.
    pub rows: usize,
    /// Number of distinct `weather_main` labels, taken from [`WEATHER_LABELS`].
    pub categories: usize,
    /// Probability that a cell after the first row is left empty.
    pub missing_rate: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            rows: 1000,
            categories: 4,
            missing_rate: 0.0,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    /// Creates a config with no missing values.
    pub fn new(rows: usize, categories: usize, seed: u64) -> Self {
        Self {
            rows,
            categories,
            missing_rate: 0.0,
            seed,
        }
    }

    /// Sets the probability of empty cells.
    pub fn with_missing_rate(mut self, rate: f64) -> Self {
        self.missing_rate = rate;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidConfig`] if there are no rows, the
    /// category count is outside `1..=10` or exceeds the row count, or the
    /// missing rate is outside `[0, 1)`.
    pub fn validate(&self) -> DataResult<()> {
        if self.rows == 0 {
            return Err(DataError::InvalidConfig("rows must be positive".into()));
        }
        if self.categories == 0 || self.categories > WEATHER_LABELS.len() {
            return Err(DataError::InvalidConfig(format!(
                "categories must be between 1 and {}, got {}",
                WEATHER_LABELS.len(),
                self.categories
            )));
        }
        if self.categories > self.rows {
            return Err(DataError::InvalidConfig(format!(
                "{} categories cannot all appear in {} rows",
                self.categories, self.rows
            )));
        }
        if !(0.0..1.0).contains(&self.missing_rate) {
            return Err(DataError::InvalidConfig(format!(
                "missing_rate must be in [0, 1), got {}",
                self.missing_rate
            )));
        }
        Ok(())
    }
}

/// Generates a table with every requested label present at least once.
///
/// # Errors
///
/// See [`SyntheticConfig::validate`].
pub fn generate(config: &SyntheticConfig) -> DataResult<RawTable> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut headers = vec![TIMESTAMP_COLUMN.to_string(), TARGET_COLUMN.to_string()];
    headers.extend(NUMERIC_COLUMNS.iter().map(|c| c.to_string()));
    headers.push(WEATHER_COLUMN.to_string());

    let start = NaiveDate::from_ymd_opt(1979, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| DataError::InvalidConfig("invalid start date".into()))?;

    let mut rows = Vec::with_capacity(config.rows);
    for i in 0..config.rows {
        let ts = start + Duration::hours(i as i64);
        let season = (2.0 * PI * (f64::from(ts.ordinal()) - 105.0) / 365.0).sin();
        let daily = (2.0 * PI * (f64::from(ts.hour()) - 9.0) / 24.0).sin();
        let temp = 11.0 + 12.0 * season + 4.0 * daily + rng.gen_range(-2.0..2.0);

        let wind_speed: f64 = rng.gen_range(0.0..12.0);
        let clouds: u32 = rng.gen_range(0..=100);
        let category = if i < config.categories {
            i
        } else {
            rng.gen_range(0..config.categories)
        };

        let numeric = [
            format!("{}", 10000 - clouds * 40),
            format!("{:.2}", temp - rng.gen_range(2.0..10.0)),
            format!("{:.2}", temp - 0.5 * wind_speed + rng.gen_range(-1.0..1.0)),
            format!("{:.2}", temp - rng.gen_range(0.0..2.0)),
            format!("{:.2}", temp + rng.gen_range(0.0..2.0)),
            format!("{:.0}", 1013.0 + rng.gen_range(-15.0..15.0)),
            format!("{:.2}", wind_speed),
            format!("{}", rng.gen_range(0..360)),
            format!("{}", clouds),
        ];

        let mut row = Vec::with_capacity(headers.len());
        row.push(Some(format!("{}{}", ts.format("%Y-%m-%d %H:%M:%S"), TIMESTAMP_SUFFIX)));
        row.push(Some(format!("{:.2}", temp)));
        row.extend(numeric.into_iter().map(Some));
        row.push(Some(WEATHER_LABELS[category].to_string()));

        // the first row stays complete so forward fill always has a seed value
        if i > 0 && config.missing_rate > 0.0 {
            for cell in row.iter_mut() {
                if rng.gen_bool(config.missing_rate) {
                    *cell = None;
                }
            }
        }
        rows.push(row);
    }

    info!(
        rows = config.rows,
        categories = config.categories,
        missing_rate = config.missing_rate,
        "Generated synthetic weather history"
    );
    RawTable::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_layout_and_labels() {
        let table = generate(&SyntheticConfig::new(50, 3, 1)).unwrap();
        assert_eq!(table.len(), 50);
        assert_eq!(table.headers().len(), 12);
        assert_eq!(table.headers()[0], "dt_iso");

        let labels: BTreeSet<&str> = table
            .column("weather_main")
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(labels, BTreeSet::from(["Clear", "Clouds", "Rain"]));

        let ts = table.column("dt_iso").unwrap();
        assert_eq!(ts[0], Some("1979-01-01 00:00:00 +0000 UTC"));
        assert_eq!(ts[25], Some("1979-01-02 01:00:00 +0000 UTC"));
    }

    #[test]
    fn test_seed_is_deterministic() {
        let config = SyntheticConfig::new(20, 2, 9);
        assert_eq!(generate(&config).unwrap(), generate(&config).unwrap());
    }

    #[test]
    fn test_missing_rate_keeps_first_row() {
        let config = SyntheticConfig::new(200, 4, 3).with_missing_rate(0.3);
        let table = generate(&config).unwrap();
        assert!(table.rows()[0].iter().all(Option::is_some));
        let missing = table.rows().iter().flatten().filter(|c| c.is_none()).count();
        assert!(missing > 0);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(SyntheticConfig::new(0, 1, 0).validate().is_err());
        assert!(SyntheticConfig::new(10, 11, 0).validate().is_err());
        assert!(SyntheticConfig::new(2, 3, 0).validate().is_err());
        assert!(SyntheticConfig::new(10, 2, 0)
            .with_missing_rate(1.0)
            .validate()
            .is_err());
    }
}
