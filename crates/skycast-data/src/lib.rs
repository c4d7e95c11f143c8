//! Weather history loading and feature engineering for skycast.
//!
//! The data pipeline reads an hourly weather history, derives calendar
//! features, one-hot encodes the weather condition, fills gaps and
//! standardizes every column:
//!
//! ```
//! use skycast_data::{generate, FeatureBuilder, SyntheticConfig};
//!
//! let table = generate(&SyntheticConfig::new(200, 4, 42)).unwrap();
//! let set = FeatureBuilder::new().build(&table).unwrap();
//! assert_eq!(set.width(), 13 + 4);
//! assert_eq!(set.features.shape(), &[200, 17]);
//! ```
//!
//! # Modules
//!
//! - [`table`] - CSV loading into [`RawTable`]
//! - [`timestamp`] - `dt_iso` suffix stripping and parsing
//! - [`features`] - [`FeatureBuilder`], forward fill and the [`FeatureSchema`]
//! - [`scaler`] - [`StandardScaler`]
//! - [`split`] - Seeded train/validation/test partitioning
//! - [`synthetic`] - Generator for test and demo data

#![warn(missing_docs)]

pub mod error;
pub mod features;
pub mod scaler;
pub mod split;
pub mod synthetic;
pub mod table;
pub mod timestamp;

pub use error::{DataError, DataResult};
pub use features::{forward_fill, FeatureBuilder, FeatureSchema, FeatureSet};
pub use scaler::StandardScaler;
pub use split::DataSplit;
pub use synthetic::{generate, SyntheticConfig, WEATHER_LABELS};
pub use table::RawTable;
pub use timestamp::{parse_timestamp, strip_suffix, TimeParts, TIMESTAMP_SUFFIX};
