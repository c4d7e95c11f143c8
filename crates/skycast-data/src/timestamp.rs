//! Observation timestamp parsing.
//!
//! Source timestamps look like `1979-01-01 00:00:00 +0000 UTC`. The trailing
//! ` +0000 UTC` marker is stripped before parsing; every timestamp is UTC.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Suffix removed from every timestamp before parsing.
pub const TIMESTAMP_SUFFIX: &str = " +0000 UTC";

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Removes [`TIMESTAMP_SUFFIX`] if present.
pub fn strip_suffix(raw: &str) -> &str {
    raw.strip_suffix(TIMESTAMP_SUFFIX).unwrap_or(raw).trim()
}

/// Parses a stripped timestamp. A bare date is taken as midnight.
pub fn parse_timestamp(stripped: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(stripped, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(stripped, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Calendar fields derived from a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of month, 1-31
    pub day: u32,
    /// Month, 1-12
    pub month: u32,
    /// Calendar year
    pub year: i32,
}

impl TimeParts {
    /// Returns `[hour, day, month, year]` as feature values.
    pub fn as_features(&self) -> [f64; 4] {
        [
            f64::from(self.hour),
            f64::from(self.day),
            f64::from(self.month),
            f64::from(self.year),
        ]
    }
}

impl From<NaiveDateTime> for TimeParts {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            hour: dt.hour(),
            day: dt.day(),
            month: dt.month(),
            year: dt.year(),
        }
    }
}
