//! In-memory weather history table.
//!
//! The loader keeps every source column as optional text, in file order.
//! Parsing into numbers and dates happens later, in the feature builder.

use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{DataError, DataResult};

/// Rows of optional string cells under a header.
///
/// An empty field (after trimming) is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Creates a table from headers and rows.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ShapeMismatch`] if a row's width differs from the header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> DataResult<Self> {
        if let Some(row) = rows.iter().find(|row| row.len() != headers.len()) {
            return Err(DataError::ShapeMismatch {
                expected: headers.len(),
                actual: row.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Reads a delimited file with a header row.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened, is not well-formed CSV (including
    /// rows whose field count differs from the header), or has no records.
    pub fn from_path(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "Loaded weather history"
        );
        Ok(table)
    }

    /// Reads delimited text with a header row from any reader.
    ///
    /// # Errors
    ///
    /// See [`RawTable::from_path`].
    pub fn from_reader<R: Read>(reader: R) -> DataResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| (!field.is_empty()).then(|| field.to_string()))
                    .collect(),
            );
        }
        if rows.is_empty() {
            return Err(DataError::Empty);
        }
        debug!(columns = ?headers, "Parsed CSV header");
        Ok(Self { headers, rows })
    }

    /// Returns the column names in source order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the rows in source order.
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Returns the number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of a column.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingColumn`] if no header matches `name`.
    pub fn column_index(&self, name: &str) -> DataResult<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// Returns the cells of a column, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingColumn`] if no header matches `name`.
    pub fn column(&self, name: &str) -> DataResult<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_deref()).collect())
    }

    /// Renders the header and the first `n` rows as aligned text.
    pub fn preview(&self, n: usize) -> String {
        let shown = &self.rows[..n.min(self.rows.len())];
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                shown
                    .iter()
                    .map(|row| row[i].as_deref().map_or(0, str::len))
                    .max()
                    .unwrap_or(0)
                    .max(h.len())
            })
            .collect();

        let mut out = String::new();
        let header: Vec<&str> = self.headers.iter().map(String::as_str).collect();
        render_line(&mut out, &header, &widths);
        for row in shown {
            let cells: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("")).collect();
            render_line(&mut out, &cells, &widths);
        }
        out
    }

    /// Writes the table as CSV, leaving missing cells empty.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created or written.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> DataResult<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        writer.flush().map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

fn render_line(out: &mut String, cells: &[&str], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}
