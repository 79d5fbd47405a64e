//! Delimited intensity grid loading
//!
//! EDS exports are headerless comma-separated matrices. Loading is tolerant at
//! the cell level: a token that is not a number becomes a missing cell (NaN)
//! instead of failing the whole file. Structural problems (unreadable file,
//! ragged rows) still fail with an ingest error.

use super::error::{EdsMapError, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Field delimiter of EDS grid exports
pub const GRID_DELIMITER: u8 = b',';

/// Rectangular row-major matrix of intensities; missing cells are NaN
#[derive(Debug, Clone, PartialEq)]
pub struct NumericGrid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl NumericGrid {
    /// Build a grid from row-major values. Returns None if the length does
    /// not match `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, values: Vec<f64>) -> Option<Self> {
        if rows.checked_mul(cols)? != values.len() {
            return None;
        }
        Some(NumericGrid { rows, cols, values })
    }

    /// Build a grid from nested rows. Returns None if the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != n_cols) {
            return None;
        }
        Self::from_vec(n_rows, n_cols, rows.into_iter().flatten().collect())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Cell value at (row, col); NaN for missing cells
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.values[row * self.cols + col])
        } else {
            None
        }
    }

    /// Number of cells holding a number
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// True if no cell holds a number (also true for an empty grid)
    pub fn is_all_missing(&self) -> bool {
        self.values.iter().all(|v| v.is_nan())
    }

    /// Observed (min, max) over the non-missing cells
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// What tolerant coercion did to the raw tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoercionReport {
    /// Tokens that were present but not a finite number
    pub rejected_cells: usize,
    /// Empty fields and explicit `nan` tokens
    pub blank_cells: usize,
}

impl CoercionReport {
    pub fn is_contaminated(&self) -> bool {
        self.rejected_cells > 0 || self.blank_cells > 0
    }

    pub fn missing_cells(&self) -> usize {
        self.rejected_cells + self.blank_cells
    }
}

/// A validated grid together with its coercion report
#[derive(Debug, Clone)]
pub struct GridLoad {
    pub grid: NumericGrid,
    pub report: CoercionReport,
}

/// Outcome of coercing a single raw token
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell {
    Value(f64),
    Blank,
    Rejected,
}

fn coerce_token(raw: &[u8]) -> Cell {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(_) => return Cell::Rejected,
    };
    let token = text.trim_start_matches('\u{feff}').trim();
    if token.is_empty() {
        return Cell::Blank;
    }
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Cell::Value(v),
        Ok(v) if v.is_nan() => Cell::Blank,
        _ => Cell::Rejected,
    }
}

/// Load and validate a grid file
///
/// # Errors
/// - `Ingest` if the file cannot be read or its rows have unequal lengths
/// - `InvalidGrid` if the table is empty or no cell coerces to a number
pub fn load(path: impl AsRef<Path>) -> Result<GridLoad> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(GRID_DELIMITER)
        .flexible(false)
        .from_path(path)
        .map_err(|e| EdsMapError::ingest(path, e))?;

    let (grid, report) = parse_records(reader).map_err(|e| EdsMapError::ingest(path, e))?;

    if grid.is_empty() {
        return Err(EdsMapError::invalid_grid(path, "grid has no cells"));
    }
    if grid.is_all_missing() {
        return Err(EdsMapError::invalid_grid(
            path,
            format!("none of the {} cells is numeric", grid.len()),
        ));
    }

    if report.is_contaminated() {
        warn!(
            path = %path.display(),
            rejected = report.rejected_cells,
            blank = report.blank_cells,
            "grid has missing cells; they will render as no-data"
        );
    }
    debug!(
        path = %path.display(),
        rows = grid.rows(),
        cols = grid.cols(),
        "grid loaded"
    );

    Ok(GridLoad { grid, report })
}

/// Parse grid text already held in memory (same rules as [`load`], minus
/// validation)
pub fn parse_str(text: &str) -> csv::Result<(NumericGrid, CoercionReport)> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(GRID_DELIMITER)
        .flexible(false)
        .from_reader(text.as_bytes());
    parse_records(reader)
}

fn parse_records<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> csv::Result<(NumericGrid, CoercionReport)> {
    let mut report = CoercionReport::default();
    let mut values = Vec::new();
    let mut rows = 0usize;
    let mut cols = 0usize;

    for record in reader.byte_records() {
        let record = record?;
        if rows == 0 {
            cols = record.len();
        }
        for field in record.iter() {
            let value = match coerce_token(field) {
                Cell::Value(v) => v,
                Cell::Blank => {
                    report.blank_cells += 1;
                    f64::NAN
                }
                Cell::Rejected => {
                    report.rejected_cells += 1;
                    f64::NAN
                }
            };
            values.push(value);
        }
        rows += 1;
    }

    let grid = NumericGrid { rows, cols, values };
    Ok((grid, report))
}
