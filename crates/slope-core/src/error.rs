//! Error type shared by every slope-core operation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlopeError {
    #[error("invalid pixel spacing: x = {x}, y = {y} (both must be finite and > 0)")]
    InvalidSpacing { x: f64, y: f64 },

    #[error("grid shape mismatch: expected {expected_rows}x{expected_cols}, got {actual_rows}x{actual_cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    #[error("class thresholds must be strictly increasing: threshold {index} ({next}) does not exceed {prev}")]
    UnsortedThresholds { index: usize, prev: f64, next: f64 },

    #[error("{count} thresholds yield more classes than a u8 class grid can hold")]
    TooManyClasses { count: usize },

    #[error("{names} class names given for {classes} classes")]
    ClassNameCount { names: usize, classes: usize },

    #[error("grid must have at least one row and one column, got {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("grid data holds {actual} values but {rows}x{cols} requires {expected}")]
    DataLength { rows: usize, cols: usize, expected: usize, actual: usize },

    #[error("grid of {rows}x{cols} cells overflows the addressable size")]
    GridTooLarge { rows: usize, cols: usize },

    #[error("band height must be at least one row")]
    InvalidBandRows,
}

impl SlopeError {
    pub(crate) fn shape_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        SlopeError::ShapeMismatch {
            expected_rows: expected.0,
            expected_cols: expected.1,
            actual_rows: actual.0,
            actual_cols: actual.1,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlopeError>;
