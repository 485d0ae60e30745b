//! No-data mask shared by slope computation and classification.
//!
//! `true` marks a cell with no usable elevation. The mask is derived once
//! from the elevation grid (sentinel comparison when a no-data value is set,
//! NaN test otherwise) or handed in by the loader, and never changes after.

use crate::error::{Result, SlopeError};
use crate::grid::{check_dims, ElevationGrid};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidityMask {
    /// Row-major; `true` = no data.
    pub data: Vec<bool>,
    pub width: usize,
    pub height: usize,
}

/// Row-slice form of [`ValidityMask::from_grid`], used by the banded driver.
pub(crate) fn invalid_cells(values: &[f32], no_data_value: Option<f32>) -> Vec<bool> {
    match no_data_value {
        // A NaN sentinel never compares equal; it means "NaN marks no data".
        Some(nd) if !nd.is_nan() => values.iter().map(|&v| v == nd).collect(),
        _ => values.iter().map(|v| v.is_nan()).collect(),
    }
}

impl ValidityMask {
    /// Derive the mask from the grid's sentinel, or from NaN when it has none.
    pub fn from_grid(grid: &ElevationGrid) -> Self {
        Self {
            data: invalid_cells(&grid.data, grid.no_data_value),
            width: grid.width,
            height: grid.height,
        }
    }

    /// Wrap an externally supplied mask.
    pub fn from_vec(data: Vec<bool>, width: usize, height: usize) -> Result<Self> {
        check_dims(width, height, data.len())?;
        Ok(Self { data, width, height })
    }

    /// A mask with every cell valid.
    pub fn all_valid(width: usize, height: usize) -> Self {
        Self {
            data: vec![false; width * height],
            width,
            height,
        }
    }

    #[inline]
    pub fn is_invalid(&self, row: usize, col: usize) -> bool {
        self.data[row * self.width + col]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn invalid_count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    pub fn valid_count(&self) -> usize {
        self.data.len() - self.invalid_count()
    }

    /// Percentage of cells without data, 0 for an empty mask.
    pub fn invalid_percent(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        100.0 * self.invalid_count() as f64 / self.data.len() as f64
    }

    pub(crate) fn ensure_shape(&self, expected: (usize, usize)) -> Result<()> {
        if self.shape() != expected || self.data.len() != expected.0 * expected.1 {
            return Err(SlopeError::shape_mismatch(expected, self.shape()));
        }
        Ok(())
    }
}
