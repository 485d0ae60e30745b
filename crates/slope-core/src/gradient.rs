//! Finite-difference elevation gradient used by the slope computer.
//! `pub(crate)` only — not re-exported from lib.rs.
//!
//! Interior cells use centred differences; first/last rows and columns fall
//! back to one-sided differences over the single available neighbour:
//! ```text
//!   interior:  (z[i+1] − z[i−1]) / (2 · h)
//!   first:     (z[1]   − z[0])   / h
//!   last:      (z[n−1] − z[n−2]) / h
//!   n == 1:    0
//! ```
//! No wrapping and no reflection across the grid boundary.

use crate::grid::Spacing;

/// Read-only view over a contiguous run of full grid rows.
///
/// `first_row` is the global index of the first row held in `data`, and
/// `total_rows` the height of the whole grid, so edge rules stay tied to the
/// real grid boundary when only a band (plus halo) is loaded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RowWindow<'a> {
    pub data: &'a [f32],
    pub width: usize,
    pub first_row: usize,
    pub total_rows: usize,
}

impl<'a> RowWindow<'a> {
    /// Window over a whole grid.
    pub fn whole(data: &'a [f32], width: usize, height: usize) -> Self {
        Self { data, width, first_row: 0, total_rows: height }
    }

    /// Elevation at global `(row, col)` widened to f64.
    /// Caller must keep `row` within the rows held by the window.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row - self.first_row) * self.width + col] as f64
    }
}

/// One-dimensional difference along an axis of length `n` at index `i`.
/// `at(k)` returns the sample at index `k` on that axis.
#[inline]
fn axis_difference(n: usize, i: usize, h: f64, at: impl Fn(usize) -> f64) -> f64 {
    if n < 2 {
        0.0
    } else if i == 0 {
        (at(1) - at(0)) / h
    } else if i == n - 1 {
        (at(n - 1) - at(n - 2)) / h
    } else {
        (at(i + 1) - at(i - 1)) / (2.0 * h)
    }
}

/// Gradient `(dz/dx, dz/dy)` at global cell `(row, col)`.
///
/// `dz/dx` runs along columns (east-west), `dz/dy` along rows (north-south).
/// The window must hold rows `row − 1 ..= row + 1`, clipped to the grid.
#[inline]
pub(crate) fn gradient(w: &RowWindow<'_>, row: usize, col: usize, spacing: Spacing) -> (f64, f64) {
    let dz_dx = axis_difference(w.width, col, spacing.x, |c| w.get(row, c));
    let dz_dy = axis_difference(w.total_rows, row, spacing.y, |r| w.get(r, col));
    (dz_dx, dz_dy)
}

/// Slope angle in degrees from a gradient: `atan(√(gx² + gy²)) × 180/π`.
#[inline]
pub(crate) fn slope_degrees(dz_dx: f64, dz_dy: f64) -> f64 {
    let slope_rad = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();
    slope_rad * 180.0 / std::f64::consts::PI
}
