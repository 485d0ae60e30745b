//! Per-cell slope angle (degrees) from a DEM.
//!
//! Gradients come from `super::gradient` (centred differences inside the grid,
//! one-sided on its edges). Masked cells are written as NaN whatever their
//! computed slope would have been. Rows are independent and run in parallel
//! under the `threading` feature.
use std::ops::Range;

use serde::Serialize;

use crate::error::Result;
use crate::gradient::{gradient, slope_degrees, RowWindow};
use crate::grid::{check_dims, ElevationGrid, SlopeGrid, Spacing};
use crate::mask::ValidityMask;
use crate::maybe_rayon::*;

/// Largest f32 strictly below 90°. Gradients past ~1.5e7 would otherwise
/// round up to exactly 90 when narrowed to f32.
const MAX_SLOPE_DEG: f32 = 89.999_99;

/// Compute the slope grid for `elevation`, blanking every cell set in `mask`.
///
/// Fails with `InvalidSpacing` for non-positive spacing, `ShapeMismatch` when
/// the mask does not match the grid, `EmptyGrid`/`DataLength` for malformed
/// grids. A single row or column is not an error: that axis contributes a
/// zero gradient.
pub fn compute_slope(elevation: &ElevationGrid, mask: &ValidityMask) -> Result<SlopeGrid> {
    let spacing = elevation.spacing().validate()?;
    check_dims(elevation.width, elevation.height, elevation.data.len())?;
    mask.ensure_shape(elevation.shape())?;

    let window = RowWindow::whole(&elevation.data, elevation.width, elevation.height);
    let data = slope_rows(&window, 0..elevation.height, spacing, &mask.data);

    Ok(SlopeGrid {
        data,
        width: elevation.width,
        height: elevation.height,
        x_spacing: spacing.x,
        y_spacing: spacing.y,
    })
}

/// Slope for global rows `rows`, row-major. `mask` covers exactly those rows;
/// `window` must also hold the row above and below where the grid has them.
pub(crate) fn slope_rows(
    window: &RowWindow<'_>,
    rows: Range<usize>,
    spacing: Spacing,
    mask: &[bool],
) -> Vec<f32> {
    let width = window.width;
    let first = rows.start;

    rows.into_par_iter()
        .flat_map(|row| {
            let offset = (row - first) * width;
            let invalid = &mask[offset..offset + width];
            let mut row_data = vec![SlopeGrid::MISSING; width];

            for col in 0..width {
                if invalid[col] {
                    continue;
                }
                let (dz_dx, dz_dy) = gradient(window, row, col, spacing);
                let deg = slope_degrees(dz_dx, dz_dy) as f32;
                // NaN (a NaN sample in the stencil) passes through unclamped.
                row_data[col] = if deg.is_nan() { deg } else { deg.min(MAX_SLOPE_DEG) };
            }

            row_data
        })
        .collect()
}

/// Min/max/mean slope over cells holding a value. All NaN when none do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlopeSummary {
    pub min_deg: f32,
    pub max_deg: f32,
    pub mean_deg: f32,
    /// Cells with a finite slope.
    pub valid_cells: usize,
    /// Cells holding the missing marker.
    pub missing_cells: usize,
}

impl SlopeSummary {
    pub fn from_grid(slope: &SlopeGrid) -> Self {
        let mut acc = SlopeAccumulator::default();
        acc.push(&slope.data);
        acc.finish()
    }
}

/// Running form of [`SlopeSummary`] so banded processing can fold rows in as
/// they are produced.
#[derive(Debug, Clone)]
pub(crate) struct SlopeAccumulator {
    min: f32,
    max: f32,
    sum: f64,
    valid: usize,
    missing: usize,
}

impl Default for SlopeAccumulator {
    fn default() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            sum: 0.0,
            valid: 0,
            missing: 0,
        }
    }
}

impl SlopeAccumulator {
    pub fn push(&mut self, values: &[f32]) {
        for &v in values {
            if v.is_nan() {
                self.missing += 1;
                continue;
            }
            self.min = self.min.min(v);
            self.max = self.max.max(v);
            self.sum += v as f64;
            self.valid += 1;
        }
    }

    pub fn finish(&self) -> SlopeSummary {
        if self.valid == 0 {
            return SlopeSummary {
                min_deg: f32::NAN,
                max_deg: f32::NAN,
                mean_deg: f32::NAN,
                valid_cells: 0,
                missing_cells: self.missing,
            };
        }
        SlopeSummary {
            min_deg: self.min,
            max_deg: self.max,
            mean_deg: (self.sum / self.valid as f64) as f32,
            valid_cells: self.valid,
            missing_cells: self.missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlopeError;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Planar ramp rising `rise` per column, `cols`×`rows`, unit spacing.
    fn ramp(cols: usize, rows: usize, rise: f32) -> ElevationGrid {
        let mut g = ElevationGrid::flat(cols, rows);
        for r in 0..rows {
            for c in 0..cols {
                g.set(r, c, c as f32 * rise);
            }
        }
        g
    }

    fn slope_of(g: &ElevationGrid) -> SlopeGrid {
        compute_slope(g, &ValidityMask::from_grid(g)).unwrap()
    }

    #[test]
    fn flat_grid_has_zero_slope_everywhere() {
        let mut g = ElevationGrid::new(7, 5, 30.0, 30.0, 812.5);
        g.set(2, 3, f32::NAN);
        let s = slope_of(&g);
        for r in 0..5 {
            for c in 0..7 {
                let centre_or_neighbour = (r as isize - 2).abs() + (c as isize - 3).abs() <= 1;
                if !centre_or_neighbour {
                    assert_eq!(s.get(r, c), 0.0, "cell ({r}, {c})");
                }
            }
        }
        assert!(s.is_missing(2, 3));
    }

    #[test]
    fn ramp_hits_target_angle() {
        // rise of tan(30°) per 10 m column, 10 m spacing.
        let target = 30.0f64;
        let rise = (10.0 * target.to_radians().tan()) as f32;
        let mut g = ramp(16, 8, rise);
        g.x_spacing = 10.0;
        g.y_spacing = 10.0;
        let s = slope_of(&g);
        for r in 0..8 {
            for c in 0..16 {
                assert_relative_eq!(s.get(r, c) as f64, target, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn steeper_ramp_never_lowers_interior_slope() {
        let mut prev = 0.0f32;
        for step in 1..=40 {
            let s = slope_of(&ramp(6, 6, step as f32 * 0.25));
            let v = s.get(3, 3);
            assert!(v >= prev, "rise {step}: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn masked_cells_are_missing_regardless_of_elevation() {
        let mut g = ramp(5, 5, 3.0).with_no_data(-9999.0);
        g.set(1, 1, -9999.0);
        g.set(4, 0, -9999.0);
        let mask = ValidityMask::from_grid(&g);
        let s = compute_slope(&g, &mask).unwrap();
        assert!(s.is_missing(1, 1));
        assert!(s.is_missing(4, 0));
        assert_eq!(s.data.iter().filter(|v| v.is_nan()).count(), 2);

        // An explicit mask wins over the data.
        let mut explicit = ValidityMask::all_valid(5, 5);
        explicit.data[12] = true;
        let s = compute_slope(&ramp(5, 5, 3.0), &explicit).unwrap();
        assert!(s.is_missing(2, 2));
    }

    #[test]
    fn output_shape_matches_input() {
        for &(cols, rows) in &[(1, 1), (1, 7), (9, 1), (4, 6), (13, 2)] {
            let s = slope_of(&ramp(cols, rows, 1.0));
            assert_eq!(s.shape(), (rows, cols));
            assert_eq!(s.data.len(), rows * cols);
        }
    }

    #[test]
    fn random_finite_grids_stay_below_ninety() {
        let mut rng = StdRng::seed_from_u64(0x51_0FE);
        for _ in 0..20 {
            let cols = rng.gen_range(1..24);
            let rows = rng.gen_range(1..24);
            let mut g = ElevationGrid::new(
                cols,
                rows,
                rng.gen_range(0.1..50.0),
                rng.gen_range(0.1..50.0),
                0.0,
            );
            for v in g.data.iter_mut() {
                *v = rng.gen_range(-500.0..9000.0);
            }
            let s = slope_of(&g);
            assert!(s.data.iter().all(|&v| (0.0..90.0).contains(&v)));
        }
    }

    #[test]
    fn extreme_gradient_is_clamped_below_ninety() {
        let mut g = ElevationGrid::flat(2, 1);
        g.set(0, 1, 1.0e30);
        let s = slope_of(&g);
        assert!(s.get(0, 0) < 90.0);
        assert!(s.get(0, 0) > 89.99);
    }

    #[test]
    fn three_by_three_edge_cells() {
        let g = ElevationGrid::from_vec(
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0],
            3,
            3,
            Spacing::new(1.0, 1.0),
            None,
        )
        .unwrap();
        let s = slope_of(&g);

        // Corner: forward differences (0 − 0) in both axes.
        assert_eq!(s.get(0, 0), 0.0);
        assert_eq!(s.get(0, 1), 0.0);
        // Middle row: gy = (10 − 0) / 2 = 5.
        assert_relative_eq!(s.get(1, 1) as f64, 5.0f64.atan().to_degrees(), epsilon = 1e-4);
        assert_relative_eq!(s.get(1, 1), 78.690_07, epsilon = 1e-3);
        // Bottom row: flat along the row, backward difference (10 − 0) / 1 across it.
        let w = RowWindow::whole(&g.data, 3, 3);
        for c in 0..3 {
            let (gx, gy) = gradient(&w, 2, c, Spacing::new(1.0, 1.0));
            assert_eq!(gx, 0.0);
            assert_eq!(gy, 10.0);
        }
        assert_relative_eq!(s.get(2, 1) as f64, 10.0f64.atan().to_degrees(), epsilon = 1e-4);
    }

    #[test]
    fn single_row_grid_has_no_vertical_component() {
        let g = ElevationGrid::from_vec(
            vec![0.0, 1.0, 3.0, 6.0, 10.0],
            5,
            1,
            Spacing::new(1.0, 1.0),
            None,
        )
        .unwrap();
        let s = slope_of(&g);
        let expected = [1.0f64, 1.5, 2.5, 3.5, 4.0];
        for (c, gx) in expected.iter().enumerate() {
            assert_relative_eq!(s.get(0, c) as f64, gx.atan().to_degrees(), epsilon = 1e-4);
        }

        let one = slope_of(&ElevationGrid::new(1, 1, 1.0, 1.0, 42.0));
        assert_eq!(one.data, vec![0.0]);
    }

    #[test]
    fn rejects_bad_spacing_and_mask_shape() {
        let mut g = ElevationGrid::flat(3, 3);
        g.y_spacing = 0.0;
        assert_eq!(
            compute_slope(&g, &ValidityMask::all_valid(3, 3)).unwrap_err(),
            SlopeError::InvalidSpacing { x: 1.0, y: 0.0 }
        );

        let g = ElevationGrid::flat(3, 3);
        assert!(matches!(
            compute_slope(&g, &ValidityMask::all_valid(3, 2)),
            Err(SlopeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn cells_beside_a_nan_gap_have_no_slope() {
        let g = ElevationGrid::from_vec(
            vec![f32::NAN, 100.0, 100.0, 100.0],
            4,
            1,
            Spacing::new(1.0, 1.0),
            None,
        )
        .unwrap();
        let mask = ValidityMask::from_grid(&g);
        let s = compute_slope(&g, &mask).unwrap();

        assert!(s.is_missing(0, 0));
        // Valid, but its centred difference reaches the NaN sample.
        assert!(!mask.is_invalid(0, 1));
        assert!(s.is_missing(0, 1));
        assert_eq!(s.get(0, 2), 0.0);
        assert_eq!(s.get(0, 3), 0.0);

        let summary = SlopeSummary::from_grid(&s);
        assert_eq!(summary.valid_cells, 2);
        assert_eq!(summary.missing_cells, 2);
        assert_eq!(summary.max_deg, 0.0);
        assert_eq!(summary.mean_deg, 0.0);

        // The classifier puts such a cell in the top class.
        let classes = crate::classify::classify(&s, &mask, &crate::ClassScheme::default()).unwrap();
        assert_eq!(classes.data, vec![0, 4, 0, 0]);
    }

    #[test]
    fn cells_beside_a_sentinel_use_its_raw_value() {
        let mut g = ElevationGrid::flat(3, 1).with_no_data(-9999.0);
        g.set(0, 0, -9999.0);
        let mask = ValidityMask::from_grid(&g);
        let s = compute_slope(&g, &mask).unwrap();

        assert!(s.is_missing(0, 0));
        // gx = (0 − (−9999)) / 2: steep but finite, clamped below 90.
        let v = s.get(0, 1);
        assert!(v.is_finite() && v < 90.0);
        assert_relative_eq!(v as f64, 4999.5f64.atan().to_degrees(), epsilon = 1e-4);
        assert_eq!(s.get(0, 2), 0.0);
    }

    #[test]
    fn summary_ignores_missing_cells() {
        let g = ramp(4, 3, 1.0).with_no_data(3.0);
        let s = slope_of(&g);
        let summary = SlopeSummary::from_grid(&s);
        assert_eq!(summary.missing_cells, 3);
        assert_eq!(summary.valid_cells, 9);
        assert_relative_eq!(summary.min_deg, 45.0, epsilon = 1e-4);
        assert_relative_eq!(summary.max_deg, 45.0, epsilon = 1e-4);
        assert_relative_eq!(summary.mean_deg, 45.0, epsilon = 1e-4);

        let empty = SlopeSummary::from_grid(&SlopeGrid {
            data: vec![f32::NAN; 2],
            width: 2,
            height: 1,
            x_spacing: 1.0,
            y_spacing: 1.0,
        });
        assert_eq!(empty.valid_cells, 0);
        assert!(empty.mean_deg.is_nan());
    }
}
