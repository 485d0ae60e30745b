//! Pipeline orchestrator: mask → slope → classes, whole-grid or banded.

use anyhow::{ensure, Context};
use serde::Serialize;

use crate::classify::{classify, classify_cells, ClassDistribution, ClassScheme};
use crate::config::SlopeConfig;
use crate::error::{Result, SlopeError};
use crate::gradient::RowWindow;
use crate::grid::{ClassGrid, ElevationGrid, SlopeGrid};
use crate::io::{GridSink, GridSource};
use crate::mask::{invalid_cells, ValidityMask};
use crate::observer::{ProgressObserver, Stage};
use crate::slope::{compute_slope, slope_rows, SlopeAccumulator, SlopeSummary};

/// Everything one whole-grid run produces.
#[derive(Debug)]
pub struct SlopeProducts {
    pub mask: ValidityMask,
    pub slope: SlopeGrid,
    pub classes: ClassGrid,
    pub summary: SlopeSummary,
    pub distribution: ClassDistribution,
}

/// Statistics of a banded run; the grids themselves went to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub cols: usize,
    pub bands: usize,
    pub invalid_cells: usize,
    pub slope: SlopeSummary,
    pub distribution: ClassDistribution,
}

/// Runs the slope/classification stages with a fixed class scheme.
#[derive(Debug, Clone, Default)]
pub struct SlopePipeline {
    scheme: ClassScheme,
}

impl SlopePipeline {
    pub fn new(scheme: ClassScheme) -> Self {
        Self { scheme }
    }

    pub fn from_config(config: &SlopeConfig) -> Result<Self> {
        Ok(Self::new(config.scheme()?))
    }

    pub fn scheme(&self) -> &ClassScheme {
        &self.scheme
    }

    /// Process a grid held entirely in memory.
    ///
    /// Stage order:
    ///   1. Validation (spacing, dimensions)
    ///   2. No-data mask (`mask`, or derived from the grid)
    ///   3. Slope
    ///   4. Classification
    pub fn run(
        &self,
        grid: &ElevationGrid,
        mask: Option<&ValidityMask>,
        observer: &dyn ProgressObserver,
    ) -> Result<SlopeProducts> {
        // ── 1. Validation ───────────────────────────────────────────────────
        grid.validate()?;

        // ── 2. Mask ─────────────────────────────────────────────────────────
        observer.stage_started(Stage::Mask);
        let mask = match mask {
            Some(m) => {
                m.ensure_shape(grid.shape())?;
                m.clone()
            }
            None => ValidityMask::from_grid(grid),
        };
        observer.mask_ready(mask.invalid_count(), mask.data.len());

        // ── 3. Slope ────────────────────────────────────────────────────────
        observer.stage_started(Stage::Slope);
        let slope = compute_slope(grid, &mask)?;
        let summary = SlopeSummary::from_grid(&slope);
        observer.slope_ready(&summary);

        // ── 4. Classification ───────────────────────────────────────────────
        observer.stage_started(Stage::Classify);
        let classes = classify(&slope, &mask, &self.scheme)?;
        let distribution = ClassDistribution::from_grid(&classes, &mask, &self.scheme)?;
        observer.classes_ready(&distribution, &self.scheme);

        Ok(SlopeProducts { mask, slope, classes, summary, distribution })
    }

    /// Process `source` in bands of `band_rows` rows, handing each finished
    /// band to `sink`.
    ///
    /// Each band is read with one halo row above and below (clipped to the
    /// grid), so at most `band_rows + 2` elevation rows are held at a time.
    /// Output is bit-identical to [`SlopePipeline::run`].
    pub fn run_banded(
        &self,
        source: &mut dyn GridSource,
        sink: &mut dyn GridSink,
        band_rows: usize,
        observer: &dyn ProgressObserver,
    ) -> anyhow::Result<RunSummary> {
        let meta = source.meta();
        let spacing = meta.spacing.validate()?;
        if meta.width == 0 || meta.height == 0 {
            return Err(SlopeError::EmptyGrid { rows: meta.height, cols: meta.width }.into());
        }
        if band_rows == 0 {
            return Err(SlopeError::InvalidBandRows.into());
        }
        let (width, height) = (meta.width, meta.height);
        let cells = width
            .checked_mul(height)
            .ok_or(SlopeError::GridTooLarge { rows: height, cols: width })?;

        observer.stage_started(Stage::Slope);
        let mut acc = SlopeAccumulator::default();
        let mut distribution = ClassDistribution::new(self.scheme.class_count());
        let mut invalid_total = 0usize;
        let mut bands = 0usize;

        let mut start = 0usize;
        while start < height {
            let end = (start + band_rows).min(height);
            let halo_start = start.saturating_sub(1);
            let halo_end = (end + 1).min(height);

            let elevation = source
                .read_rows(halo_start, halo_end - halo_start)
                .with_context(|| format!("Reading rows {halo_start}..{halo_end}"))?;
            ensure!(
                elevation.len() == (halo_end - halo_start) * width,
                "source returned {} values for rows {halo_start}..{halo_end} of width {width}",
                elevation.len()
            );

            let mask = match source
                .read_mask_rows(start, end - start)
                .with_context(|| format!("Reading mask rows {start}..{end}"))?
            {
                Some(m) => {
                    ensure!(
                        m.len() == (end - start) * width,
                        "source returned {} mask flags for rows {start}..{end} of width {width}",
                        m.len()
                    );
                    m
                }
                None => {
                    let from = (start - halo_start) * width;
                    let to = (end - halo_start) * width;
                    invalid_cells(&elevation[from..to], meta.no_data_value)
                }
            };
            invalid_total += mask.iter().filter(|&&b| b).count();

            let window = RowWindow {
                data: &elevation,
                width,
                first_row: halo_start,
                total_rows: height,
            };
            let slope = slope_rows(&window, start..end, spacing, &mask);
            let classes = classify_cells(&slope, &mask, &self.scheme);

            acc.push(&slope);
            distribution.push(&classes, &mask);
            sink.write_rows(start, &slope, &classes)
                .with_context(|| format!("Writing rows {start}..{end}"))?;

            bands += 1;
            observer.band_completed(end, height);
            start = end;
        }

        sink.finish().context("Finishing output")?;

        let summary = acc.finish();
        observer.mask_ready(invalid_total, cells);
        observer.slope_ready(&summary);
        observer.classes_ready(&distribution, &self.scheme);

        Ok(RunSummary {
            rows: height,
            cols: width,
            bands,
            invalid_cells: invalid_total,
            slope: summary,
            distribution,
        })
    }
}
