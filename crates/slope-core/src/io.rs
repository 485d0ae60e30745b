//! Loader and writer seams.
//!
//! Reading rasters from disk and writing them back are left to the caller;
//! the pipeline only needs row access on the way in and row delivery on the
//! way out. In-memory implementations live here too.

use anyhow::{bail, ensure, Result};

use crate::classify::ClassScheme;
use crate::grid::{ClassGrid, ElevationGrid, SlopeGrid, Spacing};
use crate::mask::ValidityMask;

/// Shape, spacing and no-data indicator of a source grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMeta {
    pub width: usize,
    pub height: usize,
    pub spacing: Spacing,
    pub no_data_value: Option<f32>,
}

impl GridMeta {
    pub fn of(grid: &ElevationGrid) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            spacing: grid.spacing(),
            no_data_value: grid.no_data_value,
        }
    }
}

/// Supplies elevation rows on demand.
pub trait GridSource {
    fn meta(&self) -> GridMeta;

    /// `count` full rows starting at row `start`, row-major.
    fn read_rows(&mut self, start: usize, count: usize) -> Result<Vec<f32>>;

    /// Explicit no-data flags for the same rows. `None` lets the pipeline
    /// derive them from the sentinel (or NaN).
    fn read_mask_rows(&mut self, _start: usize, _count: usize) -> Result<Option<Vec<bool>>> {
        Ok(None)
    }
}

/// Receives finished rows, in order, once per band.
pub trait GridSink {
    fn write_rows(&mut self, start: usize, slope: &[f32], classes: &[u8]) -> Result<()>;

    /// Called once after the last band.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Row source over a grid already in memory, with an optional explicit mask.
pub struct MemorySource<'a> {
    grid: &'a ElevationGrid,
    mask: Option<&'a ValidityMask>,
}

impl<'a> MemorySource<'a> {
    pub fn new(grid: &'a ElevationGrid) -> Self {
        Self { grid, mask: None }
    }

    pub fn with_mask(mut self, mask: &'a ValidityMask) -> Self {
        self.mask = Some(mask);
        self
    }

    fn span(&self, start: usize, count: usize) -> Result<std::ops::Range<usize>> {
        ensure!(
            start + count <= self.grid.height,
            "rows {}..{} out of range for a grid of {} rows",
            start,
            start + count,
            self.grid.height
        );
        let w = self.grid.width;
        Ok(start * w..(start + count) * w)
    }
}

impl GridSource for MemorySource<'_> {
    fn meta(&self) -> GridMeta {
        GridMeta::of(self.grid)
    }

    fn read_rows(&mut self, start: usize, count: usize) -> Result<Vec<f32>> {
        let span = self.span(start, count)?;
        match self.grid.data.get(span) {
            Some(rows) => Ok(rows.to_vec()),
            None => bail!("grid data shorter than its {}x{} shape", self.grid.height, self.grid.width),
        }
    }

    fn read_mask_rows(&mut self, start: usize, count: usize) -> Result<Option<Vec<bool>>> {
        let Some(mask) = self.mask else {
            return Ok(None);
        };
        ensure!(
            mask.shape() == self.grid.shape(),
            "mask is {}x{} but grid is {}x{}",
            mask.height,
            mask.width,
            self.grid.height,
            self.grid.width
        );
        let span = self.span(start, count)?;
        Ok(Some(mask.data[span].to_vec()))
    }
}

/// Sink that assembles the delivered rows back into whole grids.
pub struct MemorySink {
    meta: GridMeta,
    no_data_class: u8,
    slope: Vec<f32>,
    classes: Vec<u8>,
}

impl MemorySink {
    pub fn new(meta: GridMeta, scheme: &ClassScheme) -> Self {
        let cells = meta.width * meta.height;
        Self {
            meta,
            no_data_class: scheme.no_data_class(),
            slope: Vec::with_capacity(cells),
            classes: Vec::with_capacity(cells),
        }
    }

    /// Rows received so far.
    pub fn rows_written(&self) -> usize {
        if self.meta.width == 0 {
            0
        } else {
            self.slope.len() / self.meta.width
        }
    }

    pub fn into_grids(self) -> (SlopeGrid, ClassGrid) {
        let GridMeta { width, height, spacing, .. } = self.meta;
        let slope = SlopeGrid {
            data: self.slope,
            width,
            height,
            x_spacing: spacing.x,
            y_spacing: spacing.y,
        };
        let classes = ClassGrid {
            data: self.classes,
            width,
            height,
            x_spacing: spacing.x,
            y_spacing: spacing.y,
            no_data_class: self.no_data_class,
        };
        (slope, classes)
    }
}

impl GridSink for MemorySink {
    fn write_rows(&mut self, start: usize, slope: &[f32], classes: &[u8]) -> Result<()> {
        ensure!(
            start == self.rows_written(),
            "rows must arrive in order: got row {start}, expected {}",
            self.rows_written()
        );
        ensure!(
            self.meta.width > 0
                && slope.len() == classes.len()
                && slope.len() % self.meta.width == 0,
            "band of {} slope and {} class values is not whole rows of width {}",
            slope.len(),
            classes.len(),
            self.meta.width
        );
        self.slope.extend_from_slice(slope);
        self.classes.extend_from_slice(classes);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        ensure!(
            self.rows_written() == self.meta.height,
            "sink received {} of {} rows",
            self.rows_written(),
            self.meta.height
        );
        Ok(())
    }
}
