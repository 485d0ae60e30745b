//! Progress reporting hooks for the pipeline.
//!
//! The compute functions never report anything themselves; the pipeline calls
//! an injected observer between stages and after each band.

use tracing::info;

use crate::classify::{ClassDistribution, ClassScheme};
use crate::slope::SlopeSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Mask,
    Slope,
    Classify,
}

/// All hooks default to no-ops.
pub trait ProgressObserver {
    fn stage_started(&self, _stage: Stage) {}

    fn mask_ready(&self, _invalid_cells: usize, _total_cells: usize) {}

    /// `rows_done` of `rows_total` rows have been written.
    fn band_completed(&self, _rows_done: usize, _rows_total: usize) {}

    fn slope_ready(&self, _summary: &SlopeSummary) {}

    fn classes_ready(&self, _distribution: &ClassDistribution, _scheme: &ClassScheme) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {}

/// Observer that reports through `tracing` at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn stage_started(&self, stage: Stage) {
        match stage {
            Stage::Mask => info!("Deriving no-data mask..."),
            Stage::Slope => info!("Computing slope..."),
            Stage::Classify => info!("Classifying slope into categories..."),
        }
    }

    fn mask_ready(&self, invalid_cells: usize, total_cells: usize) {
        let pct = if total_cells == 0 {
            0.0
        } else {
            100.0 * invalid_cells as f64 / total_cells as f64
        };
        info!("  No-data pixels: {invalid_cells} ({pct:.1}%)");
    }

    fn band_completed(&self, rows_done: usize, rows_total: usize) {
        info!("  Rows {rows_done}/{rows_total}");
    }

    fn slope_ready(&self, summary: &SlopeSummary) {
        info!(
            "  Slope range: {:.2}° - {:.2}°",
            summary.min_deg, summary.max_deg
        );
        info!("  Mean slope: {:.2}°", summary.mean_deg);
    }

    fn classes_ready(&self, distribution: &ClassDistribution, scheme: &ClassScheme) {
        info!("  Classes:");
        for (i, label) in scheme.labels().iter().enumerate() {
            info!("    {i}: {label}");
        }
        info!("  Class distribution:");
        for (i, &count) in distribution.counts.iter().enumerate() {
            info!(
                "    Class {i}: {count} pixels ({:.1}%)",
                distribution.percent(i)
            );
        }
    }
}
