/// Slope and slope-class derivation for a DEM stored as grid JSON.
///
/// Reads `data_out/dem.json` and writes, next to it:
///   dem_slope_deg.json      slope in degrees (f32, null = no data)
///   dem_slope_classes.json  class per cell (u8, 0 = flat … 4 = very steep)
/// Optional settings come from `data_out/slope_config.json`. Takes no flags;
/// exits 1 when the DEM cannot be loaded.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use slope_core::{
    ElevationGrid, GridMeta, LogObserver, MemorySink, MemorySource, SlopeConfig, SlopePipeline,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

// ── Constants ────────────────────────────────────────────────────────────────

const DATA_DIR: &str = "data_out";
const DEM_FILE: &str = "dem.json";
const CONFIG_FILE: &str = "slope_config.json";

// ── Helpers ──────────────────────────────────────────────────────────────────

fn setup_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .without_time()
        .finish();
    // A subscriber already installed (e.g. by a test harness) is fine.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// `<dir>/<stem>_slope_deg.json` and `<dir>/<stem>_slope_classes.json`.
fn output_paths(dem_path: &Path) -> (PathBuf, PathBuf) {
    let stem = dem_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dem");
    let dir = dem_path.parent().unwrap_or_else(|| Path::new("."));
    (
        dir.join(format!("{stem}_slope_deg.json")),
        dir.join(format!("{stem}_slope_classes.json")),
    )
}

fn load_config(path: &Path) -> Result<SlopeConfig> {
    if !path.exists() {
        return Ok(SlopeConfig::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    SlopeConfig::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn parse_dem(text: &str) -> Result<ElevationGrid> {
    let dem: ElevationGrid = serde_json::from_str(text).context("Failed to parse DEM JSON")?;
    dem.validate()?;
    Ok(dem)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    fs::write(path, json).with_context(|| format!("Write failed: {}", path.display()))
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    setup_logging();

    let data_dir = Path::new(DATA_DIR);
    let dem_path = data_dir.join(DEM_FILE);
    let (slope_path, class_path) = output_paths(&dem_path);

    if !dem_path.exists() {
        error!("DEM not found at {}", dem_path.display());
        error!("Export an elevation grid as JSON (data, width, height, x_spacing, y_spacing, no_data_value) to that path.");
        bail!("DEM not found at {}", dem_path.display());
    }

    info!("{}", "=".repeat(60));
    info!("DEM Slope Processing");
    info!("{}", "=".repeat(60));

    let config = load_config(&data_dir.join(CONFIG_FILE))?;
    let pipeline = SlopePipeline::from_config(&config)?;

    info!("Reading DEM: {}", dem_path.display());
    let text = fs::read_to_string(&dem_path)
        .with_context(|| format!("Cannot read {}", dem_path.display()))?;
    let dem = parse_dem(&text).with_context(|| format!("Cannot load {}", dem_path.display()))?;
    info!("  Shape: ({}, {})", dem.height, dem.width);
    info!("  Pixel size: {:.2} × {:.2}", dem.x_spacing, dem.y_spacing);
    if let Some(nd) = dem.no_data_value {
        info!("  No-data value: {nd}");
    }

    let (slope, classes) = match config.band_rows()? {
        None => {
            let out = pipeline.run(&dem, None, &LogObserver)?;
            (out.slope, out.classes)
        }
        Some(band_rows) => {
            info!("  Processing in bands of {band_rows} rows");
            let mut source = MemorySource::new(&dem);
            let mut sink = MemorySink::new(GridMeta::of(&dem), pipeline.scheme());
            pipeline.run_banded(&mut source, &mut sink, band_rows, &LogObserver)?;
            sink.into_grids()
        }
    };

    info!("Writing slope grid: {}", slope_path.display());
    write_json(&slope_path, &slope)?;
    info!("Writing slope class grid: {} (no-data class {})", class_path.display(), classes.no_data_class);
    write_json(&class_path, &classes)?;

    info!("{}", "=".repeat(60));
    info!("COMPLETE");
    info!("{}", "=".repeat(60));
    info!("Output files:");
    info!("  {}", slope_path.display());
    info!("  {}", class_path.display());

    Ok(())
}
