//! Terrain slope and steepness classes from a DEM.
//!
//! Flow: [`ValidityMask`] → [`compute_slope`] → [`classify`], orchestrated by
//! [`SlopePipeline`] either over a grid in memory or band by band through the
//! [`GridSource`]/[`GridSink`] seams.

pub mod classify;
pub mod config;
pub mod error;
mod gradient;
pub mod grid;
pub mod io;
pub mod mask;
mod maybe_rayon;
pub mod observer;
pub mod pipeline;
pub mod slope;

pub use classify::{classify, ClassDistribution, ClassScheme, NoDataClass};
pub use config::SlopeConfig;
pub use error::{Result, SlopeError};
pub use grid::{ClassGrid, ElevationGrid, SlopeGrid, Spacing};
pub use io::{GridMeta, GridSink, GridSource, MemorySink, MemorySource};
pub use mask::ValidityMask;
pub use observer::{LogObserver, NullObserver, ProgressObserver, Stage};
pub use pipeline::{RunSummary, SlopePipeline, SlopeProducts};
pub use slope::{compute_slope, SlopeSummary};
