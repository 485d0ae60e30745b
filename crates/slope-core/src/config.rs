use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classify::{ClassScheme, NoDataClass};
use crate::error::SlopeError;

/// User-facing slope/classification settings.
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeConfig {
    /// Strictly increasing class boundaries in degrees. Default 5/15/30/45.
    pub thresholds: Vec<f64>,
    /// One name per class (`thresholds.len() + 1`), or empty for range-only
    /// labels. Replace these when changing the number of thresholds.
    pub class_names: Vec<String>,
    /// Value written to no-data cells in the class grid.
    pub no_data_class: NoDataClass,
    /// Rows per band for bounded-memory processing; `None` = whole grid.
    pub band_rows: Option<usize>,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![5.0, 15.0, 30.0, 45.0],
            class_names: vec![
                "Flat".into(),
                "Gentle".into(),
                "Moderate".into(),
                "Steep".into(),
                "Very steep".into(),
            ],
            no_data_class: NoDataClass::Zero,
            band_rows: None,
        }
    }
}

impl SlopeConfig {
    /// Parse a JSON config document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse slope config")
    }

    /// Validate into a [`ClassScheme`].
    pub fn scheme(&self) -> std::result::Result<ClassScheme, SlopeError> {
        Ok(ClassScheme::new(self.thresholds.clone())?
            .with_names(self.class_names.clone())?
            .with_no_data_class(self.no_data_class))
    }

    /// Validated band height, if banding is configured.
    pub fn band_rows(&self) -> std::result::Result<Option<usize>, SlopeError> {
        match self.band_rows {
            Some(0) => Err(SlopeError::InvalidBandRows),
            other => Ok(other),
        }
    }
}
