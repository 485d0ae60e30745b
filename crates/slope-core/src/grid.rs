use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SlopeError};

/// Row-major f32 data; JSON `null` (how serde_json writes NaN) reads back as NaN.
fn null_as_nan_vec<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<f32>, D::Error> {
    let v: Vec<Option<f32>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f32::NAN)).collect())
}

/// Map-unit distance between adjacent columns (`x`) and rows (`y`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    pub x: f64,
    pub y: f64,
}

impl Spacing {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both spacings must be finite and strictly positive.
    pub fn validate(self) -> Result<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.x) && ok(self.y) {
            Ok(self)
        } else {
            Err(SlopeError::InvalidSpacing { x: self.x, y: self.y })
        }
    }
}

pub(crate) fn check_dims(width: usize, height: usize, len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(SlopeError::EmptyGrid { rows: height, cols: width });
    }
    let expected = width
        .checked_mul(height)
        .ok_or(SlopeError::GridTooLarge { rows: height, cols: width })?;
    if len != expected {
        return Err(SlopeError::DataLength {
            rows: height,
            cols: width,
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// A 2D DEM storing elevation samples as f32, row-major.
/// Row 0 is the first row delivered by the loader; columns run east-west.
/// Gradient math uses f64; elevation values use f32.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationGrid {
    /// Row-major elevation values.
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    /// Distance between adjacent columns, in map units.
    pub x_spacing: f64,
    /// Distance between adjacent rows, in map units.
    pub y_spacing: f64,
    /// Sentinel marking missing samples. When absent, NaN marks them.
    #[serde(default)]
    pub no_data_value: Option<f32>,
}

impl ElevationGrid {
    /// Create a new grid filled with the given value.
    pub fn new(width: usize, height: usize, x_spacing: f64, y_spacing: f64, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            x_spacing,
            y_spacing,
            no_data_value: None,
        }
    }

    /// Create a flat (zero-elevation) grid with unit spacing.
    pub fn flat(width: usize, height: usize) -> Self {
        Self::new(width, height, 1.0, 1.0, 0.0)
    }

    /// Wrap loader output, checking dimensions and spacing up front.
    pub fn from_vec(
        data: Vec<f32>,
        width: usize,
        height: usize,
        spacing: Spacing,
        no_data_value: Option<f32>,
    ) -> Result<Self> {
        check_dims(width, height, data.len())?;
        let spacing = spacing.validate()?;
        Ok(Self {
            data,
            width,
            height,
            x_spacing: spacing.x,
            y_spacing: spacing.y,
            no_data_value,
        })
    }

    pub fn with_no_data(mut self, value: f32) -> Self {
        self.no_data_value = Some(value);
        self
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn spacing(&self) -> Spacing {
        Spacing::new(self.x_spacing, self.y_spacing)
    }

    /// Dimension and spacing checks shared by every consumer of the grid.
    pub fn validate(&self) -> Result<()> {
        self.spacing().validate()?;
        check_dims(self.width, self.height, self.data.len())
    }

    pub fn min_elevation(&self) -> f32 {
        self.data.iter().cloned().fold(f32::INFINITY, f32::min)
    }

    pub fn max_elevation(&self) -> f32 {
        self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Slope angle in degrees, NaN where no data. Same shape and spacing as the
/// elevation grid it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlopeGrid {
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub x_spacing: f64,
    pub y_spacing: f64,
}

impl SlopeGrid {
    /// Marker written to cells without a slope.
    pub const MISSING: f32 = f32::NAN;

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_nan()
    }
}

/// Ordinal steepness class per cell. `no_data_class` is the value written to
/// masked cells; with the default scheme it coincides with class 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassGrid {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub x_spacing: f64,
    pub y_spacing: f64,
    pub no_data_class: u8,
}

impl ClassGrid {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.width + col]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}
