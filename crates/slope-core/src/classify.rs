//! Steepness classes from slope degrees.
//!
//! Right-open bins over an ordered threshold list: a slope gets the index of
//! the first threshold strictly greater than it, so a value equal to a
//! threshold lands in the upper bin. With `[5, 15, 30, 45]`:
//! ```text
//!   [0, 5) → 0   [5, 15) → 1   [15, 30) → 2   [30, 45) → 3   [45, 90) → 4
//! ```
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlopeError};
use crate::grid::{check_dims, ClassGrid, SlopeGrid};
use crate::mask::ValidityMask;

/// Value written to cells without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataClass {
    /// Shares 0 with the flattest class; readers must consult the mask to
    /// tell the two apart.
    #[default]
    Zero,
    /// 255, outside every valid class.
    OutOfBand,
}

impl NoDataClass {
    pub fn value(self) -> u8 {
        match self {
            NoDataClass::Zero => 0,
            NoDataClass::OutOfBand => u8::MAX,
        }
    }
}

/// Validated classification scheme: thresholds, optional display names and
/// the no-data class policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScheme {
    thresholds: Vec<f64>,
    names: Vec<String>,
    no_data: NoDataClass,
}

impl ClassScheme {
    /// Build a scheme from boundaries that must be strictly increasing.
    /// Checked here, before any cell is touched.
    pub fn new(thresholds: Vec<f64>) -> Result<Self> {
        // Class values 0..=len must leave 255 free for `NoDataClass::OutOfBand`.
        if thresholds.len() >= u8::MAX as usize {
            return Err(SlopeError::TooManyClasses { count: thresholds.len() });
        }
        let mut prev = f64::NEG_INFINITY;
        for (index, &next) in thresholds.iter().enumerate() {
            if !(next > prev) {
                return Err(SlopeError::UnsortedThresholds { index, prev, next });
            }
            prev = next;
        }
        Ok(Self {
            thresholds,
            names: Vec::new(),
            no_data: NoDataClass::default(),
        })
    }

    /// Attach one display name per class. An empty list clears them.
    pub fn with_names(mut self, names: Vec<String>) -> Result<Self> {
        if !names.is_empty() && names.len() != self.class_count() {
            return Err(SlopeError::ClassNameCount {
                names: names.len(),
                classes: self.class_count(),
            });
        }
        self.names = names;
        Ok(self)
    }

    pub fn with_no_data_class(mut self, no_data: NoDataClass) -> Self {
        self.no_data = no_data;
        self
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn class_count(&self) -> usize {
        self.thresholds.len() + 1
    }

    pub fn no_data_class(&self) -> u8 {
        self.no_data.value()
    }

    /// Class of a single valid slope value.
    ///
    /// NaN compares below no threshold and lands in the top class.
    #[inline]
    pub fn class_of(&self, slope_deg: f32) -> u8 {
        let s = slope_deg as f64;
        self.thresholds
            .iter()
            .position(|&t| s < t)
            .unwrap_or(self.thresholds.len()) as u8
    }

    /// Human-readable label per class, e.g. `Gentle (5-15°)` or `45°+`.
    ///
    /// The bottom class reads `0-t°` when its upper bound is positive and
    /// `<t°` otherwise.
    pub fn labels(&self) -> Vec<String> {
        (0..self.class_count())
            .map(|i| {
                let lower = if i == 0 { 0.0 } else { self.thresholds[i - 1] };
                let range = match self.thresholds.get(i) {
                    Some(&upper) if i == 0 && upper <= 0.0 => format!("<{}°", fmt_deg(upper)),
                    Some(&upper) => format!("{}-{}°", fmt_deg(lower), fmt_deg(upper)),
                    None => format!("{}°+", fmt_deg(lower)),
                };
                match self.names.get(i) {
                    Some(name) => format!("{name} ({range})"),
                    None => range,
                }
            })
            .collect()
    }
}

impl Default for ClassScheme {
    fn default() -> Self {
        Self {
            thresholds: vec![5.0, 15.0, 30.0, 45.0],
            names: ["Flat", "Gentle", "Moderate", "Steep", "Very steep"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            no_data: NoDataClass::Zero,
        }
    }
}

fn fmt_deg(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

/// Classify row-major slope values; `mask` has the same length.
pub(crate) fn classify_cells(slope: &[f32], mask: &[bool], scheme: &ClassScheme) -> Vec<u8> {
    let no_data = scheme.no_data_class();
    slope
        .iter()
        .zip(mask)
        .map(|(&s, &invalid)| if invalid { no_data } else { scheme.class_of(s) })
        .collect()
}

/// Map every cell of `slope` to its class. Masked cells get the scheme's
/// no-data class.
pub fn classify(slope: &SlopeGrid, mask: &ValidityMask, scheme: &ClassScheme) -> Result<ClassGrid> {
    check_dims(slope.width, slope.height, slope.data.len())?;
    mask.ensure_shape(slope.shape())?;

    Ok(ClassGrid {
        data: classify_cells(&slope.data, &mask.data, scheme),
        width: slope.width,
        height: slope.height,
        x_spacing: slope.x_spacing,
        y_spacing: slope.y_spacing,
        no_data_class: scheme.no_data_class(),
    })
}

/// Pixel count per class over valid cells only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDistribution {
    pub counts: Vec<u64>,
    pub valid_cells: u64,
}

impl ClassDistribution {
    pub fn new(class_count: usize) -> Self {
        Self {
            counts: vec![0; class_count],
            valid_cells: 0,
        }
    }

    pub fn from_grid(classes: &ClassGrid, mask: &ValidityMask, scheme: &ClassScheme) -> Result<Self> {
        mask.ensure_shape(classes.shape())?;
        let mut dist = Self::new(scheme.class_count());
        dist.push(&classes.data, &mask.data);
        Ok(dist)
    }

    pub(crate) fn push(&mut self, classes: &[u8], mask: &[bool]) {
        for (&class, &invalid) in classes.iter().zip(mask) {
            if invalid {
                continue;
            }
            if let Some(count) = self.counts.get_mut(class as usize) {
                *count += 1;
            }
            self.valid_cells += 1;
        }
    }

    /// Share of valid cells in `class`, 0–100. 0 when no cell is valid.
    pub fn percent(&self, class: usize) -> f64 {
        if self.valid_cells == 0 {
            return 0.0;
        }
        let count = self.counts.get(class).copied().unwrap_or(0);
        100.0 * count as f64 / self.valid_cells as f64
    }

    pub fn percentages(&self) -> Vec<f64> {
        (0..self.counts.len()).map(|c| self.percent(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn slope_grid(data: Vec<f32>, width: usize) -> SlopeGrid {
        let height = data.len() / width;
        SlopeGrid { data, width, height, x_spacing: 1.0, y_spacing: 1.0 }
    }

    #[test]
    fn bin_boundaries_fall_into_upper_bin() {
        let s = ClassScheme::default();
        assert_eq!(s.class_of(0.0), 0);
        assert_eq!(s.class_of(4.999), 0);
        assert_eq!(s.class_of(5.0), 1);
        assert_eq!(s.class_of(14.999), 1);
        assert_eq!(s.class_of(15.0), 2);
        assert_eq!(s.class_of(29.99), 2);
        assert_eq!(s.class_of(30.0), 3);
        assert_eq!(s.class_of(44.9), 3);
        assert_eq!(s.class_of(45.0), 4);
        assert_eq!(s.class_of(89.9), 4);
    }

    #[test]
    fn nan_slope_in_valid_cell_gets_top_class() {
        assert_eq!(ClassScheme::default().class_of(f32::NAN), 4);
    }

    #[test]
    fn custom_thresholds_set_class_count() {
        let s = ClassScheme::new(vec![10.0, 20.0]).unwrap();
        assert_eq!(s.class_count(), 3);
        assert_eq!(s.class_of(9.0), 0);
        assert_eq!(s.class_of(10.0), 1);
        assert_eq!(s.class_of(25.0), 2);

        let single = ClassScheme::new(vec![]).unwrap();
        assert_eq!(single.class_count(), 1);
        assert_eq!(single.class_of(60.0), 0);
    }

    #[test]
    fn unsorted_thresholds_are_rejected() {
        assert_eq!(
            ClassScheme::new(vec![5.0, 15.0, 15.0, 45.0]),
            Err(SlopeError::UnsortedThresholds { index: 2, prev: 15.0, next: 15.0 })
        );
        assert!(matches!(
            ClassScheme::new(vec![30.0, 5.0]),
            Err(SlopeError::UnsortedThresholds { index: 1, .. })
        ));
        assert!(ClassScheme::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn too_many_thresholds_are_rejected() {
        let many: Vec<f64> = (0..255).map(|i| i as f64 * 0.1).collect();
        assert_eq!(
            ClassScheme::new(many),
            Err(SlopeError::TooManyClasses { count: 255 })
        );
        let most: Vec<f64> = (0..254).map(|i| i as f64 * 0.1).collect();
        assert!(ClassScheme::new(most).is_ok());
    }

    #[test]
    fn masked_cells_take_no_data_class() {
        let slope = slope_grid(vec![2.0, 20.0, f32::NAN, 50.0], 2);
        let mask = ValidityMask::from_vec(vec![false, false, true, true], 2, 2).unwrap();

        let shared = classify(&slope, &mask, &ClassScheme::default()).unwrap();
        assert_eq!(shared.data, vec![0, 2, 0, 0]);
        assert_eq!(shared.no_data_class, 0);

        let scheme = ClassScheme::default().with_no_data_class(NoDataClass::OutOfBand);
        let distinct = classify(&slope, &mask, &scheme).unwrap();
        assert_eq!(distinct.data, vec![0, 2, 255, 255]);
        assert_eq!(distinct.no_data_class, 255);
        assert_eq!(distinct.shape(), (2, 2));
    }

    #[test]
    fn classify_rejects_mismatched_mask() {
        let slope = slope_grid(vec![0.0; 6], 3);
        let mask = ValidityMask::all_valid(2, 3);
        assert!(matches!(
            classify(&slope, &mask, &ClassScheme::default()),
            Err(SlopeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn distribution_counts_valid_cells_only() {
        let slope = slope_grid(vec![1.0, 2.0, 7.0, 16.0, 31.0, 46.0, 0.0, 0.0], 4);
        let mask = ValidityMask::from_vec(
            vec![false, false, false, false, false, false, true, true],
            4,
            2,
        )
        .unwrap();
        let scheme = ClassScheme::default();
        let classes = classify(&slope, &mask, &scheme).unwrap();
        let dist = ClassDistribution::from_grid(&classes, &mask, &scheme).unwrap();

        assert_eq!(dist.counts, vec![2, 1, 1, 1, 1]);
        assert_eq!(dist.valid_cells, 6);
        assert_relative_eq!(dist.percent(0), 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(dist.percentages().iter().sum::<f64>(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn labels_combine_names_and_ranges() {
        let labels = ClassScheme::default().labels();
        assert_eq!(
            labels,
            vec![
                "Flat (0-5°)",
                "Gentle (5-15°)",
                "Moderate (15-30°)",
                "Steep (30-45°)",
                "Very steep (45°+)",
            ]
        );

        let plain = ClassScheme::new(vec![2.5]).unwrap().labels();
        assert_eq!(plain, vec!["0-2.5°", "2.5°+"]);
    }

    #[test]
    fn labels_with_non_positive_first_threshold() {
        let labels = ClassScheme::new(vec![-5.0, 10.0]).unwrap().labels();
        assert_eq!(labels, vec!["<-5°", "-5-10°", "10°+"]);
        assert!(labels.iter().all(|l| !l.contains("--")));

        let zero = ClassScheme::new(vec![0.0, 5.0]).unwrap().labels();
        assert_eq!(zero, vec!["<0°", "0-5°", "5°+"]);
    }

    #[test]
    fn names_must_match_class_count() {
        let err = ClassScheme::new(vec![10.0])
            .unwrap()
            .with_names(vec!["a".into(), "b".into(), "c".into()])
            .unwrap_err();
        assert_eq!(err, SlopeError::ClassNameCount { names: 3, classes: 2 });
    }
}
