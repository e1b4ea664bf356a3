//! Brightness projection profiles.

use serde::{Deserialize, Serialize};

/// Which image axis a profile runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// One value per pixel row (index = y). Separators here split rows.
    Rows,
    /// One value per pixel column (index = x). Separators here split columns.
    Columns,
}

/// Mean 8-bit luminance of every row or column of an image.
///
/// Values lie in `[0.0, 255.0]`. Profiles are read-only and discarded
/// once inference finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionProfile {
    axis: Axis,
    values: Vec<f64>,
}

impl ProjectionProfile {
    pub fn new(axis: Axis, values: Vec<f64>) -> Self {
        Self { axis, values }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arithmetic mean, 0 for an empty profile.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f64 {
        if self.values.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .values
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / self.values.len() as f64;
        var.sqrt()
    }

    /// Median value, 0 for an empty profile.
    pub fn median(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Mirror the profile so bright bands become dark ones.
    pub fn inverted(&self) -> Self {
        Self {
            axis: self.axis,
            values: self.values.iter().map(|v| 255.0 - v).collect(),
        }
    }
}
