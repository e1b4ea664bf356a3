//! Separator candidates: runs of a profile that dip well below its mean.

use serde::{Deserialize, Serialize};
use sheetanim_model::profile::ProjectionProfile;

/// Profiles flatter than this (stddev, in luminance units) have no valleys.
const MIN_SPREAD: f64 = 0.5;

/// A contiguous run of profile samples below the valley threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// First sample in the run.
    pub start: usize,
    /// One past the last sample in the run.
    pub end: usize,
    /// Mean profile value inside the run.
    pub floor: f64,
}

impl Band {
    pub fn width(&self) -> usize {
        self.end - self.start
    }

    /// Midpoint in pixel-edge coordinates.
    pub fn center(&self) -> f64 {
        (self.start + self.end) as f64 / 2.0
    }

    /// Whether the run touches either end of a profile of length `len`.
    pub fn touches_edge(&self, len: usize) -> bool {
        self.start == 0 || self.end >= len
    }
}

/// Valley threshold for a profile: `mean - spread_factor * stddev`, or
/// `None` when the profile is too flat to contain separators.
pub fn valley_threshold(profile: &ProjectionProfile, spread_factor: f64) -> Option<f64> {
    if profile.len() < 3 {
        return None;
    }
    let spread = profile.std_dev();
    if spread < MIN_SPREAD {
        return None;
    }
    Some(profile.mean() - spread_factor * spread)
}

/// Find dark bands no wider than `max_width` samples.
///
/// Each band is a local minimum region of the profile whose samples all
/// lie strictly below the adaptive threshold.
pub fn find_bands(profile: &ProjectionProfile, spread_factor: f64, max_width: usize) -> Vec<Band> {
    let Some(threshold) = valley_threshold(profile, spread_factor) else {
        return vec![];
    };
    let values = profile.values();

    let mut bands = vec![];
    let mut start: Option<usize> = None;

    let close = |from: usize, to: usize, bands: &mut Vec<Band>| {
        let width = to - from;
        if width == 0 || width > max_width {
            return;
        }
        let floor = values[from..to].iter().sum::<f64>() / width as f64;
        bands.push(Band {
            start: from,
            end: to,
            floor,
        });
    };

    for (i, &v) in values.iter().enumerate() {
        match (v < threshold, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                close(s, i, &mut bands);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        close(s, values.len(), &mut bands);
    }

    bands
}
