//! Confidence scoring.
//!
//! A grid candidate is judged on three named sub-scores, each in `[0, 1]`:
//!
//! - `regularity`: how evenly the separators (plus the image edges) divide
//!   the axis. 1 minus the coefficient of variation of the spacings.
//! - `depth`: how far the separator bands sit below the typical profile
//!   level, relative to that level.
//! - `coverage`: the fraction of expected separator positions that were
//!   actually observed.
//!
//! The final confidence is the weighted mean of the sub-scores. It is
//! non-decreasing in each of them for any non-negative weights.

use serde::{Deserialize, Serialize};
use sheetanim_common::config::ConfidenceWeights;

/// Per-candidate evidence, reported alongside the final confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub regularity: f64,
    pub depth: f64,
    pub coverage: f64,
}

impl SubScores {
    /// Element-wise mean of two axes' scores.
    pub fn average(&self, other: &SubScores) -> SubScores {
        SubScores {
            regularity: (self.regularity + other.regularity) / 2.0,
            depth: (self.depth + other.depth) / 2.0,
            coverage: (self.coverage + other.coverage) / 2.0,
        }
    }

    /// Combine into a single confidence using `weights`.
    pub fn confidence(&self, weights: &ConfidenceWeights) -> f64 {
        combine(weights, self)
    }
}

/// Regularity of a sorted list of boundary positions (edges included).
///
/// Fewer than two spacings carry no evidence of irregularity and score 1.
pub fn regularity(boundaries: &[f64]) -> f64 {
    let spacings: Vec<f64> = boundaries.windows(2).map(|w| w[1] - w[0]).collect();
    if spacings.len() < 2 {
        return 1.0;
    }
    let n = spacings.len() as f64;
    let mean = spacings.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = spacings.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
    (1.0 - var.sqrt() / mean).clamp(0.0, 1.0)
}

/// Mean relative depth of band floors below the profile `level`.
pub fn depth_contrast(level: f64, floors: &[f64]) -> f64 {
    if level <= 0.0 || floors.is_empty() {
        return 0.0;
    }
    let total: f64 = floors
        .iter()
        .map(|floor| ((level - floor) / level).clamp(0.0, 1.0))
        .sum();
    total / floors.len() as f64
}

/// Mean height of brightness steps relative to the brightest profile
/// level. Stands in for depth when the evidence is edges, not bands.
pub fn step_contrast(peak: f64, steps: &[f64]) -> f64 {
    if peak <= 0.0 || steps.is_empty() {
        return 0.0;
    }
    let total: f64 = steps.iter().map(|s| (s / peak).clamp(0.0, 1.0)).sum();
    total / steps.len() as f64
}

/// Fraction of `expected` separators that were found.
pub fn coverage(matched: usize, expected: usize) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    (matched as f64 / expected as f64).clamp(0.0, 1.0)
}

/// Weighted mean of the sub-scores.
///
/// Negative weights count as zero. If every weight is zero the three
/// sub-scores are averaged evenly.
pub fn combine(weights: &ConfidenceWeights, scores: &SubScores) -> f64 {
    let w = [
        weights.regularity.max(0.0),
        weights.depth.max(0.0),
        weights.coverage.max(0.0),
    ];
    let s = [scores.regularity, scores.depth, scores.coverage];
    let total: f64 = w.iter().sum();

    let value = if total > 0.0 {
        w.iter().zip(s).map(|(w, s)| w * s).sum::<f64>() / total
    } else {
        s.iter().sum::<f64>() / 3.0
    };
    value.clamp(0.0, 1.0)
}
