//! Brightness transitions along a profile.
//!
//! Sheets drawn without separator lines still repeat: every cell steps
//! into its sprite at the same offset. A train of equally spaced steps of
//! one direction gives the cell period even when no band is thin enough
//! to count as a separator.

use std::collections::BTreeMap;

use sheetanim_model::profile::ProjectionProfile;

/// Gaps are bucketed to this many pixels before taking the most common.
const GAP_BUCKET: f64 = 5.0;

/// Sign of a brightness step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Profile gets darker.
    Falling,
    /// Profile gets brighter.
    Rising,
}

/// One step of the profile between sample `position - 1` and `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub position: usize,
    /// Absolute size of the step, in luminance units.
    pub strength: f64,
}

/// Edges spaced by one dominant period.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTrain {
    pub edges: Vec<Edge>,
    pub period: f64,
}

/// Steps of at least `min_strength` in `direction`. An edge closer than
/// `min_gap` samples to the previous kept edge is dropped.
pub fn find_edges(
    profile: &ProjectionProfile,
    direction: Direction,
    min_strength: f64,
    min_gap: usize,
) -> Vec<Edge> {
    let mut edges: Vec<Edge> = vec![];
    for (i, pair) in profile.values().windows(2).enumerate() {
        let step = pair[1] - pair[0];
        let signed = match direction {
            Direction::Falling => -step,
            Direction::Rising => step,
        };
        if signed < min_strength {
            continue;
        }
        let position = i + 1;
        if edges
            .last()
            .is_some_and(|last| position - last.position < min_gap)
        {
            continue;
        }
        edges.push(Edge {
            position,
            strength: signed,
        });
    }
    edges
}

/// The longest run of edges whose consecutive gaps stay within
/// `tolerance * period` of the most common gap.
///
/// Needs at least two edges. Ties between gap buckets go to the shorter
/// gap, ties between runs to the earliest.
pub fn periodic_train(edges: &[Edge], tolerance: f64) -> Option<EdgeTrain> {
    if edges.len() < 2 {
        return None;
    }

    let mut buckets: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
    for pair in edges.windows(2) {
        let gap = (pair[1].position - pair[0].position) as f64;
        let bucket = (gap / GAP_BUCKET).round() as u64;
        buckets.entry(bucket).or_default().push(gap);
    }
    let mut dominant: Option<&Vec<f64>> = None;
    for gaps in buckets.values() {
        if dominant.map_or(true, |d| gaps.len() > d.len()) {
            dominant = Some(gaps);
        }
    }
    let gaps = dominant?;
    let period = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if period <= 0.0 {
        return None;
    }

    let slack = tolerance.max(0.0) * period;
    let fits = |a: &Edge, b: &Edge| ((b.position - a.position) as f64 - period).abs() <= slack;

    let mut best: Vec<Edge> = vec![];
    for (start, first) in edges.iter().enumerate() {
        let mut run = vec![*first];
        for edge in &edges[start + 1..] {
            if run.last().is_some_and(|last| fits(last, edge)) {
                run.push(*edge);
            }
        }
        if run.len() > best.len() {
            best = run;
        }
    }

    (best.len() >= 2).then_some(EdgeTrain {
        edges: best,
        period,
    })
}
