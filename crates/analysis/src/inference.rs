//! Grid inference from projection profiles.
//!
//! Up to three strategies propose a grid, as allowed by the configured
//! [`DetectionMode`]:
//!
//! - Dark and light lines. For every spread factor, thin bands are matched
//!   against the positions an `N`-cell grid would put its separators at.
//!   The count whose expected positions best agree with the observed bands
//!   (Jaccard overlap) wins for that factor, and the factor whose winner
//!   scores the highest confidence wins for the axis.
//! - Edges. On sheets drawn without lines, a train of equally spaced
//!   brightness steps gives the cell period directly.
//!
//! The most confident proposal wins. Without one, the configured fallback
//! is returned.

use serde::{Deserialize, Serialize};
use sheetanim_common::config::{AnalysisSettings, DetectionMode, GridFallback};
use sheetanim_model::grid::GridHypothesis;
use sheetanim_model::profile::ProjectionProfile;
use sheetanim_model::source::SourceImage;

use crate::edges::{find_edges, periodic_train, Direction};
use crate::projection::{project, Projections};
use crate::scoring::{self, SubScores};
use crate::valleys::{find_bands, Band};

/// Scores closer than this are treated as equal.
const EPSILON: f64 = 1e-9;

/// Smallest distance (pixels) tolerated between an expected and an
/// observed separator, whatever the cell period.
const MIN_MATCH_TOLERANCE: f64 = 1.5;

/// Edges closer than `len / EDGE_GAP_DIVISOR` to the previous one are
/// dropped.
const EDGE_GAP_DIVISOR: usize = 20;

/// Grids tried by the size-guess fallback, as `(rows, cols)`.
const COMMON_GRIDS: &[(u32, u32)] = &[
    (2, 2),
    (3, 3),
    (4, 4),
    (5, 5),
    (6, 6),
    (7, 7),
    (8, 8),
    (2, 4),
    (4, 2),
    (3, 4),
    (4, 3),
    (4, 6),
    (6, 4),
    (4, 8),
    (8, 4),
    (3, 6),
    (6, 3),
    (5, 10),
    (10, 5),
    (2, 8),
    (8, 2),
    (3, 9),
    (9, 3),
    (4, 12),
    (12, 4),
];

/// Which evidence produced a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Separators darker than the cells.
    DarkLines,
    /// Separators brighter than the cells.
    LightLines,
    /// No separators; periodic brightness steps inside the cells.
    Edges,
    /// No usable evidence; grid guessed from the image dimensions.
    SizeGuess,
    /// No separators and no guess; the whole image is one frame.
    None,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DarkLines => "dark_lines",
            Self::LightLines => "light_lines",
            Self::Edges => "edges",
            Self::SizeGuess => "size_guess",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Dark,
    Light,
}

impl Polarity {
    fn method(self) -> DetectionMethod {
        match self {
            Self::Dark => DetectionMethod::DarkLines,
            Self::Light => DetectionMethod::LightLines,
        }
    }
}

/// Result of grid inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    pub hypothesis: GridHypothesis,
    pub method: DetectionMethod,

    /// Matched separator bands between frame rows, as `(start, end)` pixel
    /// ranges along y (end exclusive). One pixel wide for edges.
    pub horizontal_lines: Vec<(usize, usize)>,

    /// Matched separator bands between frame columns, along x.
    pub vertical_lines: Vec<(usize, usize)>,

    /// Sub-scores behind the confidence; `None` for fallbacks.
    pub scores: Option<SubScores>,
}

impl Inference {
    fn fallback(hypothesis: GridHypothesis, method: DetectionMethod) -> Self {
        Self {
            hypothesis,
            method,
            horizontal_lines: vec![],
            vertical_lines: vec![],
            scores: None,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.hypothesis.confidence
    }
}

/// Best cell count found along one axis.
#[derive(Debug, Clone)]
struct AxisFit {
    count: u32,
    matched: Vec<Band>,
    scores: SubScores,
    /// Selection key: Jaccard overlap for bands, confidence for edges.
    fit: f64,
}

/// Infers grid hypotheses from sprite sheet pixels.
#[derive(Debug, Clone, Default)]
pub struct GridInferencer {
    settings: AnalysisSettings,
}

impl GridInferencer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Project and infer in one step.
    pub fn analyze(&self, source: &SourceImage) -> Inference {
        self.infer(&project(source))
    }

    /// Infer the most plausible grid for the given profiles.
    ///
    /// Never fails. With no usable separators the configured fallback is
    /// returned with a low confidence.
    pub fn infer(&self, projections: &Projections) -> Inference {
        let min_cell = self.min_cell();
        if projections.width < min_cell || projections.height < min_cell {
            tracing::debug!(
                width = projections.width,
                height = projections.height,
                min_cell,
                "Image smaller than one cell, treating as a single frame"
            );
            return Inference::fallback(GridHypothesis::single(0.0), DetectionMethod::None);
        }

        let inference = match self.settings.mode {
            DetectionMode::Guess => self
                .size_guess(projections)
                .unwrap_or_else(|| self.single()),
            mode => self
                .detect(mode, projections)
                .unwrap_or_else(|| self.fallback(projections)),
        };
        tracing::info!(
            rows = inference.hypothesis.rows,
            cols = inference.hypothesis.cols,
            margin = inference.hypothesis.margin,
            confidence = inference.hypothesis.confidence,
            method = %inference.method,
            mode = ?self.settings.mode,
            "Inferred grid"
        );
        inference
    }

    fn min_cell(&self) -> u32 {
        self.settings.min_cell_size.max(1)
    }

    fn base_confidence(&self) -> f64 {
        self.settings.fallback_confidence.clamp(0.0, 1.0)
    }

    /// Most confident proposal of the strategies `mode` allows.
    fn detect(&self, mode: DetectionMode, projections: &Projections) -> Option<Inference> {
        let mut candidates = vec![];
        if matches!(mode, DetectionMode::Auto | DetectionMode::DarkLines) {
            candidates.push(self.infer_with(Polarity::Dark, projections));
        }
        if matches!(mode, DetectionMode::Auto | DetectionMode::LightLines) {
            candidates.push(self.infer_with(Polarity::Light, projections));
        }
        if matches!(mode, DetectionMode::Auto | DetectionMode::Edges) {
            candidates.push(self.infer_edges(projections));
        }

        let mut best: Option<Inference> = None;
        for candidate in candidates.into_iter().flatten() {
            let better = best
                .as_ref()
                .map_or(true, |b| candidate.confidence() > b.confidence() + EPSILON);
            if better {
                best = Some(candidate);
            }
        }
        best
    }

    fn infer_with(&self, polarity: Polarity, projections: &Projections) -> Option<Inference> {
        // Row profile dips are horizontal separators, which split frame rows.
        let rows = self.best_axis_fit(&projections.rows, polarity);
        let cols = self.best_axis_fit(&projections.columns, polarity);

        let (scores, factor) = match (&rows, &cols) {
            (Some(r), Some(c)) => (r.scores.average(&c.scores), 1.0),
            (Some(f), None) | (None, Some(f)) => {
                (f.scores, self.settings.single_axis_factor.clamp(0.0, 1.0))
            }
            (None, None) => return None,
        };
        let confidence = (scores.confidence(&self.settings.weights) * factor).clamp(0.0, 1.0);

        let row_count = rows.as_ref().map_or(1, |f| f.count);
        let col_count = cols.as_ref().map_or(1, |f| f.count);

        let widths: Vec<usize> = rows
            .iter()
            .chain(cols.iter())
            .flat_map(|f| f.matched.iter().map(Band::width))
            .collect();
        let line_width = if widths.is_empty() {
            0.0
        } else {
            widths.iter().sum::<usize>() as f64 / widths.len() as f64
        };

        let margin = margin_for(
            line_width,
            row_count,
            col_count,
            projections.width,
            projections.height,
        );

        tracing::debug!(
            ?polarity,
            rows = row_count,
            cols = col_count,
            confidence,
            regularity = scores.regularity,
            depth = scores.depth,
            coverage = scores.coverage,
            "Grid candidate"
        );

        Some(Inference {
            hypothesis: GridHypothesis {
                rows: row_count,
                cols: col_count,
                margin,
                line_width,
                confidence,
            },
            method: polarity.method(),
            horizontal_lines: spans(rows.as_ref()),
            vertical_lines: spans(cols.as_ref()),
            scores: Some(scores),
        })
    }

    fn best_axis_fit(&self, profile: &ProjectionProfile, polarity: Polarity) -> Option<AxisFit> {
        let profile = match polarity {
            Polarity::Dark => profile.clone(),
            Polarity::Light => profile.inverted(),
        };
        let level = profile.median();

        let mut best: Option<(AxisFit, f64)> = None;
        for &factor in &self.settings.spread_factors {
            let Some(fit) = self.fit_axis(&profile, level, factor) else {
                continue;
            };
            let confidence = fit.scores.confidence(&self.settings.weights);
            if best.as_ref().map_or(true, |(_, c)| confidence > c + EPSILON) {
                best = Some((fit, confidence));
            }
        }
        best.map(|(fit, _)| fit)
    }

    /// Pick the cell count whose expected separators best match the bands
    /// found at one spread factor.
    ///
    /// A band only counts for a grid when it is thin relative to that
    /// grid's period. Counts that explain too few of their separators, or
    /// whose separators barely dip below the profile level, are rejected.
    fn fit_axis(
        &self,
        profile: &ProjectionProfile,
        level: f64,
        spread_factor: f64,
    ) -> Option<AxisFit> {
        let len = profile.len();
        let max_count = len / self.min_cell() as usize;
        if max_count < 2 {
            return None;
        }

        let ratio = self.settings.max_line_width_ratio.max(0.0);
        // Two cells give the longest period and so the widest allowed band.
        let widest = ((len as f64 / 2.0 * ratio) as usize).max(1);
        let interior: Vec<Band> = find_bands(profile, spread_factor, widest)
            .into_iter()
            .filter(|b| !b.touches_edge(len))
            .collect();
        if interior.is_empty() {
            return None;
        }

        let mut best: Option<AxisFit> = None;
        for count in 2..=max_count {
            let period = len as f64 / count as f64;
            let max_width = ((period * ratio) as usize).max(1);
            let thin: Vec<Band> = interior
                .iter()
                .copied()
                .filter(|b| b.width() <= max_width)
                .collect();
            let matched = match_bands(&thin, count, len, self.settings.match_tolerance);
            if matched.is_empty() {
                continue;
            }

            let expected = count - 1;
            let hits = matched.len();
            let fit = hits as f64 / (expected + thin.len() - hits) as f64;

            let mut boundaries = Vec::with_capacity(hits + 2);
            boundaries.push(0.0);
            boundaries.extend(matched.iter().map(Band::center));
            boundaries.push(len as f64);
            let floors: Vec<f64> = matched.iter().map(|b| b.floor).collect();

            let scores = SubScores {
                regularity: scoring::regularity(&boundaries),
                depth: scoring::depth_contrast(level, &floors),
                coverage: scoring::coverage(hits, expected),
            };
            if scores.coverage + EPSILON < self.settings.min_coverage
                || scores.depth + EPSILON < self.settings.min_depth
            {
                continue;
            }

            let better = match &best {
                None => true,
                Some(b) if fit > b.fit + EPSILON => true,
                // Equal overlap: a finer grid only wins if it loses nothing.
                Some(b) => {
                    (fit - b.fit).abs() <= EPSILON
                        && scores.coverage + EPSILON >= b.scores.coverage
                        && scores.depth + EPSILON >= b.scores.depth
                }
            };
            if better {
                best = Some(AxisFit {
                    count: u32::try_from(count).unwrap_or(u32::MAX),
                    matched,
                    scores,
                    fit,
                });
            }
        }
        best
    }

    /// Grid from periodic brightness steps. Both axes must show a period.
    fn infer_edges(&self, projections: &Projections) -> Option<Inference> {
        let rows = self.edge_axis_fit(&projections.rows)?;
        let cols = self.edge_axis_fit(&projections.columns)?;

        let scores = rows.scores.average(&cols.scores);
        let factor = self.settings.edge_confidence_factor.clamp(0.0, 1.0);
        let confidence = (scores.confidence(&self.settings.weights) * factor).clamp(0.0, 1.0);

        tracing::debug!(
            rows = rows.count,
            cols = cols.count,
            confidence,
            regularity = scores.regularity,
            depth = scores.depth,
            coverage = scores.coverage,
            "Edge grid candidate"
        );

        Some(Inference {
            hypothesis: GridHypothesis {
                rows: rows.count,
                cols: cols.count,
                margin: 0,
                line_width: 0.0,
                confidence,
            },
            method: DetectionMethod::Edges,
            horizontal_lines: spans(Some(&rows)),
            vertical_lines: spans(Some(&cols)),
            scores: Some(scores),
        })
    }

    /// Most confident edge train over every strength and direction.
    fn edge_axis_fit(&self, profile: &ProjectionProfile) -> Option<AxisFit> {
        let len = profile.len();
        let min_cell = self.min_cell() as usize;
        let min_gap = (len / EDGE_GAP_DIVISOR).max(1);
        let peak = profile.values().iter().copied().fold(0.0, f64::max);

        let mut best: Option<AxisFit> = None;
        for &strength in &self.settings.edge_strengths {
            for direction in [Direction::Falling, Direction::Rising] {
                let edges = find_edges(profile, direction, strength, min_gap);
                let Some(train) = periodic_train(&edges, self.settings.edge_tolerance) else {
                    continue;
                };
                let count = (len as f64 / train.period).round() as usize;
                if count < 2 || len / count < min_cell {
                    continue;
                }

                let positions: Vec<f64> = train.edges.iter().map(|e| e.position as f64).collect();
                let steps: Vec<f64> = train.edges.iter().map(|e| e.strength).collect();
                let scores = SubScores {
                    regularity: scoring::regularity(&positions),
                    depth: scoring::step_contrast(peak, &steps),
                    coverage: scoring::coverage(train.edges.len(), count - 1),
                };
                if scores.coverage + EPSILON < self.settings.min_coverage {
                    continue;
                }

                let confidence = scores.confidence(&self.settings.weights);
                if best.as_ref().map_or(true, |b| confidence > b.fit + EPSILON) {
                    let matched = train
                        .edges
                        .iter()
                        .map(|e| Band {
                            start: e.position,
                            end: e.position + 1,
                            floor: profile.values()[e.position],
                        })
                        .collect();
                    best = Some(AxisFit {
                        count: u32::try_from(count).unwrap_or(u32::MAX),
                        matched,
                        scores,
                        fit: confidence,
                    });
                }
            }
        }
        best
    }

    fn fallback(&self, projections: &Projections) -> Inference {
        if self.settings.fallback == GridFallback::SizeGuess {
            if let Some(guess) = self.size_guess(projections) {
                return guess;
            }
        }
        tracing::debug!("No separators, treating as a single frame");
        self.single()
    }

    fn single(&self) -> Inference {
        Inference::fallback(
            GridHypothesis::single(self.base_confidence()),
            DetectionMethod::None,
        )
    }

    fn size_guess(&self, projections: &Projections) -> Option<Inference> {
        let (rows, cols, score) =
            guess_from_size(projections.width, projections.height, self.min_cell())?;
        tracing::debug!(rows, cols, score, "Guessing grid from image size");
        let hypothesis = GridHypothesis {
            rows,
            cols,
            margin: 0,
            line_width: 0.0,
            confidence: (self.base_confidence() * score).clamp(0.0, 1.0),
        };
        Some(Inference::fallback(hypothesis, DetectionMethod::SizeGuess))
    }
}

/// For each expected separator of a `count`-cell axis, the nearest band
/// within tolerance. Each band matches at most once.
fn match_bands(interior: &[Band], count: usize, len: usize, tolerance_ratio: f64) -> Vec<Band> {
    let period = len as f64 / count as f64;
    let tolerance = (tolerance_ratio * period).max(MIN_MATCH_TOLERANCE);

    let mut matched: Vec<Band> = vec![];
    let mut last_used: Option<usize> = None;
    for j in 1..count {
        let expected = j as f64 * period;
        let nearest = interior
            .iter()
            .enumerate()
            .filter(|(i, _)| last_used.map_or(true, |used| *i > used))
            .map(|(i, b)| (i, (b.center() - expected).abs()))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((i, distance)) = nearest {
            if distance <= tolerance {
                matched.push(interior[i]);
                last_used = Some(i);
            }
        }
    }
    matched
}

/// Half the separator width, rounded, kept strictly below half a cell.
fn margin_for(line_width: f64, rows: u32, cols: u32, width: u32, height: u32) -> i32 {
    if line_width <= 0.0 {
        return 0;
    }
    let cell = (width / cols.max(1)).min(height / rows.max(1));
    let largest_legal = (i64::from(cell) - 1).max(0) / 2;
    let margin = ((line_width / 2.0).round() as i64).min(largest_legal);
    i32::try_from(margin).unwrap_or(0)
}

fn spans(fit: Option<&AxisFit>) -> Vec<(usize, usize)> {
    fit.map(|f| f.matched.iter().map(|b| (b.start, b.end)).collect())
        .unwrap_or_default()
}

/// Best common grid for an image of this size, with a score in `[0, 1]`.
///
/// Candidates need roughly square cells (aspect within 1:2) of at least
/// `min_cell` pixels. Grids that divide the image exactly score 1; ties
/// go to squarer cells, then to fewer frames.
fn guess_from_size(width: u32, height: u32, min_cell: u32) -> Option<(u32, u32, f64)> {
    let mut best: Option<(u32, u32, f64, f64)> = None;
    for &(rows, cols) in COMMON_GRIDS {
        let cell_w = f64::from(width) / f64::from(cols);
        let cell_h = f64::from(height) / f64::from(rows);
        if cell_w < f64::from(min_cell) || cell_h < f64::from(min_cell) {
            continue;
        }
        let ratio = cell_w / cell_h;
        if !(0.5..=2.0).contains(&ratio) {
            continue;
        }

        let w_rem = f64::from(width % cols) / cell_w;
        let h_rem = f64::from(height % rows) / cell_h;
        let score = (1.0 - (w_rem + h_rem) / 2.0).clamp(0.0, 1.0);
        let skew = ratio.ln().abs();

        let better = match best {
            None => true,
            Some((r, c, s, k)) => {
                if (score - s).abs() > EPSILON {
                    score > s
                } else if (skew - k).abs() > EPSILON {
                    skew < k
                } else {
                    rows * cols < r * c
                }
            }
        };
        if better {
            best = Some((rows, cols, score, skew));
        }
    }
    best.map(|(r, c, s, _)| (r, c, s))
}
