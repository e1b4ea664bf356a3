//! Stateless boundary operations.

use serde::{Deserialize, Serialize};
use sheetanim_analysis::{DetectionMethod, GridInferencer, Inference, SubScores};
use sheetanim_common::config::AnalysisSettings;
use sheetanim_common::error::SheetResult;
use sheetanim_model::animation::AnimationSpec;
use sheetanim_model::frames::FrameSet;
use sheetanim_model::grid::GridHypothesis;
use sheetanim_model::source::SourceImage;
use sheetanim_render::{AnimationEncoder, GifAnimationEncoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// What `analyze` tells the caller about a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub rows: u32,
    pub cols: u32,
    pub margin: i32,
    pub line_width: f64,
    pub confidence: f64,
    pub image_size: ImageSize,
    pub total_frames: u32,
    pub method: DetectionMethod,
    pub horizontal_lines: Vec<(usize, usize)>,
    pub vertical_lines: Vec<(usize, usize)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<SubScores>,
}

impl AnalysisReport {
    pub fn from_inference(inference: &Inference, width: u32, height: u32) -> Self {
        let grid = &inference.hypothesis;
        Self {
            rows: grid.rows,
            cols: grid.cols,
            margin: grid.margin,
            line_width: grid.line_width,
            confidence: grid.confidence,
            image_size: ImageSize { width, height },
            total_frames: grid.total_frames(),
            method: inference.method,
            horizontal_lines: inference.horizontal_lines.clone(),
            vertical_lines: inference.vertical_lines.clone(),
            scores: inference.scores,
        }
    }

    /// The inferred grid, ready for caller edits.
    pub fn hypothesis(&self) -> GridHypothesis {
        GridHypothesis {
            rows: self.rows,
            cols: self.cols,
            margin: self.margin,
            line_width: self.line_width,
            confidence: self.confidence,
        }
    }

    /// Whether the caller should be asked to confirm or correct the grid.
    pub fn needs_review(&self, threshold: f64) -> bool {
        self.confidence < threshold
    }
}

/// Infer the grid of an already decoded sheet.
pub fn analyze_source(source: &SourceImage, settings: &AnalysisSettings) -> AnalysisReport {
    let inference = GridInferencer::new(settings.clone()).analyze(source);
    AnalysisReport::from_inference(&inference, source.width(), source.height())
}

/// Decode a sheet and infer its grid.
///
/// Fails only when the bytes are not a decodable image. Ambiguous sheets
/// produce a low-confidence report instead.
pub fn analyze(bytes: &[u8], settings: &AnalysisSettings) -> SheetResult<AnalysisReport> {
    let source = SourceImage::decode(bytes)?;
    Ok(analyze_source(&source, settings))
}

/// Decode a sheet and cut it into frames with an explicit grid.
pub fn slice(bytes: &[u8], rows: u32, cols: u32, margin: i32) -> SheetResult<FrameSet> {
    let source = SourceImage::decode(bytes)?;
    sheetanim_render::slice(&source, &GridHypothesis::manual(rows, cols, margin))
}

/// Encode frames into a looping GIF with one duration for every frame.
pub fn encode(frames: FrameSet, duration_ms: u32) -> SheetResult<Vec<u8>> {
    GifAnimationEncoder::new().encode(AnimationSpec::looping(frames, duration_ms))
}
