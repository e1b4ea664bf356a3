//! Per-request conversion state.
//!
//! ```text
//! Uploaded ──analyze/set_grid──▶ Analyzed ──slice──▶ Sliced ──encode──▶ Encoded
//!     │                             │                  │
//!     └─────────────────────────────┴──────────────────┴──▶ Failed(reason)
//! ```
//!
//! A job owns every intermediate it produces. Failing a job records the
//! reason and the last good state without touching data already produced.

use std::fmt;

use serde::{Deserialize, Serialize};
use sheetanim_common::config::AnalysisSettings;
use sheetanim_common::error::{SheetError, SheetResult};
use sheetanim_model::animation::AnimationSpec;
use sheetanim_model::frames::FrameSet;
use sheetanim_model::grid::{GridHypothesis, GridOverride};
use sheetanim_model::source::SourceImage;
use sheetanim_render::AnimationEncoder;

use crate::ops::{analyze_source, AnalysisReport};

/// Where a job is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Uploaded,
    Analyzed,
    Sliced,
    Encoded,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uploaded => "uploaded",
            Self::Analyzed => "analyzed",
            Self::Sliced => "sliced",
            Self::Encoded => "encoded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a job failed, and the state it had reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub reason: String,
    pub last_state: JobState,
}

/// One conversion request.
pub struct ConversionJob {
    source: SourceImage,
    state: JobState,
    report: Option<AnalysisReport>,
    grid: Option<GridHypothesis>,
    overridden: bool,
    frames: Option<FrameSet>,
    output: Option<Vec<u8>>,
    failure: Option<JobFailure>,
}

impl ConversionJob {
    /// Start a job from a decoded sheet.
    pub fn new(source: SourceImage) -> Self {
        Self {
            source,
            state: JobState::Uploaded,
            report: None,
            grid: None,
            overridden: false,
            frames: None,
            output: None,
            failure: None,
        }
    }

    /// Decode uploaded bytes and start a job. Undecodable input never
    /// becomes a job.
    pub fn from_bytes(bytes: &[u8]) -> SheetResult<Self> {
        Ok(Self::new(SourceImage::decode(bytes)?))
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    /// The grid the slicer will use (or used).
    pub fn grid(&self) -> Option<&GridHypothesis> {
        self.grid.as_ref()
    }

    pub fn frames(&self) -> Option<&FrameSet> {
        self.frames.as_ref()
    }

    pub fn output(&self) -> Option<&[u8]> {
        self.output.as_deref()
    }

    pub fn into_output(self) -> Option<Vec<u8>> {
        self.output
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    fn expect_state(&self, expected: JobState, operation: &str) -> SheetResult<()> {
        if self.state == expected {
            return Ok(());
        }
        Err(SheetError::invalid_state(format!(
            "cannot {operation} a job in state {} (expected {expected})",
            self.state
        )))
    }

    /// Mark the job failed. The last good state and its data are kept.
    fn fail(&mut self, err: &SheetError) {
        tracing::warn!(state = %self.state, error = %err, "Conversion job failed");
        self.failure = Some(JobFailure {
            reason: err.to_string(),
            last_state: self.state,
        });
        self.state = JobState::Failed;
    }

    /// Infer the grid. Never fails for a decoded image.
    pub fn analyze(&mut self, settings: &AnalysisSettings) -> SheetResult<&AnalysisReport> {
        self.expect_state(JobState::Uploaded, "analyze")?;
        let report = analyze_source(&self.source, settings);
        self.grid = Some(report.hypothesis());
        self.state = JobState::Analyzed;
        Ok(self.report.insert(report))
    }

    /// Skip inference and use a caller-stated grid.
    pub fn set_grid(&mut self, grid: GridHypothesis) -> SheetResult<()> {
        self.expect_state(JobState::Uploaded, "set the grid of")?;
        self.grid = Some(grid);
        self.state = JobState::Analyzed;
        Ok(())
    }

    /// Apply caller edits to the inferred grid. Allowed once, before slicing.
    pub fn override_grid(&mut self, edits: GridOverride) -> SheetResult<GridHypothesis> {
        self.expect_state(JobState::Analyzed, "override the grid of")?;
        if self.overridden {
            return Err(SheetError::invalid_state("grid was already overridden"));
        }
        let grid = self
            .grid
            .ok_or_else(|| SheetError::invalid_state("analyzed job has no grid"))?
            .with_override(edits);
        self.grid = Some(grid);
        self.overridden = true;
        tracing::debug!(
            rows = grid.rows,
            cols = grid.cols,
            margin = grid.margin,
            "Grid overridden"
        );
        Ok(grid)
    }

    /// Cut the sheet with the current grid.
    pub fn slice(&mut self) -> SheetResult<&FrameSet> {
        self.expect_state(JobState::Analyzed, "slice")?;
        let grid = self
            .grid
            .ok_or_else(|| SheetError::invalid_state("analyzed job has no grid"))?;

        match sheetanim_render::slice(&self.source, &grid) {
            Ok(frames) => {
                self.state = JobState::Sliced;
                Ok(self.frames.insert(frames))
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Encode the sliced frames.
    pub fn encode(
        &mut self,
        encoder: &dyn AnimationEncoder,
        frame_duration_ms: u32,
    ) -> SheetResult<&[u8]> {
        self.expect_state(JobState::Sliced, "encode")?;
        let frames = self
            .frames
            .clone()
            .ok_or_else(|| SheetError::invalid_state("sliced job has no frames"))?;

        match encoder.encode(AnimationSpec::looping(frames, frame_duration_ms)) {
            Ok(bytes) => {
                self.state = JobState::Encoded;
                Ok(self.output.insert(bytes).as_slice())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use sheetanim_render::GifAnimationEncoder;

    fn job(width: u32, height: u32) -> ConversionJob {
        let img = RgbImage::from_pixel(width, height, Rgb([50, 100, 150]));
        ConversionJob::new(SourceImage::from_dynamic(DynamicImage::ImageRgb8(img)))
    }

    #[test]
    fn test_happy_path() {
        let mut job = job(120, 60);
        job.analyze(&AnalysisSettings::default()).unwrap();
        assert_eq!(job.state(), JobState::Analyzed);

        job.override_grid(GridOverride {
            rows: Some(2),
            cols: Some(4),
            margin: Some(1),
        })
        .unwrap();
        assert_eq!(job.slice().unwrap().len(), 8);
        assert_eq!(job.state(), JobState::Sliced);

        let bytes = job.encode(&GifAnimationEncoder::new(), 80).unwrap();
        assert_eq!(&bytes[..3], b"GIF");
        assert_eq!(job.state(), JobState::Encoded);
        assert!(job.failure().is_none());
    }

    #[test]
    fn test_override_only_once_and_only_after_analysis() {
        let mut job = job(100, 100);
        assert!(matches!(
            job.override_grid(GridOverride::default()),
            Err(SheetError::InvalidState { .. })
        ));

        job.analyze(&AnalysisSettings::default()).unwrap();
        job.override_grid(GridOverride {
            cols: Some(2),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            job.override_grid(GridOverride::default()),
            Err(SheetError::InvalidState { .. })
        ));
        assert_eq!(job.grid().unwrap().cols, 2);
    }

    #[test]
    fn test_validation_failure_keeps_earlier_data() {
        let mut job = job(600, 600);
        job.set_grid(GridHypothesis::manual(6, 6, 50)).unwrap();
        assert!(job.slice().is_err());

        assert_eq!(job.state(), JobState::Failed);
        let failure = job.failure().unwrap();
        assert_eq!(failure.last_state, JobState::Analyzed);
        assert!(failure.reason.contains("margin"));
        assert_eq!(job.grid().unwrap().margin, 50);
        assert!(job.frames().is_none());

        // Failed is terminal.
        assert!(matches!(job.slice(), Err(SheetError::InvalidState { .. })));
    }

    #[test]
    fn test_encoding_failure_keeps_frames() {
        let mut job = job(40, 40);
        job.set_grid(GridHypothesis::manual(2, 2, 0)).unwrap();
        job.slice().unwrap();
        assert!(job.encode(&GifAnimationEncoder::new(), 0).is_err());

        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.failure().unwrap().last_state, JobState::Sliced);
        assert_eq!(job.frames().unwrap().len(), 4);
        assert!(job.output().is_none());
    }

    #[test]
    fn test_stages_cannot_be_skipped_or_repeated() {
        let mut job = job(40, 40);
        assert!(matches!(job.slice(), Err(SheetError::InvalidState { .. })));
        job.set_grid(GridHypothesis::manual(1, 1, 0)).unwrap();
        assert!(matches!(
            job.analyze(&AnalysisSettings::default()),
            Err(SheetError::InvalidState { .. })
        ));
        assert!(matches!(
            job.encode(&GifAnimationEncoder::new(), 80),
            Err(SheetError::InvalidState { .. })
        ));
        // A precondition error does not fail the job.
        assert_eq!(job.state(), JobState::Analyzed);
    }
}
