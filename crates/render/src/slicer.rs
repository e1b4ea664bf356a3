//! Frame slicing.

use sheetanim_common::error::SheetResult;
use sheetanim_model::frames::FrameSet;
use sheetanim_model::grid::GridHypothesis;
use sheetanim_model::source::SourceImage;

/// Cut a sheet into frames.
///
/// The grid is validated against the image first; a violation is returned
/// before any frame is produced. Each frame is the interior of its cell
/// after trimming `margin` pixels from every side, copied verbatim in the
/// source's channel layout. Remainder pixels past the last full row or
/// column are dropped.
pub fn slice(source: &SourceImage, grid: &GridHypothesis) -> SheetResult<FrameSet> {
    let (width, height) = source.dimensions();
    let geometry = grid.validate(width, height)?;

    let pixels = source.pixels();
    let frames = geometry
        .crop_rects()
        .map(|r| pixels.crop_imm(r.x, r.y, r.width, r.height))
        .collect::<Vec<_>>();

    tracing::info!(
        rows = geometry.rows,
        cols = geometry.cols,
        margin = geometry.margin,
        frame_width = geometry.frame_width(),
        frame_height = geometry.frame_height(),
        frames = frames.len(),
        "Sliced sheet"
    );

    Ok(FrameSet::new(frames))
}
