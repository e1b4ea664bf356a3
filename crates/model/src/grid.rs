//! Grid hypotheses and validated slicing geometry.

use serde::{Deserialize, Serialize};
use sheetanim_common::error::ValidationError;

/// A guess (or a caller's statement) about the grid layout of a sheet.
///
/// Inferred hypotheses always satisfy `rows >= 1`, `cols >= 1`,
/// `margin >= 0` and `confidence` in `[0, 1]`. Caller-supplied values
/// are only checked when validated against a concrete image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridHypothesis {
    /// Number of frame rows.
    pub rows: u32,

    /// Number of frame columns.
    pub cols: u32,

    /// Pixels trimmed from each side of every cell.
    pub margin: i32,

    /// Average measured separator width in pixels (0 when none were seen).
    pub line_width: f64,

    /// Reliability of an inferred grid in `[0, 1]`.
    pub confidence: f64,
}

/// Caller edits applied to an inferred hypothesis before slicing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOverride {
    pub rows: Option<u32>,
    pub cols: Option<u32>,
    pub margin: Option<i32>,
}

impl GridHypothesis {
    /// A caller-stated grid. Confidence is 1 because nothing was guessed.
    pub fn manual(rows: u32, cols: u32, margin: i32) -> Self {
        Self {
            rows,
            cols,
            margin,
            line_width: 0.0,
            confidence: 1.0,
        }
    }

    /// The whole image as a single frame, with the given confidence.
    pub fn single(confidence: f64) -> Self {
        Self {
            rows: 1,
            cols: 1,
            margin: 0,
            line_width: 0.0,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// `rows * cols`, saturating.
    pub fn total_frames(&self) -> u32 {
        self.rows.saturating_mul(self.cols)
    }

    /// Cell size for an image of the given size. Remainder pixels past the
    /// last full cell are not covered.
    pub fn cell_size(&self, width: u32, height: u32) -> (u32, u32) {
        let cell_width = width.checked_div(self.cols).unwrap_or(0);
        let cell_height = height.checked_div(self.rows).unwrap_or(0);
        (cell_width, cell_height)
    }

    /// Apply caller edits. Fields left `None` keep their inferred value.
    pub fn with_override(self, edits: GridOverride) -> Self {
        Self {
            rows: edits.rows.unwrap_or(self.rows),
            cols: edits.cols.unwrap_or(self.cols),
            margin: edits.margin.unwrap_or(self.margin),
            ..self
        }
    }

    /// Check every slicing precondition against an image of the given size.
    ///
    /// Preconditions are checked in a fixed order and the first violation
    /// is reported.
    pub fn validate(&self, width: u32, height: u32) -> Result<FrameGeometry, ValidationError> {
        if self.rows == 0 {
            return Err(ValidationError::ZeroRows);
        }
        if self.cols == 0 {
            return Err(ValidationError::ZeroCols);
        }
        if self.margin < 0 {
            return Err(ValidationError::NegativeMargin {
                margin: self.margin,
            });
        }

        let (cell_width, cell_height) = self.cell_size(width, height);
        let margin = self.margin as u32;
        if u64::from(margin) * 2 >= u64::from(cell_width.min(cell_height)) {
            return Err(ValidationError::MarginTooLarge {
                margin: self.margin,
                cell_width,
                cell_height,
            });
        }

        Ok(FrameGeometry {
            rows: self.rows,
            cols: self.cols,
            margin,
            cell_width,
            cell_height,
        })
    }
}

/// Slicing geometry that passed validation against a concrete image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub rows: u32,
    pub cols: u32,
    pub margin: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

/// A crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn frame_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Width of every frame after trimming the margin.
    pub fn frame_width(&self) -> u32 {
        self.cell_width - 2 * self.margin
    }

    /// Height of every frame after trimming the margin.
    pub fn frame_height(&self) -> u32 {
        self.cell_height - 2 * self.margin
    }

    /// Crop rectangle of the frame at zero-based row-major `index`.
    pub fn crop_rect(&self, index: usize) -> Option<CropRect> {
        if index >= self.frame_count() {
            return None;
        }
        let row = (index / self.cols as usize) as u32;
        let col = (index % self.cols as usize) as u32;
        Some(CropRect {
            x: col * self.cell_width + self.margin,
            y: row * self.cell_height + self.margin,
            width: self.frame_width(),
            height: self.frame_height(),
        })
    }

    /// Every crop rectangle in row-major order, top-left first.
    pub fn crop_rects(&self) -> impl Iterator<Item = CropRect> + '_ {
        (0..self.frame_count()).filter_map(|i| self.crop_rect(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_rows_first() {
        let grid = GridHypothesis::manual(0, 0, -1);
        assert_eq!(grid.validate(100, 100), Err(ValidationError::ZeroRows));
    }

    #[test]
    fn test_validate_zero_cols() {
        let grid = GridHypothesis::manual(2, 0, 0);
        assert_eq!(grid.validate(100, 100), Err(ValidationError::ZeroCols));
    }

    #[test]
    fn test_validate_negative_margin() {
        let grid = GridHypothesis::manual(2, 2, -3);
        assert_eq!(
            grid.validate(100, 100),
            Err(ValidationError::NegativeMargin { margin: -3 })
        );
    }

    #[test]
    fn test_margin_must_be_below_half_cell() {
        // 600x600 with 6x6 gives 100x100 cells; 49 is the largest legal margin.
        assert!(GridHypothesis::manual(6, 6, 49).validate(600, 600).is_ok());
        assert_eq!(
            GridHypothesis::manual(6, 6, 50).validate(600, 600),
            Err(ValidationError::MarginTooLarge {
                margin: 50,
                cell_width: 100,
                cell_height: 100,
            })
        );
    }

    #[test]
    fn test_more_cols_than_pixels_is_margin_violation() {
        let err = GridHypothesis::manual(1, 20, 0).validate(10, 10).unwrap_err();
        assert_eq!(err.constraint(), "margin < min(cell_width, cell_height) / 2");
    }

    #[test]
    fn test_crop_rects_are_row_major() {
        let geometry = GridHypothesis::manual(2, 3, 1).validate(30, 20).unwrap();
        let rects: Vec<CropRect> = geometry.crop_rects().collect();
        assert_eq!(rects.len(), 6);
        assert_eq!(
            rects[0],
            CropRect {
                x: 1,
                y: 1,
                width: 8,
                height: 8
            }
        );
        assert_eq!((rects[2].x, rects[2].y), (21, 1));
        assert_eq!((rects[3].x, rects[3].y), (1, 11));
        assert!(geometry.crop_rect(6).is_none());
    }

    #[test]
    fn test_override_keeps_unset_fields() {
        let inferred = GridHypothesis {
            rows: 4,
            cols: 4,
            margin: 2,
            line_width: 3.0,
            confidence: 0.9,
        };
        let edited = inferred.with_override(GridOverride {
            cols: Some(8),
            ..Default::default()
        });
        assert_eq!(edited.rows, 4);
        assert_eq!(edited.cols, 8);
        assert_eq!(edited.margin, 2);
        assert!((edited.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_cell_size_truncates_remainder() {
        let grid = GridHypothesis::manual(6, 6, 0);
        assert_eq!(grid.cell_size(1024, 1000), (170, 166));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn crop_rects_stay_inside_their_cells(
                width in 1u32..400,
                height in 1u32..400,
                rows in 1u32..12,
                cols in 1u32..12,
                margin in 0i32..20,
            ) {
                let grid = GridHypothesis::manual(rows, cols, margin);
                if let Ok(geometry) = grid.validate(width, height) {
                    let rects: Vec<CropRect> = geometry.crop_rects().collect();
                    prop_assert_eq!(rects.len(), (rows * cols) as usize);
                    for (i, rect) in rects.iter().enumerate() {
                        let row = i as u32 / cols;
                        let col = i as u32 % cols;
                        prop_assert!(rect.width >= 1 && rect.height >= 1);
                        prop_assert!(rect.x >= col * geometry.cell_width);
                        prop_assert!(rect.x + rect.width <= (col + 1) * geometry.cell_width);
                        prop_assert!(rect.y >= row * geometry.cell_height);
                        prop_assert!(rect.y + rect.height <= (row + 1) * geometry.cell_height);
                        prop_assert!(rect.x + rect.width <= width);
                        prop_assert!(rect.y + rect.height <= height);
                    }
                }
            }
        }
    }
}
