//! Row and column brightness projections.

use image::GrayImage;
use sheetanim_model::profile::{Axis, ProjectionProfile};
use sheetanim_model::source::SourceImage;

/// Both projection profiles of one image.
#[derive(Debug, Clone)]
pub struct Projections {
    /// One mean per pixel row; length = image height.
    pub rows: ProjectionProfile,
    /// One mean per pixel column; length = image width.
    pub columns: ProjectionProfile,
    pub width: u32,
    pub height: u32,
}

/// Compute the row and column luminance profiles of a source image.
///
/// Color images are reduced to 8-bit luminance first. A uniform image
/// yields two flat profiles.
pub fn project(source: &SourceImage) -> Projections {
    project_luma(&source.luminance())
}

/// Compute profiles of an 8-bit grayscale image in a single pass.
pub fn project_luma(gray: &GrayImage) -> Projections {
    let (width, height) = gray.dimensions();
    let mut row_sums = vec![0u64; height as usize];
    let mut col_sums = vec![0u64; width as usize];

    for (y, row) in gray.rows().enumerate() {
        for (x, pixel) in row.enumerate() {
            let v = u64::from(pixel.0[0]);
            row_sums[y] += v;
            col_sums[x] += v;
        }
    }

    let rows = means(&row_sums, width);
    let columns = means(&col_sums, height);

    tracing::debug!(width, height, "Computed projection profiles");

    Projections {
        rows: ProjectionProfile::new(Axis::Rows, rows),
        columns: ProjectionProfile::new(Axis::Columns, columns),
        width,
        height,
    }
}

fn means(sums: &[u64], count: u32) -> Vec<f64> {
    if count == 0 {
        return vec![0.0; sums.len()];
    }
    sums.iter().map(|&s| s as f64 / f64::from(count)).collect()
}
