//! Cut a sprite sheet into numbered frame files.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use sheetanim_common::config::AppConfig;
use sheetanim_model::frames::FrameSet;
use sheetanim_model::grid::{GridHypothesis, GridOverride};
use sheetanim_model::source::SourceImage;

pub fn run(
    config: &AppConfig,
    image: PathBuf,
    auto: bool,
    rows: Option<u32>,
    cols: Option<u32>,
    margin: Option<i32>,
    output: PathBuf,
) -> anyhow::Result<()> {
    println!("Slicing sheet: {}", image.display());

    let bytes = std::fs::read(&image)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", image.display()))?;
    let source = SourceImage::decode(&bytes).map_err(|e| anyhow::anyhow!("{e}"))?;

    let grid = if auto {
        let report = sheetanim_engine::ops::analyze_source(&source, &config.analysis);
        super::print_report(&report);
        if report.needs_review(super::REVIEW_THRESHOLD) {
            tracing::warn!(
                confidence = report.confidence,
                "Detected grid is uncertain; consider --rows/--cols"
            );
        }
        report
            .hypothesis()
            .with_override(GridOverride { rows, cols, margin })
    } else {
        let (Some(rows), Some(cols)) = (rows, cols) else {
            anyhow::bail!("--rows and --cols are required without --auto");
        };
        GridHypothesis::manual(rows, cols, margin.unwrap_or(config.defaults.margin))
    };

    let frames = sheetanim_render::slice(&source, &grid)
        .map_err(|e| anyhow::anyhow!("Failed to slice: {e}"))?;
    write_frames(&frames, &output)?;

    let (w, h) = frames.frame_size().unwrap_or((0, 0));
    println!(
        "Wrote {} frames ({w}x{h}) to {}",
        frames.len(),
        output.display()
    );
    Ok(())
}

/// Write `frame_001.png`, `frame_002.png`, ... in row-major order.
pub fn write_frames(frames: &FrameSet, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", dir.display()))?;
    for (i, frame) in frames.iter().enumerate() {
        let path = dir.join(FrameSet::file_name(i + 1));
        frame
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use sheetanim_common::config::DetectionMode;
    use std::io::Cursor;

    fn png_names(dir: &Path) -> Vec<String> {
        crate::commands::encode::frame_paths(dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_sliced_frames_encode_into_one_gif() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("walk.png");
        let frames_dir = dir.path().join("frames");
        let gif_path = dir.path().join("out").join("walk.gif");

        // Two rows of four 16px cells, each a different shade.
        let img = RgbImage::from_fn(64, 32, |x, y| {
            let cell = (y / 16 * 4 + x / 16) as u8;
            Rgb([cell * 30, 255 - cell * 30, 90])
        });
        img.save(&sheet).unwrap();

        let config = AppConfig::default();
        run(
            &config,
            sheet,
            false,
            Some(2),
            Some(4),
            Some(1),
            frames_dir.clone(),
        )
        .unwrap();
        assert_eq!(png_names(&frames_dir).len(), 8);
        assert_eq!(png_names(&frames_dir)[0], "frame_001.png");

        crate::commands::encode::run(&config, frames_dir, Some(50), gif_path.clone()).unwrap();

        let bytes = std::fs::read(&gif_path).unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
        let mut decoder = gif::DecodeOptions::new()
            .read_info(Cursor::new(bytes))
            .unwrap();
        // 16px cells less a 1px margin on each side.
        assert_eq!((decoder.width(), decoder.height()), (14, 14));
        let mut delays = vec![];
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            delays.push(frame.delay);
        }
        assert_eq!(delays, vec![5; 8]);
    }

    #[test]
    fn test_auto_slice_follows_detection_mode() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("sheet.png");

        // 4x4 cells of 64px, a dark square centred in each, no separators.
        let img = RgbImage::from_fn(256, 256, |x, y| {
            let inside = |v: u32| (22..42).contains(&(v % 64));
            if inside(x) && inside(y) {
                Rgb([30, 30, 30])
            } else {
                Rgb([230, 230, 230])
            }
        });
        img.save(&sheet).unwrap();

        let mut config = AppConfig::default();
        config.analysis.mode = DetectionMode::Edges;
        let edges_dir = dir.path().join("edges");
        run(&config, sheet.clone(), true, None, None, None, edges_dir.clone()).unwrap();
        assert_eq!(png_names(&edges_dir).len(), 16);

        config.analysis.mode = DetectionMode::DarkLines;
        let lines_dir = dir.path().join("lines");
        run(&config, sheet, true, None, None, None, lines_dir.clone()).unwrap();
        assert_eq!(png_names(&lines_dir).len(), 1);
    }
}
