//! Encode a directory of frame files into a looping GIF.

use std::path::{Path, PathBuf};

use sheetanim_common::config::AppConfig;
use sheetanim_model::frames::FrameSet;

pub fn run(
    config: &AppConfig,
    input: PathBuf,
    duration: Option<u32>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let paths = frame_paths(&input)?;
    if paths.is_empty() {
        anyhow::bail!("No .png frames found in {}", input.display());
    }
    println!("Encoding {} frames from {}", paths.len(), input.display());

    let frames = paths
        .iter()
        .map(|path| {
            image::open(path).map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let duration = duration.unwrap_or(config.defaults.frame_duration_ms);
    let bytes = sheetanim_engine::encode(FrameSet::new(frames), duration)
        .map_err(|e| anyhow::anyhow!("Failed to encode: {e}"))?;
    write_output(&output, &bytes)?;

    println!(
        "Wrote {} ({} bytes, {duration} ms per frame)",
        output.display(),
        bytes.len()
    );
    Ok(())
}

/// PNG files directly inside `dir`, sorted by file name.
pub fn frame_paths(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

pub fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))
}
