//! Slice and encode a sheet in one step through the artifact store.

use std::path::PathBuf;

use sheetanim_common::config::AppConfig;
use sheetanim_engine::{ConversionService, ConvertRequest};
use sheetanim_model::artifact::ArtifactId;
use sheetanim_model::grid::GridOverride;

#[allow(clippy::too_many_arguments)]
pub fn run(
    config: AppConfig,
    image: Option<PathBuf>,
    id: Option<String>,
    rows: Option<u32>,
    cols: Option<u32>,
    margin: Option<i32>,
    duration: Option<u32>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let service = ConversionService::on_disk(config)
        .map_err(|e| anyhow::anyhow!("Failed to open artifact store: {e}"))?;

    let upload = match (image, id) {
        (Some(image), _) => {
            println!("Converting sheet: {}", image.display());
            let bytes = std::fs::read(&image)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", image.display()))?;
            let (id, report) = service
                .analyze_upload(bytes)
                .map_err(|e| anyhow::anyhow!("Failed to analyze sheet: {e}"))?;
            super::print_report(&report);
            id
        }
        (None, Some(raw)) => {
            println!("Converting stored sheet: {raw}");
            ArtifactId::parse(&raw).map_err(|e| anyhow::anyhow!("{e}"))?
        }
        (None, None) => anyhow::bail!("Either an image path or --id is required"),
    };

    let request = ConvertRequest {
        grid: GridOverride { rows, cols, margin },
        frame_duration_ms: duration,
    };
    let animation = service
        .convert(&upload, request)
        .map_err(|e| anyhow::anyhow!("Failed to convert: {e}"))?;
    let bytes = service
        .fetch_animation(&animation)
        .map_err(|e| anyhow::anyhow!("Failed to fetch animation: {e}"))?;

    super::encode::write_output(&output, &bytes)?;
    println!("Wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}
