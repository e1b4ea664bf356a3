//! Infer the grid of a sprite sheet.

use std::path::PathBuf;

use serde::Serialize;
use sheetanim_common::config::AppConfig;
use sheetanim_engine::{AnalysisReport, ConversionService};

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    report: &'a AnalysisReport,
}

pub fn run(config: AppConfig, image: PathBuf, json: bool, stash: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&image)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", image.display()))?;

    let (id, report) = if stash {
        let service = ConversionService::on_disk(config)
            .map_err(|e| anyhow::anyhow!("Failed to open artifact store: {e}"))?;
        let (id, report) = service
            .analyze_upload(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to analyze sheet: {e}"))?;
        (Some(id.to_string()), report)
    } else {
        let report = sheetanim_engine::analyze(&bytes, &config.analysis)
            .map_err(|e| anyhow::anyhow!("Failed to analyze sheet: {e}"))?;
        (None, report)
    };

    if json {
        let output = JsonOutput {
            id,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Analyzed sheet: {}", image.display());
    super::print_report(&report);
    if !report.horizontal_lines.is_empty() || !report.vertical_lines.is_empty() {
        println!(
            "  Separators: {} horizontal, {} vertical",
            report.horizontal_lines.len(),
            report.vertical_lines.len()
        );
    }
    if let Some(id) = id {
        println!("  Stored as: {id}");
    }
    Ok(())
}
