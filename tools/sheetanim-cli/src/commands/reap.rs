//! Remove stored artifacts older than the retention window.

use sheetanim_common::config::AppConfig;
use sheetanim_engine::ConversionService;

pub async fn run(config: AppConfig, watch: bool) -> anyhow::Result<()> {
    let interval = config.reap_interval();
    let service = ConversionService::on_disk(config)
        .map_err(|e| anyhow::anyhow!("Failed to open artifact store: {e}"))?;
    let reaper = service.reaper();
    let store_dir = service.config().store_dir.display().to_string();

    if !watch {
        let removed = tokio::task::spawn_blocking(move || reaper.sweep())
            .await?
            .map_err(|e| anyhow::anyhow!("Sweep failed: {e}"))?;
        println!("Removed {removed} expired artifacts from {store_dir}");
        return Ok(());
    }

    println!(
        "Sweeping {store_dir} every {}s. Press Ctrl+C to stop.",
        interval.as_secs()
    );
    let handle = reaper.spawn(interval);

    // Wait for Ctrl+C
    tokio::signal::ctrl_c().await?;

    handle.shutdown().await;
    println!("Stopped.");
    Ok(())
}
