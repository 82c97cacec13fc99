use std::path::Path;

use anyhow::{Context, Result};

use telemetry_overlay::{probe, AppConfig};

pub async fn cmd_probe(config: &AppConfig, video: &Path) -> Result<()> {
    let info = probe(&config.ffmpeg.ffprobe_path, video)
        .await
        .with_context(|| format!("failed to probe {}", video.display()))?;

    println!("📹 {}", video.display());
    println!("   Resolution: {}x{}", info.width, info.height);
    println!("   Frame rate: {} ({:.3} fps)", info.frame_rate, info.fps());
    if let Some(frames) = info.frame_count {
        println!("   Frames: {frames}");
    }
    if let Some(duration) = info.duration_secs {
        println!("   Duration: {duration:.2}s");
    }
    if let Some(degrees) = info.rotation {
        println!("   Rotation: {degrees}° (not applied to overlay output)");
    }
    Ok(())
}
