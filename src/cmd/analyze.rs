use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use telemetry_overlay::{
    write_performance_plot, write_track_map, AppConfig, PerformanceSummary, PipelineReport,
};

use super::load_telemetry;
use super::overlay::run_overlay;

/// Contents of `summary.json`
#[derive(Debug, Serialize)]
struct AnalysisSummary {
    telemetry: PerformanceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlay: Option<PipelineReport>,
}

pub async fn cmd_analyze(
    config: &AppConfig,
    telemetry: &Path,
    video: Option<&Path>,
    output_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let store = load_telemetry(telemetry)?;

    let map_path = output_dir.join("track_map.html");
    write_track_map(&store, &map_path)
        .with_context(|| format!("failed to write track map {}", map_path.display()))?;
    eprintln!("🗺️  Track map: {}", map_path.display());

    let plot_path = output_dir.join("performance.svg");
    write_performance_plot(&store, &plot_path)
        .with_context(|| format!("failed to write plot {}", plot_path.display()))?;
    eprintln!("📊 Performance plot: {}", plot_path.display());

    let summary = store
        .summary()
        .context("telemetry log has no samples")?;

    let overlay = match video {
        Some(video) => {
            let output = output_dir.join("overlay_video.mp4");
            Some(run_overlay(config, store, config.pipeline_config(), video, &output).await?)
        }
        None => None,
    };

    let summary_path = output_dir.join("summary.json");
    let json = serde_json::to_string_pretty(&AnalysisSummary {
        telemetry: summary,
        overlay,
    })?;
    std::fs::write(&summary_path, json)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;

    eprintln!("\n✅ Analysis written to {}", output_dir.display());
    println!("{}", output_dir.display());
    Ok(())
}
