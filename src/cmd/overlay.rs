use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use telemetry_overlay::{
    AppConfig, FfmpegSink, FfmpegSource, FrameSource, OverlayPipeline, PipelineConfig,
    PipelineReport, TelemetryStore,
};

use super::load_telemetry;

const DEFAULT_OUTPUT: &str = "output_video.mp4";

pub async fn cmd_overlay(
    config: &AppConfig,
    telemetry: &Path,
    video: &Path,
    output: Option<PathBuf>,
    sync_offset_ms: Option<i64>,
) -> Result<()> {
    let output = output
        .or_else(|| config.output_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let mut pipeline_config = config.pipeline_config();
    if let Some(offset) = sync_offset_ms {
        pipeline_config.sync_offset_ms = offset;
    }

    let store = load_telemetry(telemetry)?;
    let report = run_overlay(config, store, pipeline_config, video, &output).await?;
    print_report(&report, &output);
    Ok(())
}

/// Annotate `video` into `output`, stopping cleanly on Ctrl-C
pub async fn run_overlay(
    config: &AppConfig,
    store: TelemetryStore,
    pipeline_config: PipelineConfig,
    video: &Path,
    output: &Path,
) -> Result<PipelineReport> {
    if !config.ffmpeg.check_available().await {
        anyhow::bail!(
            "ffmpeg not available (looked for '{}'); install it or set [ffmpeg] ffmpeg_path",
            config.ffmpeg.ffmpeg_path
        );
    }

    eprintln!("🎬 Annotating: {}", video.display());
    eprintln!("   Output: {}", output.display());
    if pipeline_config.sync_offset_ms != 0 {
        eprintln!("   Sync offset: {} ms", pipeline_config.sync_offset_ms);
    }

    let mut source = FfmpegSource::open(config.ffmpeg.clone(), video)
        .await
        .with_context(|| format!("failed to open {}", video.display()))?;
    let info = source.info().clone();
    eprintln!(
        "   Video: {}x{} @ {} fps",
        info.width, info.height, info.frame_rate
    );

    let mut sink = FfmpegSink::new(config.ffmpeg.clone(), output, info);
    let mut pipeline = OverlayPipeline::new(store, pipeline_config)?;

    let cancel = pipeline.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current frame");
            cancel.cancel();
        }
    });

    let result = pipeline.run(&mut source, &mut sink).await;
    interrupt.abort();

    result.with_context(|| format!("overlay of {} failed", video.display()))
}

fn print_report(report: &PipelineReport, output: &Path) {
    if report.cancelled {
        eprintln!(
            "\n⚠️  Cancelled after {} frames in {:.1}s",
            report.frames_written, report.elapsed_secs
        );
    } else {
        eprintln!(
            "\n✅ Overlay complete: {} frames in {:.1}s",
            report.frames_written, report.elapsed_secs
        );
    }
    if report.wrote_output() {
        println!("{}", output.display());
    } else {
        warn!("No frames were written, {} was not created", output.display());
    }
}
