//! `telemetry-overlay` - Burn vehicle telemetry into onboard video
//!
//! # Features
//!
//! - **Telemetry**: CSV logs loaded into an immutable, time-ordered store
//! - **Sync**: frame index to telemetry time, with a configurable offset
//! - **Overlay**: speed/RPM/boost/G-force panel and lap time drawn per frame
//! - **Video**: ffmpeg-backed frame source and sink over raw RGB24 pipes
//! - **Reports**: speed-colored track map and a 2x2 performance plot
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use telemetry_overlay::{
//!     load_csv, FfmpegConfig, FfmpegSink, FfmpegSource, FrameSource, OverlayPipeline,
//!     PipelineConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = load_csv(Path::new("session.csv"))?;
//!     let ffmpeg = FfmpegConfig::default();
//!
//!     let mut source = FfmpegSource::open(ffmpeg.clone(), Path::new("onboard.mp4")).await?;
//!     let info = source.info().clone();
//!     let mut sink = FfmpegSink::new(ffmpeg, Path::new("annotated.mp4"), info);
//!
//!     let mut pipeline = OverlayPipeline::new(store, PipelineConfig::default())?;
//!     let report = pipeline.run(&mut source, &mut sink).await?;
//!     println!("Wrote {} frames", report.frames_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod plot;
pub mod sync;
pub mod telemetry;
pub mod trackmap;
pub mod video;

pub use config::AppConfig;
pub use error::{OverlayError, Result};
pub use overlay::{OverlayRenderer, OverlayStyle};
pub use pipeline::{CancelHandle, OverlayPipeline, PipelineConfig, PipelineReport, PipelineState};
pub use plot::{render_performance_svg, write_performance_plot};
pub use sync::{frame_timestamp, FrameRate};
pub use telemetry::{load_csv, parse_csv, PerformanceSummary, Sample, TelemetryError, TelemetryStore};
pub use trackmap::{render_track_map, write_track_map};
pub use video::{
    probe, FfmpegConfig, FfmpegSink, FfmpegSource, Frame, FrameSink, FrameSource, MemorySink,
    MemorySource, VideoInfo,
};

/// Version of telemetry-overlay
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
