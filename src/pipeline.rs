//! Overlay pipeline: read -> synchronize -> render -> write
//!
//! Drives a single sequential pass over a video source. Every decoded frame
//! is matched to the nearest telemetry sample, annotated, and handed to
//! the sink in the order it was read.
//!
//! ```text
//! Idle ──run()──> Running ──EOF / cancel──> Completed
//!                    │
//!                    └──read/write/render error──> Failed
//! ```
//!
//! There is no retry and no skipping: the first failure ends the run and
//! frames already written stay in the sink.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{OverlayError, Result};
use crate::overlay::{OverlayRenderer, OverlayStyle};
use crate::sync::{frame_timestamp, validate_fps};
use crate::telemetry::{Sample, TelemetryStore};
use crate::video::{FrameSink, FrameSource, VideoInfo};

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Source and sink not yet touched
    Idle,
    /// Processing frames
    Running,
    /// Source exhausted (or run cancelled); output finalized
    Completed,
    /// Stopped on an error; partial output left in place
    Failed,
}

/// Immutable settings for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Shift applied to every frame timestamp before lookup (ms)
    pub sync_offset_ms: i64,
    /// Limit on each individual frame read and write
    pub io_timeout: Option<Duration>,
    /// Log progress every N frames (0 disables)
    pub progress_interval: u64,
    /// Overlay layout
    pub style: OverlayStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sync_offset_ms: 0,
            io_timeout: None,
            progress_interval: 300,
            style: OverlayStyle::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the sync offset
    #[must_use]
    pub fn with_sync_offset(mut self, sync_offset_ms: i64) -> Self {
        self.sync_offset_ms = sync_offset_ms;
        self
    }

    /// Bound every read and write
    #[must_use]
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }
}

/// Cooperative stop request, polled once per frame
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub frames_written: u64,
    /// Stopped early through the [`CancelHandle`]
    pub cancelled: bool,
    pub first_timestamp_ms: Option<f64>,
    pub last_timestamp_ms: Option<f64>,
    pub elapsed_secs: f64,
}

impl PipelineReport {
    /// Whether the sink received any frame. A run cancelled or ended before
    /// the first frame leaves no output file behind.
    pub fn wrote_output(&self) -> bool {
        self.frames_written > 0
    }

    fn record(&mut self, timestamp_ms: f64) {
        self.frames_written += 1;
        self.first_timestamp_ms.get_or_insert(timestamp_ms);
        self.last_timestamp_ms = Some(timestamp_ms);
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no response within {limit:?}"),
            ))
        }),
        None => fut.await,
    }
}

/// Telemetry overlay pipeline
pub struct OverlayPipeline {
    store: TelemetryStore,
    config: PipelineConfig,
    renderer: OverlayRenderer,
    state: PipelineState,
    cancel: CancelHandle,
}

impl OverlayPipeline {
    /// Create a pipeline over a loaded telemetry store.
    ///
    /// Fails with `EmptyStore` if there is nothing to annotate with.
    pub fn new(store: TelemetryStore, config: PipelineConfig) -> Result<Self> {
        if store.is_empty() {
            return Err(OverlayError::EmptyStore);
        }
        let renderer = OverlayRenderer::new(config.style.clone());
        Ok(Self {
            store,
            config,
            renderer,
            state: PipelineState::Idle,
            cancel: CancelHandle::default(),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    /// Handle for stopping the run from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Telemetry timestamp and sample for frame `frame_index`
    pub fn sample_for_frame(&self, frame_index: u64, fps: f64) -> Result<(f64, &Sample)> {
        let timestamp_ms = frame_timestamp(frame_index, fps, self.config.sync_offset_ms)?;
        let sample = self.store.nearest_sample(timestamp_ms)?;
        Ok((timestamp_ms, sample))
    }

    /// Run the single pass from `source` to `sink`.
    ///
    /// Allowed once, from `Idle`.
    pub async fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<PipelineReport>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        if self.state != PipelineState::Idle {
            return Err(OverlayError::AlreadyRun(self.state));
        }

        let started = Instant::now();
        let info = source.info().clone();

        if let Err(e) = Self::validate(&info) {
            self.state = PipelineState::Failed;
            Self::close_after_failure(source, sink).await;
            return Err(e);
        }

        info!(
            "Overlaying {} samples onto {}x{} @ {:.3} fps (offset {}ms)",
            self.store.len(),
            info.width,
            info.height,
            info.fps(),
            self.config.sync_offset_ms
        );
        self.state = PipelineState::Running;

        let mut report = PipelineReport::default();
        if let Err(e) = self.drive(source, sink, &info, &mut report).await {
            self.state = PipelineState::Failed;
            warn!(
                "Pipeline failed after {} frames: {e}",
                report.frames_written
            );
            Self::close_after_failure(source, sink).await;
            return Err(e);
        }

        if let Err(e) = source.close().await {
            warn!("Failed to close video source: {e}");
        }
        if let Err(e) = sink.finish().await {
            self.state = PipelineState::Failed;
            return Err(OverlayError::WriteError {
                frame_index: report.frames_written,
                timestamp_ms: report.last_timestamp_ms.unwrap_or_default(),
                source: e,
            });
        }

        self.state = PipelineState::Completed;
        report.elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            "Pipeline completed: {} frames in {:.2}s{}",
            report.frames_written,
            report.elapsed_secs,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    fn validate(info: &VideoInfo) -> Result<()> {
        validate_fps(info.fps())?;
        if info.width == 0 || info.height == 0 {
            return Err(OverlayError::InvalidFrame {
                width: info.width,
                height: info.height,
            });
        }
        Ok(())
    }

    async fn drive<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        info: &VideoInfo,
        report: &mut PipelineReport,
    ) -> Result<()>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let fps = info.fps();
        let timeout = self.config.io_timeout;
        let mut frame_index: u64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                info!("Cancelled at frame {frame_index}");
                report.cancelled = true;
                return Ok(());
            }

            let mut frame = match with_timeout(timeout, source.read_frame()).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!("End of stream after {frame_index} frames");
                    return Ok(());
                }
                Err(err) => {
                    return Err(OverlayError::ReadError {
                        frame_index,
                        source: err,
                    })
                }
            };

            if frame.width != info.width || frame.height != info.height {
                return Err(OverlayError::FrameMismatch {
                    frame_index,
                    width: frame.width,
                    height: frame.height,
                    expected_width: info.width,
                    expected_height: info.height,
                });
            }

            let (timestamp_ms, sample) = self.sample_for_frame(frame_index, fps)?;
            self.renderer.render(&mut frame, sample)?;

            with_timeout(timeout, sink.write_frame(frame))
                .await
                .map_err(|err| OverlayError::WriteError {
                    frame_index,
                    timestamp_ms,
                    source: err,
                })?;

            report.record(timestamp_ms);
            frame_index += 1;

            if self.config.progress_interval > 0 && frame_index % self.config.progress_interval == 0 {
                info!("Frame {frame_index} (t={:.1}s)", timestamp_ms / 1000.0);
            }
        }
    }

    async fn close_after_failure<S, K>(source: &mut S, sink: &mut K)
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        if let Err(e) = source.close().await {
            warn!("Failed to close video source: {e}");
        }
        if let Err(e) = sink.abort().await {
            warn!("Failed to close video sink: {e}");
        }
    }
}
