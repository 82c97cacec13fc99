//! Error types for the overlay pipeline

use thiserror::Error;

use crate::pipeline::PipelineState;
use crate::telemetry::TelemetryError;

/// Overlay pipeline errors
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("telemetry store is empty, no frame can be annotated")]
    EmptyStore,

    #[error("invalid frame rate: {fps} (must be positive and finite)")]
    InvalidRate { fps: f64 },

    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },

    #[error("frame {frame_index} is {width}x{height}, stream is {expected_width}x{expected_height}")]
    FrameMismatch {
        frame_index: u64,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("failed to read frame {frame_index}: {source}")]
    ReadError {
        frame_index: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write frame {frame_index} (telemetry t={timestamp_ms:.1}ms): {source}")]
    WriteError {
        frame_index: u64,
        timestamp_ms: f64,
        #[source]
        source: std::io::Error,
    },

    #[error("pipeline already ran (state: {0:?})")]
    AlreadyRun(PipelineState),

    #[error("telemetry error: {0}")]
    Telemetry(TelemetryError),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TelemetryError> for OverlayError {
    fn from(err: TelemetryError) -> Self {
        match err {
            TelemetryError::EmptyStore => Self::EmptyStore,
            other => Self::Telemetry(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;
