//! Video frame sources and sinks
//!
//! A [`FrameSource`] yields decoded frames in presentation order and a
//! [`FrameSink`] accepts them for encoding. Two implementations of each are
//! available: [`ffmpeg`] (subprocess pipes carrying raw RGB24) and
//! [`memory`] (in-process buffers, used for tests and previews).

pub mod ffmpeg;
pub mod frame;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sync::FrameRate;

pub use ffmpeg::{probe, FfmpegConfig, FfmpegSink, FfmpegSource};
pub use frame::Frame;
pub use memory::{MemorySink, MemorySource};

/// Container metadata of a video stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Frame count, when the container records it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Display rotation in degrees from container metadata. Frames are
    /// decoded without applying it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i32>,
}

impl VideoInfo {
    #[must_use]
    pub fn new(width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            width,
            height,
            frame_rate,
            frame_count: None,
            duration_secs: None,
            rotation: None,
        }
    }

    /// Frames per second
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.frame_rate.as_f64()
    }
}

/// Sequential reader of decoded frames
#[async_trait]
pub trait FrameSource: Send {
    /// Stream metadata, known before the first read
    fn info(&self) -> &VideoInfo;

    /// Next frame, or `Ok(None)` once the stream ended cleanly.
    ///
    /// Any other decode failure is an error.
    async fn read_frame(&mut self) -> std::io::Result<Option<Frame>>;

    /// Release the underlying decoder
    async fn close(&mut self) -> std::io::Result<()>;
}

/// Sequential writer of frames
#[async_trait]
pub trait FrameSink: Send {
    /// Append one frame to the output
    async fn write_frame(&mut self, frame: Frame) -> std::io::Result<()>;

    /// Flush and finalize the output after the last frame
    async fn finish(&mut self) -> std::io::Result<()>;

    /// Stop after a failure, keeping whatever was already written
    async fn abort(&mut self) -> std::io::Result<()>;
}
