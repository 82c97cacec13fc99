//! In-memory frame source and sink

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;

use super::{Frame, FrameSink, FrameSource, VideoInfo};

/// Source that replays a fixed list of frames
#[derive(Debug)]
pub struct MemorySource {
    info: VideoInfo,
    frames: VecDeque<Frame>,
    /// Index of the read that fails instead of returning a frame
    fail_at: Option<u64>,
    next_index: u64,
    closed: bool,
}

impl MemorySource {
    #[must_use]
    pub fn new(info: VideoInfo, frames: Vec<Frame>) -> Self {
        Self {
            info,
            frames: frames.into(),
            fail_at: None,
            next_index: 0,
            closed: false,
        }
    }

    /// Source of `count` identical frames of a solid color
    #[must_use]
    pub fn solid(info: VideoInfo, count: usize, rgb: [u8; 3]) -> Self {
        let frame = Frame::filled(info.width, info.height, rgb);
        Self::new(info, vec![frame; count])
    }

    /// Make the read of frame `index` fail with a decode error
    #[must_use]
    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl FrameSource for MemorySource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    async fn read_frame(&mut self) -> io::Result<Option<Frame>> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "source closed"));
        }
        let index = self.next_index;
        if self.fail_at == Some(index) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("corrupt packet in frame {index}"),
            ));
        }
        self.next_index += 1;
        Ok(self.frames.pop_front())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Sink that keeps every written frame
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<Frame>,
    /// Index of the write that is rejected
    fail_at: Option<usize>,
    finished: bool,
    aborted: bool,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the write of frame `index`
    #[must_use]
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn write_frame(&mut self, frame: Frame) -> io::Result<()> {
        if self.finished || self.aborted {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "sink closed"));
        }
        if self.fail_at == Some(self.frames.len()) {
            return Err(io::Error::other("disk full"));
        }
        self.frames.push(frame);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }

    async fn abort(&mut self) -> io::Result<()> {
        self.aborted = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::FrameRate;

    fn info() -> VideoInfo {
        VideoInfo::new(4, 4, FrameRate::new(1, 1))
    }

    #[tokio::test]
    async fn source_yields_then_ends() {
        let mut source = MemorySource::solid(info(), 2, [1, 1, 1]);
        assert!(source.read_frame().await.unwrap().is_some());
        assert!(source.read_frame().await.unwrap().is_some());
        assert!(source.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn source_fails_at_configured_index() {
        let mut source = MemorySource::solid(info(), 3, [1, 1, 1]).failing_at(1);
        assert!(source.read_frame().await.is_ok());
        let err = source.read_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn sink_rejects_after_finish() {
        let mut sink = MemorySink::new();
        sink.write_frame(Frame::new(1, 1)).await.unwrap();
        sink.finish().await.unwrap();
        assert!(sink.write_frame(Frame::new(1, 1)).await.is_err());
        assert_eq!(sink.frames().len(), 1);
    }
}
