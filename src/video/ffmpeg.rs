//! ffmpeg-backed frame source and sink
//!
//! Decoding and encoding run in ffmpeg subprocesses connected over pipes:
//! - `ffprobe` reads container metadata (size, frame rate)
//! - the decoder writes raw RGB24 frames to its stdout
//! - the encoder reads raw RGB24 frames from its stdin
//!
//! Both processes are spawned lazily on first use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Frame, FrameSink, FrameSource, VideoInfo};
use crate::error::{OverlayError, Result};
use crate::sync::FrameRate;

fn find_binary(name: &str) -> String {
    which::which(name).map_or_else(|_| name.to_string(), |p| p.to_string_lossy().to_string())
}

/// ffmpeg tool locations and encoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Output video codec
    pub video_codec: String,
    /// Encoder preset (x264 naming)
    pub preset: Option<String>,
    /// Constant rate factor
    pub crf: Option<u8>,
    /// Output pixel format
    pub pixel_format: String,
    /// Additional ffmpeg output arguments
    pub extra_output_args: Vec<String>,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: find_binary("ffmpeg"),
            ffprobe_path: find_binary("ffprobe"),
            video_codec: "libx264".to_string(),
            preset: Some("medium".to_string()),
            crf: Some(20),
            pixel_format: "yuv420p".to_string(),
            extra_output_args: Vec::new(),
        }
    }
}

impl FfmpegConfig {
    /// Check if ffmpeg is available
    pub async fn check_available(&self) -> bool {
        Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Decoder arguments: input file to raw RGB24 on stdout.
    ///
    /// Autorotation is off so decoded frames keep the stored geometry that
    /// ffprobe reports.
    fn decode_args(&self, input: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-noautorotate",
            "-i",
        ]
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
        args.push(input.to_string_lossy().to_string());
        args.extend(
            ["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]
                .iter()
                .map(std::string::ToString::to_string),
        );
        args
    }

    /// Encoder arguments: raw RGB24 on stdin to the output file
    fn encode_args(&self, info: &VideoInfo, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
        ]
        .iter()
        .map(std::string::ToString::to_string)
        .collect();

        args.push("-s".to_string());
        args.push(format!("{}x{}", info.width, info.height));
        args.push("-framerate".to_string());
        args.push(info.frame_rate.to_string());
        args.push("-i".to_string());
        args.push("pipe:0".to_string());

        args.push("-c:v".to_string());
        args.push(self.video_codec.clone());
        if let Some(ref preset) = self.preset {
            args.push("-preset".to_string());
            args.push(preset.clone());
        }
        if let Some(crf) = self.crf {
            args.push("-crf".to_string());
            args.push(crf.to_string());
        }
        args.push("-pix_fmt".to_string());
        args.push(self.pixel_format.clone());
        args.extend(self.extra_output_args.clone());

        args.push(output.to_string_lossy().to_string());
        args
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeTags {
    rotate: Option<String>,
}

impl FfprobeStream {
    /// Display rotation in degrees, from the display matrix or the legacy tag
    fn rotation(&self) -> Option<i32> {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|sd| sd.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse().ok())
            })?;
        let degrees = degrees.round() as i32;
        (degrees % 360 != 0).then_some(degrees)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Read video stream metadata with ffprobe
pub async fn probe(ffprobe_path: &str, video: &Path) -> Result<VideoInfo> {
    let output = Command::new(ffprobe_path)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(video)
        .output()
        .await?;

    if !output.status.success() {
        return Err(OverlayError::Ffmpeg(format!(
            "ffprobe failed on {}",
            video.display()
        )));
    }

    parse_probe(&output.stdout)
}

fn parse_probe(json: &[u8]) -> Result<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| OverlayError::Ffmpeg("No video stream found".to_string()))?;

    // Unparseable rates become 0/1 so the pipeline rejects them as InvalidRate
    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(FrameRate::parse)
        .unwrap_or(FrameRate::new(0, 1));

    let duration_secs = stream
        .duration
        .as_deref()
        .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse().ok());

    let rotation = stream.rotation();
    if let Some(degrees) = rotation {
        warn!("Video has {degrees} degree rotation metadata; frames are processed as stored");
    }

    Ok(VideoInfo {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        frame_rate,
        frame_count: stream.nb_frames.as_deref().and_then(|n| n.parse().ok()),
        duration_secs,
        rotation,
    })
}

/// Collect a child's stderr in the background so it cannot fill its pipe
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf).await;
        buf
    }))
}

async fn stderr_text(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(h) => h.await.unwrap_or_default().trim().to_string(),
        None => String::new(),
    }
}

struct Decoder {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
}

/// Frame source decoding a video file through ffmpeg
pub struct FfmpegSource {
    config: FfmpegConfig,
    input: PathBuf,
    info: VideoInfo,
    decoder: Option<Decoder>,
    ended: bool,
}

impl FfmpegSource {
    /// Probe `input` and prepare a decoder for it
    pub async fn open(config: FfmpegConfig, input: &Path) -> Result<Self> {
        let info = probe(&config.ffprobe_path, input).await?;
        info!(
            "Source {}: {}x{} @ {} fps",
            input.display(),
            info.width,
            info.height,
            info.frame_rate
        );
        Ok(Self::with_info(config, input, info))
    }

    /// Use already-known metadata instead of probing
    #[must_use]
    pub fn with_info(config: FfmpegConfig, input: &Path, info: VideoInfo) -> Self {
        Self {
            config,
            input: input.to_path_buf(),
            info,
            decoder: None,
            ended: false,
        }
    }

    fn spawn_decoder(&self) -> io::Result<Decoder> {
        let args = self.config.decode_args(&self.input);
        debug!("Running ffmpeg decoder with args: {:?}", args);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("ffmpeg decoder has no stdout"))?;
        let stderr = drain_stderr(&mut child);

        Ok(Decoder {
            child,
            stdout,
            stderr,
        })
    }

    /// Called once the decoder's stdout hits EOF on a frame boundary
    async fn finish_decoder(&mut self) -> io::Result<()> {
        self.ended = true;
        let Some(mut decoder) = self.decoder.take() else {
            return Ok(());
        };
        let status = decoder.child.wait().await?;
        if status.success() {
            return Ok(());
        }
        let stderr = stderr_text(decoder.stderr).await;
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("ffmpeg decoder exited with {status}: {stderr}"),
        ))
    }
}

#[async_trait]
impl FrameSource for FfmpegSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    async fn read_frame(&mut self) -> io::Result<Option<Frame>> {
        if self.ended {
            return Ok(None);
        }
        if self.decoder.is_none() {
            self.decoder = Some(self.spawn_decoder()?);
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(None);
        };

        let len = Frame::byte_len(self.info.width, self.info.height);
        let mut data = vec![0u8; len];
        let mut filled = 0;

        while filled < len {
            let n = decoder.stdout.read(&mut data[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            self.finish_decoder().await?;
            return Ok(None);
        }
        if filled < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated frame: got {filled} of {len} bytes"),
            ));
        }

        Ok(Some(Frame {
            width: self.info.width,
            height: self.info.height,
            data,
        }))
    }

    async fn close(&mut self) -> io::Result<()> {
        self.ended = true;
        if let Some(mut decoder) = self.decoder.take() {
            // Stopping early: the decoder may still be running
            if decoder.child.try_wait()?.is_none() {
                decoder.child.kill().await?;
            }
        }
        Ok(())
    }
}

struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
}

/// Frame sink encoding to a video file through ffmpeg
pub struct FfmpegSink {
    config: FfmpegConfig,
    output: PathBuf,
    info: VideoInfo,
    encoder: Option<Encoder>,
    frames_written: u64,
    closed: bool,
}

impl FfmpegSink {
    /// Prepare an encoder writing `info`-shaped frames to `output`
    #[must_use]
    pub fn new(config: FfmpegConfig, output: &Path, info: VideoInfo) -> Self {
        Self {
            config,
            output: output.to_path_buf(),
            info,
            encoder: None,
            frames_written: 0,
            closed: false,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn spawn_encoder(&self) -> io::Result<Encoder> {
        let args = self.config.encode_args(&self.info, &self.output);
        debug!("Running ffmpeg encoder with args: {:?}", args);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        let stderr = drain_stderr(&mut child);

        Ok(Encoder {
            child,
            stdin,
            stderr,
        })
    }

    /// Close stdin and wait for ffmpeg to finalize the container
    async fn close_encoder(&mut self) -> io::Result<()> {
        self.closed = true;
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };
        if let Some(mut stdin) = encoder.stdin.take() {
            // The encoder may already be gone; its exit status tells why
            if let Err(e) = stdin.shutdown().await {
                warn!("Failed to close encoder input: {e}");
            }
        }
        let status = encoder.child.wait().await?;
        if status.success() {
            return Ok(());
        }
        let stderr = stderr_text(encoder.stderr).await;
        Err(io::Error::other(format!(
            "ffmpeg encoder exited with {status}: {stderr}"
        )))
    }
}

#[async_trait]
impl FrameSink for FfmpegSink {
    async fn write_frame(&mut self, frame: Frame) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "encoder closed"));
        }
        if frame.width != self.info.width || frame.height != self.info.height {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame is {}x{}, encoder expects {}x{}",
                    frame.width, frame.height, self.info.width, self.info.height
                ),
            ));
        }
        if self.encoder.is_none() {
            self.encoder = Some(self.spawn_encoder()?);
        }
        let stdin = self
            .encoder
            .as_mut()
            .and_then(|e| e.stdin.as_mut())
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "encoder input closed"))?;

        stdin.write_all(&frame.data).await?;
        self.frames_written += 1;
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        info!(
            "Finalizing {} ({} frames)",
            self.output.display(),
            self.frames_written
        );
        self.close_encoder().await
    }

    async fn abort(&mut self) -> io::Result<()> {
        warn!(
            "Stopping encoder for {} after {} frames",
            self.output.display(),
            self.frames_written
        );
        self.close_encoder().await
    }
}
