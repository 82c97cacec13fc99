//! Frame-to-telemetry time synchronization
//!
//! Maps a video frame index to the telemetry clock:
//! `timestamp_ms = frame_index / fps * 1000 + sync_offset_ms`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OverlayError, Result};

/// Telemetry timestamp (ms) for a video frame.
///
/// `fps` must be positive and finite.
pub fn frame_timestamp(frame_index: u64, fps: f64, sync_offset_ms: i64) -> Result<f64> {
    validate_fps(fps)?;
    Ok(frame_index as f64 / fps * 1000.0 + sync_offset_ms as f64)
}

/// Reject zero, negative and non-finite frame rates
pub fn validate_fps(fps: f64) -> Result<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(OverlayError::InvalidRate { fps })
    }
}

/// Rational frame rate as reported by container metadata (e.g. `30000/1001`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    #[must_use]
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Parse `num/den` or a bare integer.
    ///
    /// A zero denominator parses; it shows up as a non-finite rate that
    /// [`frame_timestamp`] rejects.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.split_once('/') {
            Some((num, den)) => Some(Self::new(num.trim().parse().ok()?, den.trim().parse().ok()?)),
            None => Some(Self::new(s.parse().ok()?, 1)),
        }
    }

    /// Frames per second as a float
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_fps_maps_to_whole_seconds() {
        assert!((frame_timestamp(0, 1.0, 0).unwrap() - 0.0).abs() < f64::EPSILON);
        assert!((frame_timestamp(1, 1.0, 0).unwrap() - 1000.0).abs() < f64::EPSILON);
        assert!((frame_timestamp(2, 1.0, 0).unwrap() - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn offset_shifts_every_frame() {
        assert!((frame_timestamp(0, 30.0, 500).unwrap() - 500.0).abs() < 1e-9);
        assert!((frame_timestamp(30, 30.0, -250).unwrap() - 750.0).abs() < 1e-9);
    }

    #[test]
    fn monotonic_in_frame_index() {
        for fps in [1.0, 23.976, 29.97, 60.0, 240.0] {
            let mut prev = f64::NEG_INFINITY;
            for i in 0..5000 {
                let t = frame_timestamp(i, fps, -1234).unwrap();
                assert!(t >= prev, "fps {fps} frame {i}");
                prev = t;
            }
        }
    }

    #[test]
    fn rejects_bad_rates() {
        for fps in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                frame_timestamp(3, fps, 0),
                Err(OverlayError::InvalidRate { .. })
            ));
        }
    }

    #[test]
    fn parses_ffprobe_rates() {
        let ntsc = FrameRate::parse("30000/1001").unwrap();
        assert_eq!(ntsc, FrameRate::new(30000, 1001));
        assert!((ntsc.as_f64() - 29.97).abs() < 0.001);

        assert_eq!(FrameRate::parse("25").unwrap(), FrameRate::new(25, 1));
        assert!(FrameRate::parse("abc").is_none());
    }

    #[test]
    fn zero_denominator_is_rejected_downstream() {
        let broken = FrameRate::parse("0/0").unwrap();
        assert!(validate_fps(broken.as_f64()).is_err());
    }
}
