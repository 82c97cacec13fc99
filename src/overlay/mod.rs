//! Telemetry overlay rendering
//!
//! Burns a semi-transparent info panel and the current readouts into a
//! frame, in place:
//!
//! - Speed, RPM, boost and G-force in a dark panel in the lower left
//! - Lap time in the upper right, when the sample has one
//!
//! The layout uses absolute pixel coordinates measured from the frame
//! edges, so the panel keeps its size at every resolution.

pub mod font;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::telemetry::Sample;
use crate::video::Frame;

/// Panel rectangle, in pixels from the left and bottom frame edges.
///
/// Both corners are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRect {
    pub left: u32,
    pub right: u32,
    /// Distance of the top edge above the bottom of the frame
    pub top_from_bottom: u32,
    /// Distance of the bottom edge above the bottom of the frame
    pub bottom_from_bottom: u32,
}

/// Layout and colors of the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub panel: PanelRect,
    pub panel_color: [u8; 3],
    /// Panel weight in the blend, percent (the frame gets the rest)
    pub panel_opacity_percent: u8,
    pub text_color: [u8; 3],
    /// Pixel size of one glyph cell
    pub text_scale: u32,
    /// Left edge of the panel text
    pub text_left: u32,
    /// Baselines of the four panel lines, in pixels above the frame bottom
    pub line_baselines: [u32; 4],
    /// Left edge of the lap readout, in pixels from the right frame edge
    pub lap_from_right: u32,
    /// Baseline of the lap readout, in pixels from the top frame edge
    pub lap_baseline: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            panel: PanelRect {
                left: 10,
                right: 300,
                top_from_bottom: 150,
                bottom_from_bottom: 10,
            },
            panel_color: [0, 0, 0],
            panel_opacity_percent: 30,
            text_color: [255, 255, 255],
            text_scale: 2,
            text_left: 20,
            line_baselines: [120, 90, 60, 30],
            lap_from_right: 200,
            lap_baseline: 30,
        }
    }
}

/// Formatted readouts for one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readouts {
    pub panel: [String; 4],
    pub lap: Option<String>,
}

impl Readouts {
    #[must_use]
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            panel: [
                format!("Speed: {:.0} mph", sample.speed),
                format!("RPM: {:.0}", sample.rpm),
                format!("Boost: {:.1} psi", sample.boost),
                format!("G-Force: {:.2}", sample.g_force),
            ],
            lap: sample.lap_time.map(|lap| format!("Lap: {lap:.3}")),
        }
    }
}

/// Draws telemetry readouts onto frames
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    #[must_use]
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Burn the overlay for `sample` into `frame`
    pub fn render(&self, frame: &mut Frame, sample: &Sample) -> Result<()> {
        frame.validate()?;

        self.blend_panel(frame);

        let readouts = Readouts::from_sample(sample);
        let h = i64::from(frame.height);
        let w = i64::from(frame.width);
        let style = &self.style;

        for (line, baseline) in readouts.panel.iter().zip(style.line_baselines) {
            font::draw_text(
                frame,
                i64::from(style.text_left),
                h - i64::from(baseline),
                line,
                style.text_color,
                style.text_scale,
            );
        }

        if let Some(lap) = &readouts.lap {
            font::draw_text(
                frame,
                w - i64::from(style.lap_from_right),
                i64::from(style.lap_baseline),
                lap,
                style.text_color,
                style.text_scale,
            );
        }

        Ok(())
    }

    /// Alpha-blend the panel fill into its (clipped) region
    fn blend_panel(&self, frame: &mut Frame) {
        let Some((x0, x1, y0, y1)) = self.panel_bounds(frame.width, frame.height) else {
            return;
        };

        let alpha = u16::from(self.style.panel_opacity_percent.min(100));
        let keep = 100 - alpha;
        let fill = self.style.panel_color;

        for y in y0..y1 {
            for px in frame.row_span_mut(y, x0, x1).chunks_exact_mut(3) {
                for (channel, &f) in px.iter_mut().zip(&fill) {
                    let mixed = u16::from(f) * alpha + u16::from(*channel) * keep;
                    *channel = ((mixed + 50) / 100) as u8;
                }
            }
        }
    }

    /// Half-open pixel bounds `(x0, x1, y0, y1)` of the panel, clipped to the frame
    fn panel_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let panel = self.style.panel;
        let h = i64::from(height);

        let x0 = i64::from(panel.left);
        let x1 = i64::from(panel.right) + 1;
        let y0 = h - i64::from(panel.top_from_bottom);
        let y1 = h - i64::from(panel.bottom_from_bottom) + 1;

        let x0 = x0.clamp(0, i64::from(width)) as u32;
        let x1 = x1.clamp(0, i64::from(width)) as u32;
        let y0 = y0.clamp(0, h) as u32;
        let y1 = y1.clamp(0, h) as u32;

        (x0 < x1 && y0 < y1).then_some((x0, x1, y0, y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OverlayError;

    fn sample() -> Sample {
        Sample {
            timestamp_ms: 0.0,
            speed: 87.6,
            rpm: 6421.4,
            boost: 14.26,
            g_force: 1.234,
            ..Default::default()
        }
    }

    #[test]
    fn readout_formatting() {
        let r = Readouts::from_sample(&sample());
        assert_eq!(r.panel[0], "Speed: 88 mph");
        assert_eq!(r.panel[1], "RPM: 6421");
        assert_eq!(r.panel[2], "Boost: 14.3 psi");
        assert_eq!(r.panel[3], "G-Force: 1.23");
        assert_eq!(r.lap, None);

        let with_lap = Sample {
            lap_time: Some(83.4567),
            ..sample()
        };
        assert_eq!(
            Readouts::from_sample(&with_lap).lap.as_deref(),
            Some("Lap: 83.457")
        );
    }

    #[test]
    fn panel_blend_is_thirty_seventy() {
        let mut frame = Frame::filled(640, 480, [200, 100, 10]);
        let renderer = OverlayRenderer::default();
        renderer.blend_panel(&mut frame);

        // Inside the panel: 0.7 * original, rounded
        assert_eq!(frame.pixel(10, 480 - 150), Some([140, 70, 7]));
        assert_eq!(frame.pixel(300, 480 - 10), Some([140, 70, 7]));
        // Just outside every edge: untouched
        assert_eq!(frame.pixel(9, 400), Some([200, 100, 10]));
        assert_eq!(frame.pixel(301, 400), Some([200, 100, 10]));
        assert_eq!(frame.pixel(100, 480 - 151), Some([200, 100, 10]));
        assert_eq!(frame.pixel(100, 480 - 9), Some([200, 100, 10]));
    }

    #[test]
    fn render_leaves_rest_of_frame_alone() {
        let mut frame = Frame::filled(640, 480, [50, 60, 70]);
        OverlayRenderer::default()
            .render(&mut frame, &sample())
            .unwrap();

        // Top half has no panel and no lap readout
        for y in 0..200 {
            for x in 0..640 {
                assert_eq!(frame.pixel(x, y), Some([50, 60, 70]));
            }
        }
        // Some text pixels were drawn inside the panel
        let white = (330..470)
            .flat_map(|y| (10..300).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.pixel(x, y) == Some([255, 255, 255]))
            .count();
        assert!(white > 100);
    }

    #[test]
    fn lap_time_draws_upper_right() {
        let base = Frame::filled(640, 480, [50, 60, 70]);
        let renderer = OverlayRenderer::default();

        let mut without = base.clone();
        renderer.render(&mut without, &sample()).unwrap();

        let mut with = base;
        let lapped = Sample {
            lap_time: Some(61.2),
            ..sample()
        };
        renderer.render(&mut with, &lapped).unwrap();

        let changed_top_right = (0..40)
            .flat_map(|y| (440..640).map(move |x| (x, y)))
            .any(|(x, y)| with.pixel(x, y) != without.pixel(x, y));
        assert!(changed_top_right);
    }

    #[test]
    fn rendering_is_deterministic() {
        let base = Frame::filled(320, 240, [12, 34, 56]);
        let renderer = OverlayRenderer::default();
        let sample = Sample {
            lap_time: Some(5.0),
            ..sample()
        };

        let mut a = base.clone();
        let mut b = base;
        renderer.render(&mut a, &sample).unwrap();
        renderer.render(&mut b, &sample).unwrap();
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn tiny_frame_is_clipped_not_rejected() {
        let mut frame = Frame::filled(16, 16, [100, 100, 100]);
        OverlayRenderer::default()
            .render(&mut frame, &sample())
            .unwrap();
        assert_eq!(frame.data.len(), 16 * 16 * 3);
    }

    #[test]
    fn malformed_frame_rejected() {
        let mut frame = Frame {
            width: 0,
            height: 10,
            data: Vec::new(),
        };
        assert!(matches!(
            OverlayRenderer::default().render(&mut frame, &sample()),
            Err(OverlayError::InvalidFrame { width: 0, height: 10 })
        ));
    }
}
