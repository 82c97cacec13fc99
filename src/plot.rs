//! Multi-panel performance plot
//!
//! Four panels in a 2x2 SVG grid:
//! - Speed vs time
//! - RPM vs time
//! - G-force scatter (lateral vs longitudinal)
//! - Boost vs RPM, colored by speed

use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::telemetry::{Result, Sample, TelemetryError, TelemetryStore};

const WIDTH: f64 = 1500.0;
const HEIGHT: f64 = 1000.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 55.0;
const TICKS: usize = 5;

const LINE_COLOR: &str = "#1f77b4";
const SCATTER_COLOR: &str = "#d62728";

/// Viridis stops, low to high
const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Closed value interval mapped onto one panel axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    min: f64,
    max: f64,
}

impl Extent {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        if (max - min).abs() < f64::EPSILON {
            return Self {
                min: min - 1.0,
                max: max + 1.0,
            };
        }
        let pad = (max - min) * 0.05;
        Self {
            min: min - pad,
            max: max + pad,
        }
    }

    /// Position of `v` as a fraction of the extent
    fn fraction(&self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }

    fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// One plotting area in SVG pixel space
struct Panel {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x: Extent,
    y: Extent,
}

impl Panel {
    fn new(col: u8, row: u8, x: Extent, y: Extent) -> Self {
        let cell_w = WIDTH / 2.0;
        let cell_h = HEIGHT / 2.0;
        Self {
            left: f64::from(col) * cell_w + MARGIN_LEFT,
            top: f64::from(row) * cell_h + MARGIN_TOP,
            width: cell_w - MARGIN_LEFT - MARGIN_RIGHT,
            height: cell_h - MARGIN_TOP - MARGIN_BOTTOM,
            x,
            y,
        }
    }

    fn px(&self, v: f64) -> f64 {
        self.left + self.x.fraction(v) * self.width
    }

    fn py(&self, v: f64) -> f64 {
        self.top + self.height - self.y.fraction(v) * self.height
    }

    fn frame(&self, svg: &mut String, title: &str, x_label: &str, y_label: &str) -> std::fmt::Result {
        let (l, t, w, h) = (self.left, self.top, self.width, self.height);
        writeln!(
            svg,
            r##"<rect x="{l:.1}" y="{t:.1}" width="{w:.1}" height="{h:.1}" fill="none" stroke="#333"/>"##
        )?;
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="16">{title}</text>"#,
            l + w / 2.0,
            t - 12.0
        )?;
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{x_label}</text>"#,
            l + w / 2.0,
            t + h + 42.0
        )?;
        writeln!(
            svg,
            r#"<text transform="translate({:.1},{:.1}) rotate(-90)" text-anchor="middle" font-size="13">{y_label}</text>"#,
            l - 52.0,
            t + h / 2.0
        )?;

        for i in 0..TICKS {
            let f = i as f64 / (TICKS - 1) as f64;
            let xv = self.x.min + f * (self.x.max - self.x.min);
            let yv = self.y.min + f * (self.y.max - self.y.min);
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
                self.px(xv),
                t + h + 16.0,
                tick_label(xv, self.x)
            )?;
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
                l - 6.0,
                self.py(yv) + 4.0,
                tick_label(yv, self.y)
            )?;
        }
        Ok(())
    }

    fn line(&self, svg: &mut String, points: impl Iterator<Item = (f64, f64)>) -> std::fmt::Result {
        let mut path = String::new();
        for (x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            let cmd = if path.is_empty() { 'M' } else { 'L' };
            write!(path, "{cmd}{:.1},{:.1} ", self.px(x), self.py(y))?;
        }
        writeln!(
            svg,
            r#"<path d="{}" fill="none" stroke="{LINE_COLOR}" stroke-width="1.2"/>"#,
            path.trim_end()
        )
    }

    fn dot(&self, svg: &mut String, x: f64, y: f64, color: &str, opacity: f64) -> std::fmt::Result {
        if !x.is_finite() || !y.is_finite() {
            return Ok(());
        }
        writeln!(
            svg,
            r#"<circle cx="{:.1}" cy="{:.1}" r="2" fill="{color}" fill-opacity="{opacity}"/>"#,
            self.px(x),
            self.py(y)
        )
    }

    /// Grid line through zero on each axis that spans it
    fn zero_axes(&self, svg: &mut String) -> std::fmt::Result {
        if self.y.contains(0.0) {
            let y = self.py(0.0);
            writeln!(
                svg,
                r##"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#000" stroke-opacity="0.3"/>"##,
                self.left,
                self.left + self.width
            )?;
        }
        if self.x.contains(0.0) {
            let x = self.px(0.0);
            writeln!(
                svg,
                r##"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="#000" stroke-opacity="0.3"/>"##,
                self.top,
                self.top + self.height
            )?;
        }
        Ok(())
    }
}

fn tick_label(v: f64, extent: Extent) -> String {
    let span = extent.max - extent.min;
    if span >= 100.0 {
        format!("{v:.0}")
    } else if span >= 5.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}

/// Viridis color for a value normalized to `[0, 1]`
fn viridis(normalized: f64) -> String {
    let n = if normalized.is_finite() {
        normalized.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let scaled = n * (VIRIDIS.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let t = scaled - i as f64;
    let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
    let lerp = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(a.0, b.0),
        lerp(a.1, b.1),
        lerp(a.2, b.2)
    )
}

fn seconds(s: &Sample) -> f64 {
    s.timestamp_ms / 1000.0
}

fn build_svg(samples: &[Sample]) -> std::result::Result<String, std::fmt::Error> {
    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;

    let time = Extent::of(samples.iter().map(seconds));
    let rpm = Extent::of(samples.iter().map(|s| s.rpm));

    let speed_panel = Panel::new(0, 0, time, Extent::of(samples.iter().map(|s| s.speed)));
    speed_panel.frame(&mut svg, "Speed vs Time", "Time (s)", "Speed (mph)")?;
    speed_panel.line(&mut svg, samples.iter().map(|s| (seconds(s), s.speed)))?;

    let rpm_panel = Panel::new(1, 0, time, rpm);
    rpm_panel.frame(&mut svg, "RPM vs Time", "Time (s)", "RPM")?;
    rpm_panel.line(&mut svg, samples.iter().map(|s| (seconds(s), s.rpm)))?;

    let g_panel = Panel::new(
        0,
        1,
        Extent::of(samples.iter().map(|s| s.accel_x)),
        Extent::of(samples.iter().map(|s| s.accel_y)),
    );
    g_panel.frame(&mut svg, "G-Force Plot", "Lateral G", "Longitudinal G")?;
    g_panel.zero_axes(&mut svg)?;
    for s in samples {
        g_panel.dot(&mut svg, s.accel_x, s.accel_y, SCATTER_COLOR, 1.0)?;
    }

    let speed = Extent::of(samples.iter().map(|s| s.speed));
    let boost_panel = Panel::new(1, 1, rpm, Extent::of(samples.iter().map(|s| s.boost)));
    boost_panel.frame(&mut svg, "Boost vs RPM", "RPM", "Boost (psi)")?;
    for s in samples {
        let color = viridis(speed.fraction(s.speed));
        boost_panel.dot(&mut svg, s.rpm, s.boost, &color, 0.5)?;
    }

    writeln!(svg, "</svg>")?;
    Ok(svg)
}

/// Build the performance SVG for a recording
pub fn render_performance_svg(store: &TelemetryStore) -> Result<String> {
    if store.is_empty() {
        return Err(TelemetryError::EmptyStore);
    }
    build_svg(store.samples()).map_err(|e| TelemetryError::Io(std::io::Error::other(e)))
}

/// Write the performance SVG to `path`
pub fn write_performance_plot(store: &TelemetryStore, path: &Path) -> Result<()> {
    let svg = render_performance_svg(store)?;
    std::fs::write(path, svg)?;
    info!("Wrote performance plot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TelemetryStore {
        TelemetryStore::new(
            (0..50)
                .map(|i| Sample {
                    timestamp_ms: f64::from(i) * 100.0,
                    speed: 30.0 + i as f64,
                    rpm: 2000.0 + 80.0 * i as f64,
                    boost: -5.0 + 0.4 * i as f64,
                    accel_x: (i as f64 / 8.0).sin(),
                    accel_y: (i as f64 / 8.0).cos() * 0.5,
                    ..Default::default()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn extent_pads_and_handles_degenerate_input() {
        let e = Extent::of([0.0, 10.0].into_iter());
        assert!((e.min + 0.5).abs() < 1e-9 && (e.max - 10.5).abs() < 1e-9);

        let flat = Extent::of([3.0, 3.0].into_iter());
        assert!((flat.min - 2.0).abs() < 1e-9 && (flat.max - 4.0).abs() < 1e-9);

        let none = Extent::of(std::iter::empty());
        assert!((none.max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn viridis_endpoints() {
        assert_eq!(viridis(0.0), "#440154");
        assert_eq!(viridis(1.0), "#fde725");
        assert_eq!(viridis(f64::NAN), "#440154");
    }

    #[test]
    fn svg_has_four_titled_panels() {
        let svg = render_performance_svg(&store()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        for title in ["Speed vs Time", "RPM vs Time", "G-Force Plot", "Boost vs RPM"] {
            assert!(svg.contains(title), "missing {title}");
        }
        // Two scatter panels with one dot per sample
        assert_eq!(svg.matches("<circle").count(), 100);
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn g_panel_draws_zero_axes() {
        let svg = render_performance_svg(&store()).unwrap();
        assert_eq!(svg.matches("stroke-opacity=\"0.3\"").count(), 2);
    }

    #[test]
    fn empty_store_has_no_plot() {
        assert!(render_performance_svg(&TelemetryStore::default()).is_err());
    }
}
