//! Speed-colored track map
//!
//! Renders the GPS trace as a standalone Leaflet page. Each segment between
//! consecutive samples is colored from red (slowest) to blue (fastest).

use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::telemetry::{Result, TelemetryError, TelemetryStore};

const LEAFLET_VERSION: &str = "1.9.4";
const ZOOM_START: u8 = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Segment {
    points: [[f64; 2]; 2],
    color: String,
}

/// `#RR00BB` color for a speed normalized to `[0, 1]`
#[must_use]
pub fn speed_color(normalized: f64) -> String {
    let n = normalized.clamp(0.0, 1.0);
    let red = (255.0 * (1.0 - n)) as u8;
    let blue = (255.0 * n) as u8;
    format!("#{red:02x}00{blue:02x}")
}

fn segments(store: &TelemetryStore) -> Vec<Segment> {
    let samples = store.samples();
    let (min, max) = samples
        .iter()
        .map(|s| s.speed)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;

    samples
        .windows(2)
        .map(|pair| {
            // Constant speed has no range to normalize over
            let n = if span > 0.0 {
                (pair[0].speed - min) / span
            } else {
                0.0
            };
            Segment {
                points: [[pair[0].lat, pair[0].lon], [pair[1].lat, pair[1].lon]],
                color: speed_color(n),
            }
        })
        .collect()
}

/// Build the HTML page for a recording
pub fn render_track_map(store: &TelemetryStore) -> Result<String> {
    if store.is_empty() {
        return Err(TelemetryError::EmptyStore);
    }

    let samples = store.samples();
    let count = samples.len() as f64;
    let center_lat = samples.iter().map(|s| s.lat).sum::<f64>() / count;
    let center_lon = samples.iter().map(|s| s.lon).sum::<f64>() / count;

    let segments_json = serde_json::to_string(&segments(store)).map_err(std::io::Error::from)?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Track Map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const map = L.map("map").setView([{center_lat}, {center_lon}], {ZOOM_START});
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
const segments = {segments_json};
for (const seg of segments) {{
  L.polyline(seg.points, {{ color: seg.color, weight: 2, opacity: 0.8 }}).addTo(map);
}}
</script>
</body>
</html>
"#
    ))
}

/// Write the track map page to `path`
pub fn write_track_map(store: &TelemetryStore, path: &Path) -> Result<()> {
    let html = render_track_map(store)?;
    std::fs::write(path, html)?;
    info!("Wrote track map to {}", path.display());
    Ok(())
}
