//! CSV telemetry log loader
//!
//! Reads a header-first delimited log as written by the data logger:
//!
//! ```text
//! timestamp,lat,lon,speed,rpm,boost,accel_x,accel_y,lap_time
//! 0,51.5012,-0.1420,42.5,3100,4.2,0.12,0.30,
//! 100,51.5013,-0.1421,43.1,3180,4.6,0.15,0.28,61.204
//! ```
//!
//! Extra columns are ignored. `lap_time` and `g_force` are optional; an empty
//! cell means the sample has no value for that field.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use super::{Result, Sample, TelemetryError, TelemetryStore};

/// Columns every telemetry log must provide
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "timestamp", "lat", "lon", "speed", "rpm", "boost", "accel_x", "accel_y",
];

#[derive(Debug, Deserialize)]
struct Row {
    timestamp: f64,
    lat: f64,
    lon: f64,
    speed: f64,
    rpm: f64,
    boost: f64,
    accel_x: f64,
    accel_y: f64,
    #[serde(default)]
    g_force: Option<f64>,
    #[serde(default)]
    lap_time: Option<f64>,
}

impl Row {
    fn into_sample(self, line: u64) -> Result<Sample> {
        if !self.timestamp.is_finite() {
            return Err(TelemetryError::Parse {
                line,
                message: format!("timestamp must be finite, got {}", self.timestamp),
            });
        }

        let g_force = self
            .g_force
            .filter(|g| g.is_finite())
            .unwrap_or_else(|| Sample::derive_g_force(self.accel_x, self.accel_y));

        Ok(Sample {
            timestamp_ms: self.timestamp,
            lat: self.lat,
            lon: self.lon,
            speed: self.speed,
            rpm: self.rpm,
            boost: self.boost,
            accel_x: self.accel_x,
            accel_y: self.accel_y,
            g_force,
            lap_time: self.lap_time.filter(|t| t.is_finite()),
        })
    }
}

/// Parse a telemetry log from any reader
pub fn parse_csv<R: Read>(reader: R) -> Result<TelemetryStore> {
    let mut rdr = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(TelemetryError::MissingColumn(column.to_string()));
        }
    }
    debug!("Telemetry columns: {:?}", headers);

    let mut samples = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, ::csv::Position::line);
        let row: Row = record.deserialize(Some(&headers))?;
        samples.push(row.into_sample(line)?);
    }

    TelemetryStore::new(samples)
}

/// Load a telemetry log from disk
pub fn load_csv(path: &Path) -> Result<TelemetryStore> {
    let file = std::fs::File::open(path)?;
    let store = parse_csv(std::io::BufReader::new(file))?;
    info!(
        "Loaded {} telemetry samples ({:.1}s) from {}",
        store.len(),
        store.duration_ms() / 1000.0,
        path.display()
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
timestamp,lat,lon,speed,rpm,boost,accel_x,accel_y,lap_time
0,51.5,-0.14,42.5,3100,4.2,0.6,0.8,
100,51.6,-0.15,43.1,3180,4.6,0.15,0.28,61.204
";

    #[test]
    fn parses_rows_and_optional_lap_time() {
        let store = parse_csv(LOG.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);

        let first = store.get(0).unwrap();
        assert!(first.timestamp_ms.abs() < f64::EPSILON);
        assert!((first.rpm - 3100.0).abs() < f64::EPSILON);
        assert!((first.g_force - 1.0).abs() < 1e-9);
        assert_eq!(first.lap_time, None);

        let second = store.get(1).unwrap();
        assert!((second.timestamp_ms - 100.0).abs() < f64::EPSILON);
        assert_eq!(second.lap_time, Some(61.204));
    }

    #[test]
    fn fractional_timestamps_are_kept() {
        let log = "timestamp,lat,lon,speed,rpm,boost,accel_x,accel_y\n0.0,0,0,1,0,0,0,0\n10.4,0,0,2,0,0,0,0\n";
        let store = parse_csv(log.as_bytes()).unwrap();
        assert!((store.get(1).unwrap().timestamp_ms - 10.4).abs() < f64::EPSILON);
        // 5.1ms from the first sample, 5.3ms from the second
        assert_eq!(store.nearest_index(5.1).unwrap(), 0);
    }

    #[test]
    fn lap_time_column_is_optional() {
        let log = "timestamp,lat,lon,speed,rpm,boost,accel_x,accel_y\n0,0,0,10,900,0,0,0\n";
        let store = parse_csv(log.as_bytes()).unwrap();
        assert_eq!(store.get(0).unwrap().lap_time, None);
    }

    #[test]
    fn logged_g_force_wins_over_derived() {
        let log = "timestamp,lat,lon,speed,rpm,boost,accel_x,accel_y,g_force\n0,0,0,0,0,0,0.6,0.8,1.35\n";
        let store = parse_csv(log.as_bytes()).unwrap();
        assert!((store.get(0).unwrap().g_force - 1.35).abs() < f64::EPSILON);
    }

    #[test]
    fn extra_columns_and_whitespace_are_tolerated() {
        let log = " timestamp , lat,lon,speed,rpm,boost,throttle,accel_x,accel_y\n 5 ,1,2,3,4,5,99, 0 , 0 \n";
        let store = parse_csv(log.as_bytes()).unwrap();
        assert!((store.get(0).unwrap().timestamp_ms - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_column_is_reported() {
        let log = "timestamp,lat,lon,speed,rpm,accel_x,accel_y\n0,0,0,0,0,0,0\n";
        match parse_csv(log.as_bytes()) {
            Err(TelemetryError::MissingColumn(col)) => assert_eq!(col, "boost"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn garbage_value_is_a_csv_error() {
        let log = "timestamp,lat,lon,speed,rpm,boost,accel_x,accel_y\n0,0,0,fast,0,0,0,0\n";
        assert!(matches!(
            parse_csv(log.as_bytes()),
            Err(TelemetryError::Csv(_))
        ));
    }

    #[test]
    fn header_only_log_gives_empty_store() {
        let log = "timestamp,lat,lon,speed,rpm,boost,accel_x,accel_y\n";
        assert!(parse_csv(log.as_bytes()).unwrap().is_empty());
    }
}
