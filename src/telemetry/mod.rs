//! Telemetry store with nearest-timestamp lookup
//!
//! Holds the time-ordered samples of one recording. The store is built once
//! and is read-only afterwards, so lookups can be shared freely.
//!
//! # Example
//!
//! ```rust
//! use telemetry_overlay::telemetry::{Sample, TelemetryStore};
//!
//! let store = TelemetryStore::new(vec![
//!     Sample { timestamp_ms: 0.0, ..Default::default() },
//!     Sample { timestamp_ms: 1000.0, ..Default::default() },
//! ])?;
//! assert_eq!(store.nearest_sample(400.0)?.timestamp_ms, 0.0);
//! # Ok::<(), telemetry_overlay::telemetry::TelemetryError>(())
//! ```

pub mod csv;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::csv::{load_csv, parse_csv, REQUIRED_COLUMNS};

/// Telemetry loading and lookup errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("telemetry store is empty")]
    EmptyStore,

    #[error("timestamps out of order at sample {index}: {timestamp_ms}ms after {previous_ms}ms")]
    Unsorted {
        index: usize,
        timestamp_ms: f64,
        previous_ms: f64,
    },

    #[error("timestamp of sample {index} is not a finite number")]
    NonFiniteTimestamp { index: usize },

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("invalid value on line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// One timestamped record of vehicle state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since recording start, as logged (may be fractional)
    pub timestamp_ms: f64,
    pub lat: f64,
    pub lon: f64,
    /// Vehicle speed (mph)
    pub speed: f64,
    pub rpm: f64,
    /// Boost pressure (psi)
    pub boost: f64,
    /// Lateral acceleration (G)
    pub accel_x: f64,
    /// Longitudinal acceleration (G)
    pub accel_y: f64,
    /// Combined G magnitude
    pub g_force: f64,
    /// Current lap time in seconds, when the logger provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap_time: Option<f64>,
}

impl Sample {
    /// Combined G magnitude from the lateral and longitudinal components
    #[must_use]
    pub fn derive_g_force(accel_x: f64, accel_y: f64) -> f64 {
        accel_x.hypot(accel_y)
    }
}

/// Aggregate figures for a whole recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub samples: usize,
    pub duration_ms: f64,
    pub max_speed: f64,
    pub avg_speed: f64,
    pub max_rpm: f64,
    pub max_boost: f64,
    pub peak_g: f64,
}

/// Time-ordered, immutable telemetry samples
#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    samples: Vec<Sample>,
}

impl TelemetryStore {
    /// Build a store from samples in arrival order.
    ///
    /// Timestamps must be non-decreasing; duplicates are allowed.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        if let Some(index) = samples.iter().position(|s| !s.timestamp_ms.is_finite()) {
            return Err(TelemetryError::NonFiniteTimestamp { index });
        }
        if let Some(index) = samples
            .windows(2)
            .position(|w| w[1].timestamp_ms < w[0].timestamp_ms)
        {
            return Err(TelemetryError::Unsorted {
                index: index + 1,
                timestamp_ms: samples[index + 1].timestamp_ms,
                previous_ms: samples[index].timestamp_ms,
            });
        }
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Time between the first and last sample
    pub fn duration_ms(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0.0,
        }
    }

    /// Index of the sample closest in time to `timestamp_ms`.
    ///
    /// Ties resolve to the earliest index. Queries outside the recorded
    /// range clamp to the first or last sample.
    pub fn nearest_index(&self, timestamp_ms: f64) -> Result<usize> {
        let Some(last) = self.samples.len().checked_sub(1) else {
            return Err(TelemetryError::EmptyStore);
        };

        // First sample at or after the query
        let right = self
            .samples
            .partition_point(|s| s.timestamp_ms < timestamp_ms);

        if right == 0 {
            return Ok(0);
        }
        if right > last {
            return Ok(self.first_index_of(last));
        }

        let left = right - 1;
        let before = timestamp_ms - self.samples[left].timestamp_ms;
        let after = self.samples[right].timestamp_ms - timestamp_ms;

        if before <= after {
            Ok(self.first_index_of(left))
        } else {
            Ok(right)
        }
    }

    /// Sample closest in time to `timestamp_ms`
    pub fn nearest_sample(&self, timestamp_ms: f64) -> Result<&Sample> {
        let index = self.nearest_index(timestamp_ms)?;
        Ok(&self.samples[index])
    }

    /// Earliest index sharing the timestamp of `index`
    fn first_index_of(&self, index: usize) -> usize {
        let ts = self.samples[index].timestamp_ms;
        self.samples[..index].partition_point(|s| s.timestamp_ms < ts)
    }

    /// Aggregate figures, or `None` for an empty store
    pub fn summary(&self) -> Option<PerformanceSummary> {
        if self.samples.is_empty() {
            return None;
        }

        let max = |f: fn(&Sample) -> f64| {
            self.samples
                .iter()
                .map(f)
                .fold(f64::NEG_INFINITY, f64::max)
        };

        let speed_sum: f64 = self.samples.iter().map(|s| s.speed).sum();

        Some(PerformanceSummary {
            samples: self.samples.len(),
            duration_ms: self.duration_ms(),
            max_speed: max(|s| s.speed),
            avg_speed: speed_sum / self.samples.len() as f64,
            max_rpm: max(|s| s.rpm),
            max_boost: max(|s| s.boost),
            peak_g: max(|s| s.g_force),
        })
    }
}
