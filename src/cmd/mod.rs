pub mod analyze;
pub mod map;
pub mod overlay;
pub mod plot;
pub mod probe;

use std::path::Path;

use anyhow::{Context, Result};

use telemetry_overlay::{load_csv, TelemetryStore};

/// Load a telemetry log for a command
pub fn load_telemetry(path: &Path) -> Result<TelemetryStore> {
    let store = load_csv(path)
        .with_context(|| format!("failed to load telemetry from {}", path.display()))?;
    eprintln!("📈 Telemetry: {} samples from {}", store.len(), path.display());
    Ok(store)
}
