use std::path::Path;

use anyhow::{Context, Result};

use telemetry_overlay::write_track_map;

use super::load_telemetry;

pub fn cmd_map(telemetry: &Path, output: &Path) -> Result<()> {
    let store = load_telemetry(telemetry)?;
    write_track_map(&store, output)
        .with_context(|| format!("failed to write track map {}", output.display()))?;
    println!("{}", output.display());
    Ok(())
}
