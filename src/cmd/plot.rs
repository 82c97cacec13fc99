use std::path::Path;

use anyhow::{Context, Result};

use telemetry_overlay::write_performance_plot;

use super::load_telemetry;

pub fn cmd_plot(telemetry: &Path, output: &Path) -> Result<()> {
    let store = load_telemetry(telemetry)?;
    write_performance_plot(&store, output)
        .with_context(|| format!("failed to write plot {}", output.display()))?;
    println!("{}", output.display());
    Ok(())
}
