//! `telemetry-overlay` CLI - Annotate onboard video and analyze telemetry logs

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use telemetry_overlay::AppConfig;

#[derive(Parser)]
#[command(name = "telemetry-overlay")]
#[command(about = "Burn synchronized vehicle telemetry into onboard video")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/telemetry-overlay/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw the telemetry overlay onto every frame of a video
    Overlay {
        /// Telemetry CSV log
        telemetry: PathBuf,

        /// Source video
        video: PathBuf,

        /// Annotated output video
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Shift telemetry lookups by this many milliseconds
        #[arg(long, allow_hyphen_values = true)]
        sync_offset_ms: Option<i64>,
    },

    /// Render the GPS trace as a speed-colored HTML map
    Map {
        /// Telemetry CSV log
        telemetry: PathBuf,

        /// Output HTML file
        #[arg(short, long, default_value = "track_map.html")]
        output: PathBuf,
    },

    /// Render speed, RPM, G-force and boost plots as SVG
    Plot {
        /// Telemetry CSV log
        telemetry: PathBuf,

        /// Output SVG file
        #[arg(short, long, default_value = "performance.svg")]
        output: PathBuf,
    },

    /// Write map, plots, summary and (optionally) an annotated video
    Analyze {
        /// Telemetry CSV log
        telemetry: PathBuf,

        /// Onboard video to annotate
        #[arg(long)]
        video: Option<PathBuf>,

        /// Directory for the generated files
        #[arg(long, default_value = "analysis_output")]
        output_dir: PathBuf,
    },

    /// Show video stream metadata
    Probe {
        /// Video file
        video: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Overlay {
            telemetry,
            video,
            output,
            sync_offset_ms,
        } => {
            cmd::overlay::cmd_overlay(&config, &telemetry, &video, output, sync_offset_ms).await?;
        }
        Commands::Map { telemetry, output } => {
            cmd::map::cmd_map(&telemetry, &output)?;
        }
        Commands::Plot { telemetry, output } => {
            cmd::plot::cmd_plot(&telemetry, &output)?;
        }
        Commands::Analyze {
            telemetry,
            video,
            output_dir,
        } => {
            cmd::analyze::cmd_analyze(&config, &telemetry, video.as_deref(), &output_dir).await?;
        }
        Commands::Probe { video } => {
            cmd::probe::cmd_probe(&config, &video).await?;
        }
    }

    Ok(())
}
