// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use edge_camera::Config;
use edge_camera::backends::camera::CameraBackendType;
use edge_camera::processing::ProcessorKind;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "edge-camera")]
#[command(about = "Live camera preview with edge detection")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Camera backend (overrides the config file)
    #[arg(long, global = true, value_enum)]
    backend: Option<CameraBackendType>,

    /// Frame processor (overrides the config file)
    #[arg(long, global = true, value_enum)]
    processor: Option<ProcessorKind>,

    /// Config file (default: ~/.config/edge-camera/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the preview window (default)
    Run,

    /// List available cameras
    List,

    /// Capture and process without a window, printing the frame rate
    Headless {
        /// How long to run, in seconds
        #[arg(short, long, default_value = "10")]
        seconds: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(processor) = cli.processor {
        config.processor = processor;
    }

    // RUST_LOG wins over the configured filter
    // Examples: RUST_LOG=debug, RUST_LOG=edge_camera=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_filter))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    match cli.command {
        Some(Commands::List) => cli::list_cameras(config.backend),
        Some(Commands::Headless { seconds }) => cli::headless(&config, seconds),
        Some(Commands::Run) | None => {
            edge_camera::app::run(&config)?;
            Ok(())
        }
    }
}
