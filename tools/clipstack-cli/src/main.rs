//! Clipstack CLI — Compose two clips into one vertically stacked video.
//!
//! Usage:
//!   clipstack compose [OPTIONS]   Stack a main clip over an overlay clip
//!   clipstack probe <PATH>        Show a clip's geometry and duration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "clipstack",
    about = "Split-screen video composition driven by ffmpeg",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a main clip and an overlay clip into one stacked output
    Compose {
        /// Main clip (top of the stack, audio source)
        #[arg(short, long, default_value = "clip1.mp4")]
        main: PathBuf,

        /// Overlay clip (bottom of the stack)
        #[arg(short = 'l', long, default_value = "overlay.mp4")]
        overlay: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,

        /// Fraction of the output height given to the main clip (0..1)
        #[arg(long)]
        main_fraction: Option<f64>,

        /// Encoder speed preset
        #[arg(long)]
        preset: Option<String>,

        /// Constant rate factor (quality knob, lower = better)
        #[arg(long)]
        crf: Option<u32>,

        /// Seed for the overlay offset draw (reproducible runs)
        #[arg(long)]
        seed: Option<u64>,

        /// Kill the encoder after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Show a clip's geometry and duration
    Probe {
        /// Path to the media file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = clipstack_common::config::AppConfig::load();
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    clipstack_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Compose {
            main,
            overlay,
            output,
            main_fraction,
            preset,
            crf,
            seed,
            timeout_secs,
        } => {
            commands::compose::run(
                &config,
                main,
                overlay,
                output,
                main_fraction,
                preset,
                crf,
                seed,
                timeout_secs,
            )
            .await
        }
        Commands::Probe { path } => commands::probe::run(path),
    }
}
