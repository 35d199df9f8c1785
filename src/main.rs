// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "procam-touch")]
#[command(about = "Touch detection and tracking for projector-camera setups")]
#[command(version = procam_touch::constants::app_info::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the touch pipeline on a synthetic depth camera
    Simulate {
        /// Number of depth frames to process
        #[arg(short, long, default_value = "90")]
        frames: u64,

        /// Number of simulated fingers (even ones touch, odd ones hover)
        #[arg(long, default_value = "2")]
        fingers: usize,

        /// Candidate cap for touches on the surface (0 disables)
        #[arg(long)]
        precision_2d: Option<usize>,

        /// Candidate cap for touches above the surface (0 disables)
        #[arg(long)]
        precision_3d: Option<usize>,

        /// Map raw sensor points instead of projector rays
        #[arg(long)]
        raw_depth: bool,

        /// Report touches outside the screen bounds
        #[arg(long)]
        outsiders: bool,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control the log level, e.g. RUST_LOG=procam_touch=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            frames,
            fingers,
            precision_2d,
            precision_3d,
            raw_depth,
            outsiders,
        } => cli::simulate(cli::SimulateOptions {
            frames,
            fingers,
            precision_2d,
            precision_3d,
            raw_depth,
            outsiders,
        }),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::show_config(),
            ConfigAction::Init { force } => cli::init_config(force),
            ConfigAction::Path => cli::print_config_path(),
        },
    }
}
