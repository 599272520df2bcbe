//! Kino CLI - HLS track inspection tool
//!
//! Features:
//! - Track-list preview for a master playlist
//! - Simulated user track selection
//! - Source classification
//! - Configuration validation

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Kino CLI - HLS media element toolkit
#[derive(Parser)]
#[command(name = "kino-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Inspect HLS track synchronization", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Element configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the track lists an element builds for a master playlist
    Tracks {
        /// Path to master playlist
        playlist: PathBuf,

        /// Select a video track by id, as a user would
        #[arg(long)]
        select_video: Option<String>,

        /// Enable an audio track by id, as a user would
        #[arg(long)]
        select_audio: Option<String>,

        /// Show a subtitle track by label, as a user would
        #[arg(long)]
        show_subtitle: Option<String>,
    },

    /// Classify a source URL
    Classify {
        /// Source URL
        src: String,

        /// MIME type hint
        #[arg(short = 't', long = "type")]
        mime: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Tracks {
            playlist,
            select_video,
            select_audio,
            show_subtitle,
        } => {
            let selections = commands::Selections {
                video: select_video,
                audio: select_audio,
                subtitle: show_subtitle,
            };
            commands::tracks(&playlist, config, selections, &cli.format).await?;
        }
        Commands::Classify { src, mime } => {
            commands::classify(&src, mime.as_deref(), &cli.format)?;
        }
        Commands::Config => {
            commands::show_config(&config, &cli.format)?;
        }
    }

    Ok(())
}
