use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coverflu_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "coverflu")]
#[command(author, version, about = "Headless driver for the cover-flow scroller and tile cache")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from this file instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted drag and fling against a synthetic strip
    Simulate {
        /// Number of tiles in the strip
        #[arg(short, long, default_value_t = 20)]
        tiles: usize,
        /// Tile selected before the drag
        #[arg(short, long, default_value_t = 0)]
        start: usize,
        /// Horizontal finger travel in pixels, negative moves left
        #[arg(short, long, default_value_t = -300.0, allow_negative_numbers = true)]
        drag: f32,
        /// How long the drag takes
        #[arg(long, default_value_t = 120)]
        duration_ms: u64,
    },
    /// Decode a directory of images and warm the tile cache in the background
    Preload {
        /// Directory containing the images, one tile per file
        #[arg(short, long)]
        dir: PathBuf,
        /// First tile to load
        #[arg(short, long, default_value_t = 0)]
        start: usize,
        /// One past the last tile to load (defaults to all)
        #[arg(short, long)]
        end: Option<usize>,
    },
    /// Show the effective configuration
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Simulate {
            tiles,
            start,
            drag,
            duration_ms,
        } => commands::simulate::run(&config, tiles, start, drag, duration_ms).await,
        Commands::Preload { dir, start, end } => {
            commands::preload::run(&config, &dir, start, end).await
        }
        Commands::Config { path } => commands::config::run(&config, path),
    }
}
