pub mod colormap;
pub mod completions;
pub mod ingest;
pub mod query;
pub mod stats;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};

use crate::config::Settings;
use crate::error::Result;

/// depthframe - Depth-keyed scanlines to colourised PNG frames
#[derive(Parser, Debug)]
#[command(name = "depthframe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file (defaults to ./depthframe.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest CSV files into the frame store
    Ingest(ingest::IngestArgs),

    /// Look up frames by depth or depth range
    Query(query::QueryArgs),

    /// Render the colour ramp as a gradient PNG
    Colormap(colormap::ColormapArgs),

    /// Show frame count and depth range of the store
    Stats(stats::StatsArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Load settings from `--config`, or discover them in the working directory.
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load(path)?,
        None => Settings::discover(Path::new("."))?,
    };
    settings.validate()?;
    Ok(settings)
}
