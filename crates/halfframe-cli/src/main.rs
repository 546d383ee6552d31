//! halfframe - film-emulation capture pipeline, offline.
//!
//! Runs the same compositor and preview code the camera app uses over files
//! on disk.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "halfframe")]
#[command(author, version, about = "Half-frame film emulation pipeline")]
#[command(long_about = "
Grade photos with film stock emulations, the way the camera does at capture.

Examples:
  halfframe films                                 # List film stocks
  halfframe process shot.jpg --film kodak_250d --grain --date-stamp
  halfframe process shot.jpg --polaroid --location \"Lisbon\"
  halfframe regrade shot_processed.jpg --film vintage_overlay
  halfframe inspect-lut look.cube --atlas atlas.png
  halfframe preview frame.png --strategy matrix -o preview.png
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    engine: commands::EngineArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Process captures: crop, grade, vignette, grain, overlays
    #[command(visible_alias = "p")]
    Process(commands::process::ProcessArgs),

    /// Re-grade existing images with another film stock
    Regrade(commands::regrade::RegradeArgs),

    /// List the film stock catalog
    Films(commands::films::FilmsArgs),

    /// Parse a .cube file (or bundled LUT) and report on it
    #[command(name = "inspect-lut")]
    InspectLut(commands::inspect_lut::InspectLutArgs),

    /// Run the live preview filter over a still frame
    Preview(commands::preview::PreviewArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process(args) => commands::process::run(args, &cli.engine),
        Commands::Regrade(args) => commands::regrade::run(args, &cli.engine),
        Commands::Films(args) => commands::films::run(args, &cli.engine),
        Commands::InspectLut(args) => commands::inspect_lut::run(args, &cli.engine),
        Commands::Preview(args) => commands::preview::run(args, &cli.engine),
    }
}
