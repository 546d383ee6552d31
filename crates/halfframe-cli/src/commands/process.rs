//! Capture processing command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Args;
use halfframe_core::{CaptureOutcome, ProcessingOptions};

use super::EngineArgs;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Arguments for the `process` command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Captured image(s)
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Film stock id (default: the catalog's default stock)
    #[arg(short, long)]
    pub film: Option<String>,

    /// Burn an orange date stamp into the corner
    #[arg(long, conflicts_with = "polaroid")]
    pub date_stamp: bool,

    /// Add film grain
    #[arg(long)]
    pub grain: bool,

    /// Mount in a Polaroid-style frame with a caption strip
    #[arg(long)]
    pub polaroid: bool,

    /// Location line for the Polaroid caption
    #[arg(long, requires = "polaroid")]
    pub location: Option<String>,

    /// Capture time for the stamp/caption, e.g. "2024-03-09 14:05" (default: now)
    #[arg(long, value_parser = parse_timestamp)]
    pub captured_at: Option<NaiveDateTime>,
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .with_context(|| format!("Unrecognised timestamp {s:?}, expected YYYY-MM-DD HH:MM[:SS]"))
}

/// Run the process command.
pub fn run(args: ProcessArgs, engine_args: &EngineArgs) -> Result<()> {
    let engine = engine_args.build()?;
    let film_id = args
        .film
        .unwrap_or_else(|| engine.registry().default_stock().id.clone());
    let worker = engine.capture_worker();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let total = args.input.len();
    let mut kept = 0;
    for input in args.input {
        let options = ProcessingOptions {
            film_id: film_id.clone(),
            add_date_stamp: args.date_stamp,
            add_grain: args.grain,
            add_polaroid_frame: args.polaroid,
            location: args.location.clone(),
            captured_at: args.captured_at,
        };
        let outcome = runtime.block_on(worker.submit(input.clone(), options))?;
        match outcome {
            CaptureOutcome::Processed(result) => println!(
                "{} -> {} ({}x{}, {})",
                input.display(),
                result.path.display(),
                result.width,
                result.height,
                result.film_name
            ),
            CaptureOutcome::Unprocessed { original, reason } => {
                kept += 1;
                eprintln!("{}: kept original ({reason})", original.display());
            }
        }
    }

    if kept > 0 {
        anyhow::bail!("{kept} of {total} capture(s) could not be processed");
    }
    Ok(())
}
