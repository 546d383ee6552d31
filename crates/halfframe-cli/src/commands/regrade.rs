//! Re-grade command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::EngineArgs;

/// Arguments for the `regrade` command.
#[derive(Args)]
pub struct RegradeArgs {
    /// Image(s) to re-grade; each is kept and a sibling is written
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Film stock id
    #[arg(short, long)]
    pub film: String,
}

/// Run the regrade command.
pub fn run(args: RegradeArgs, engine_args: &EngineArgs) -> Result<()> {
    let compositor = engine_args.build()?.compositor();
    for input in &args.input {
        let result = compositor
            .regrade(input, &args.film)
            .with_context(|| format!("Failed to regrade {}", input.display()))?;
        println!("{} -> {} ({})", input.display(), result.path.display(), result.film_name);
    }
    Ok(())
}
