//! Live preview over a still frame.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use halfframe_core::preview::CpuPreviewBackend;
use halfframe_core::{Engine, PreviewBackend, PreviewStrategy};

use super::EngineArgs;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Tint,
    Matrix,
    Lut,
}

impl From<StrategyArg> for PreviewStrategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::Tint => PreviewStrategy::Tint,
            StrategyArg::Matrix => PreviewStrategy::Matrix,
            StrategyArg::Lut => PreviewStrategy::Lut,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

/// Arguments for the `preview` command.
#[derive(Args)]
pub struct PreviewArgs {
    /// Input frame
    pub input: PathBuf,

    /// Output image
    #[arg(short, long)]
    pub output: PathBuf,

    /// Film stock id (default: the catalog's default stock)
    #[arg(short, long)]
    pub film: Option<String>,

    /// Preferred strategy; cheaper ones are used when unavailable
    #[arg(long, value_enum, default_value = "lut")]
    pub strategy: StrategyArg,

    /// Where the filter runs
    #[arg(long, value_enum, default_value = "cpu")]
    pub backend: BackendArg,
}

/// Run the preview command.
pub fn run(args: PreviewArgs, engine_args: &EngineArgs) -> Result<()> {
    let engine = engine_args.build()?;
    match args.backend {
        BackendArg::Cpu => {
            let backend = CpuPreviewBackend::new(engine.config().preview_lut_dimension);
            run_with(&engine, backend, &args)
        }
        #[cfg(feature = "gpu")]
        BackendArg::Gpu => {
            let backend = halfframe_gpu::GpuPreviewBackend::create_blocking().context("Failed to open GPU device")?;
            run_with(&engine, backend, &args)
        }
    }
}

fn run_with<B: PreviewBackend>(engine: &Engine, backend: B, args: &PreviewArgs) -> Result<()> {
    let mut frame = image::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?
        .to_rgba8();
    let (width, height) = frame.dimensions();

    let preview = engine.live_preview(backend, args.strategy.into());
    let film = args
        .film
        .clone()
        .unwrap_or_else(|| engine.registry().default_stock().id.clone());
    let plan = preview.select(&film);
    let strategy = plan.filter.strategy().map_or("passthrough", PreviewStrategy::as_str);

    let started = Instant::now();
    let filtered = preview.process_raw(width, height, &mut frame);
    let elapsed = started.elapsed().as_secs_f64() * 1000.0;

    frame
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!(
        "{} -> {} ({}, {strategy} on {}, {elapsed:.1}ms{})",
        args.input.display(),
        args.output.display(),
        plan.film_id,
        preview.backend_name(),
        if filtered { "" } else { ", unfiltered" }
    );
    Ok(())
}
