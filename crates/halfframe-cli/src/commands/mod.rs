//! Subcommands and the shared engine setup.

pub mod films;
pub mod inspect_lut;
pub mod preview;
pub mod process;
pub mod regrade;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use halfframe_core::{Engine, FilmRegistry, LutStore, PipelineConfig};

/// Options that shape the engine every subcommand runs on.
#[derive(Args)]
pub struct EngineArgs {
    /// Pipeline config JSON (missing fields keep their defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Film stock catalog JSON replacing the bundled one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Directory of .cube files, registered by file name next to the
    /// bundled LUTs
    #[arg(long, global = true)]
    pub lut_dir: Option<PathBuf>,
}

impl EngineArgs {
    pub fn config(&self) -> Result<PipelineConfig> {
        let config = match &self.config {
            Some(path) => {
                let text = read_text(path)?;
                PipelineConfig::from_json(&text)
                    .with_context(|| format!("Invalid pipeline config {}", path.display()))?
            }
            None => PipelineConfig::default(),
        };
        Ok(config.with_env_overrides())
    }

    pub fn build(&self) -> Result<Engine> {
        let mut builder = Engine::builder().config(self.config()?);

        if let Some(path) = &self.catalog {
            let registry = FilmRegistry::from_json(&read_text(path)?)
                .with_context(|| format!("Invalid film catalog {}", path.display()))?;
            builder = builder.registry(registry);
        }

        if let Some(dir) = &self.lut_dir {
            let store = LutStore::with_builtin();
            let count = register_cube_dir(&store, dir)?;
            tracing::info!(dir = %dir.display(), count, "registered LUT directory");
            builder = builder.luts(store);
        }

        builder.build().context("Failed to build engine")
    }
}

/// Register every `*.cube` in `dir` under its file name.
fn register_cube_dir(store: &LutStore, dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    let mut count = 0;
    for entry in entries {
        let path = entry?.path();
        let is_cube = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("cube"));
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_cube {
            continue;
        }
        store.register_cube_text(name, read_text(&path)?);
        count += 1;
    }
    Ok(count)
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
