//! LUT inspection command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use halfframe_core::{Lut3D, LutAtlas};

use super::{EngineArgs, read_text};

/// Probe colours reported for every LUT.
const PROBES: [(&str, [f32; 3]); 5] = [
    ("black", [0.0, 0.0, 0.0]),
    ("mid grey", [0.5, 0.5, 0.5]),
    ("white", [1.0, 1.0, 1.0]),
    ("skin", [0.87, 0.67, 0.55]),
    ("sky", [0.45, 0.65, 0.9]),
];

/// Arguments for the `inspect-lut` command.
#[derive(Args)]
pub struct InspectLutArgs {
    /// A .cube file, or the reference of a bundled / registered LUT
    pub lut: String,

    /// Also write the baked preview atlas as a PNG
    #[arg(long)]
    pub atlas: Option<PathBuf>,
}

/// Run the inspect-lut command.
pub fn run(args: InspectLutArgs, engine_args: &EngineArgs) -> Result<()> {
    let path = Path::new(&args.lut);
    let lut: Arc<Lut3D> = if path.is_file() {
        let lut = Lut3D::parse_cube(&read_text(path)?)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Arc::new(lut)
    } else {
        engine_args
            .build()?
            .luts()
            .load(&args.lut)
            .with_context(|| format!("No LUT file or reference named {:?}", args.lut))?
    };

    let title = if lut.title().is_empty() { "(untitled)" } else { lut.title() };
    println!("title:    {title}");
    println!("size:     {0}x{0}x{0} ({1} entries)", lut.size(), lut.samples().len());
    println!("identity: {}", lut.is_identity(1e-4));
    for (name, rgb) in PROBES {
        let [r, g, b] = lut.sample(rgb);
        println!(
            "  {name:<9} ({:.3}, {:.3}, {:.3}) -> ({r:.3}, {g:.3}, {b:.3})",
            rgb[0], rgb[1], rgb[2]
        );
    }

    if let Some(out) = &args.atlas {
        let atlas = LutAtlas::bake(&lut);
        let image = image::RgbaImage::from_raw(atlas.width(), atlas.height(), atlas.as_bytes().to_vec())
            .context("Atlas buffer does not match its dimensions")?;
        image
            .save(out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        println!("atlas:    {}x{} -> {}", atlas.width(), atlas.height(), out.display());
    }
    Ok(())
}
