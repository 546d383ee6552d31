//! Film catalog listing.

use anyhow::Result;
use clap::Args;
use halfframe_core::{ColorTransform, FilmStock, LutStore};
use serde_json::json;

use super::EngineArgs;

/// Arguments for the `films` command.
#[derive(Args)]
pub struct FilmsArgs {
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Run the films command.
pub fn run(args: FilmsArgs, engine_args: &EngineArgs) -> Result<()> {
    let engine = engine_args.build()?;
    let registry = engine.registry();
    let default_id = &registry.default_stock().id;

    if args.json {
        let stocks: Vec<_> = registry
            .iter()
            .map(|stock| stock_json(stock, engine.luts(), &stock.id == default_id))
            .collect();
        println!("{}", serde_json::to_string_pretty(&stocks)?);
        return Ok(());
    }

    println!("{:<18} {:<10} {:<28} {:<8} {:>6}", "ID", "LABEL", "NAME", "GRADE", "GRAIN");
    for stock in registry.iter() {
        let marker = if &stock.id == default_id { "*" } else { "" };
        println!(
            "{:<18} {:<10} {:<28} {:<8} {:>6.2}",
            format!("{}{marker}", stock.id),
            stock.short_label,
            stock.display_name,
            ColorTransform::for_stock(stock, engine.luts()).kind(),
            stock.grain_intensity
        );
    }
    Ok(())
}

fn stock_json(stock: &FilmStock, luts: &LutStore, is_default: bool) -> serde_json::Value {
    json!({
        "id": stock.id,
        "name": stock.display_name,
        "label": stock.short_label,
        "description": stock.description,
        "lut": stock.lut_reference,
        "lut_available": stock.lut_reference.as_deref().is_some_and(|r| luts.contains(r)),
        "grain": stock.grain_intensity,
        "black_and_white": stock.is_black_and_white,
        "default": is_default,
    })
}
