//! Film Stock Registry: static catalog keyed by film id.
//!
//! The built-in catalog is a JSON document embedded at build time. Custom
//! catalogs go through the same validation.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use super::stock::FilmStock;
use crate::config::RgbaColor;
use crate::error::RegistryError;
use crate::transform::ColorMatrix;

const BUILTIN_CATALOG: &str = include_str!("../../assets/film_stocks.json");

#[derive(Debug, Deserialize)]
struct CatalogDef {
    default: String,
    stocks: Vec<StockDef>,
}

#[derive(Debug, Deserialize)]
struct StockDef {
    id: String,
    name: String,
    label: String,
    #[serde(default)]
    description: String,
    matrix: [f32; 20],
    #[serde(default)]
    preview_matrix: Option<[f32; 20]>,
    #[serde(default)]
    lut: Option<String>,
    grain: f32,
    overlay_tint: RgbaColor,
    #[serde(default)]
    black_and_white: bool,
}

impl From<StockDef> for FilmStock {
    fn from(def: StockDef) -> Self {
        let color_matrix = ColorMatrix::from_rows(def.matrix);
        Self {
            id: def.id,
            display_name: def.name,
            short_label: def.label,
            description: def.description,
            color_matrix,
            preview_matrix: def.preview_matrix.map_or(color_matrix, ColorMatrix::from_rows),
            lut_reference: def.lut,
            grain_intensity: def.grain,
            overlay_tint: def.overlay_tint,
            is_black_and_white: def.black_and_white,
        }
    }
}

/// Validated, read-only set of film stocks with a default.
#[derive(Debug, Clone)]
pub struct FilmRegistry {
    stocks: Vec<Arc<FilmStock>>,
    default_index: usize,
}

impl FilmRegistry {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog document.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let def: CatalogDef = serde_json::from_str(json)?;
        let stocks = def.stocks.into_iter().map(FilmStock::from).collect();
        Self::from_stocks(stocks, &def.default)
    }

    /// Build from already constructed stocks.
    pub fn from_stocks(stocks: Vec<FilmStock>, default_id: &str) -> Result<Self, RegistryError> {
        if stocks.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for stock in &stocks {
            validate(stock)?;
            if !seen.insert(stock.id.as_str()) {
                return Err(RegistryError::DuplicateId(stock.id.clone()));
            }
        }

        let default_index = stocks
            .iter()
            .position(|s| s.id == default_id)
            .ok_or_else(|| RegistryError::UnknownDefault(default_id.to_string()))?;

        Ok(Self {
            stocks: stocks.into_iter().map(Arc::new).collect(),
            default_index,
        })
    }

    /// Exact lookup.
    pub fn get(&self, id: &str) -> Option<&Arc<FilmStock>> {
        self.stocks.iter().find(|s| s.id == id)
    }

    /// Lookup that falls back to the default stock for unknown ids.
    pub fn resolve(&self, id: &str) -> Arc<FilmStock> {
        match self.get(id) {
            Some(stock) => stock.clone(),
            None => {
                let fallback = self.default_stock();
                tracing::warn!(
                    requested = id,
                    fallback = %fallback.id,
                    "unknown film stock, using default"
                );
                fallback.clone()
            }
        }
    }

    pub fn default_stock(&self) -> &Arc<FilmStock> {
        &self.stocks[self.default_index]
    }

    /// Stocks in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FilmStock>> {
        self.stocks.iter()
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}

fn validate(stock: &FilmStock) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidStock {
        id: stock.id.clone(),
        reason: reason.to_string(),
    };

    if stock.id.trim().is_empty() {
        return Err(invalid("empty id"));
    }
    if !(0.0..=1.0).contains(&stock.grain_intensity) {
        return Err(invalid("grain intensity outside [0, 1]"));
    }
    if !(0.0..=1.0).contains(&stock.overlay_tint.alpha) {
        return Err(invalid("overlay tint alpha outside [0, 1]"));
    }
    let finite = |m: &ColorMatrix| m.to_rows().iter().all(|c| c.is_finite());
    if !finite(&stock.color_matrix) || !finite(&stock.preview_matrix) {
        return Err(invalid("non-finite matrix coefficient"));
    }
    if stock.lut_reference.as_deref().is_some_and(|r| r.trim().is_empty()) {
        return Err(invalid("empty LUT reference"));
    }
    Ok(())
}
