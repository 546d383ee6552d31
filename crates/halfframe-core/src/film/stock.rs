//! Film stock catalog entry.

use crate::config::RgbaColor;
use crate::transform::ColorMatrix;

/// An immutable film stock definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmStock {
    /// Stable identifier, unique within a registry.
    pub id: String,
    pub display_name: String,
    /// Short label used for the Polaroid watermark.
    pub short_label: String,
    pub description: String,
    /// Final-quality fallback transform when no LUT is available.
    pub color_matrix: ColorMatrix,
    /// Real-time approximation used by the live preview matrix strategy.
    pub preview_matrix: ColorMatrix,
    /// LUT store reference; preferred over the matrix when it loads.
    pub lut_reference: Option<String>,
    /// Grain density/opacity in `[0, 1]`.
    pub grain_intensity: f32,
    /// Flat preview overlay approximating the stock's overall hue shift.
    pub overlay_tint: RgbaColor,
    pub is_black_and_white: bool,
}

impl FilmStock {
    /// The colour matrix as applied, collapsed to luminance for monochrome
    /// stocks.
    pub fn effective_matrix(&self) -> ColorMatrix {
        self.monochrome(self.color_matrix)
    }

    /// The preview matrix as applied, collapsed to luminance for monochrome
    /// stocks.
    pub fn effective_preview_matrix(&self) -> ColorMatrix {
        self.monochrome(self.preview_matrix)
    }

    fn monochrome(&self, m: ColorMatrix) -> ColorMatrix {
        if self.is_black_and_white {
            m.then(&ColorMatrix::luminance())
        } else {
            m
        }
    }

    /// Whether grading with this stock leaves colours untouched.
    pub fn is_neutral(&self) -> bool {
        self.lut_reference.is_none() && self.effective_matrix().is_identity()
    }
}
