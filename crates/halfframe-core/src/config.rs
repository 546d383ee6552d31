//! Pipeline configuration.
//!
//! Every layout fraction and look constant of the compositor lives here. The
//! defaults reproduce the shipped look; none of them are per-call parameters.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default JPEG quality for encoded output.
const DEFAULT_JPEG_QUALITY: u8 = 92;
/// Default working size (longest side) for the CPU preview LUT path.
const DEFAULT_PREVIEW_DIMENSION: u32 = 640;
/// Canvases above this pixel count are refused instead of allocated (~120 MP).
const DEFAULT_MAX_CANVAS_PIXELS: u64 = 120_000_000;

/// Integer aspect ratio, `width:height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Half-frame portrait, 2:3.
    pub const HALF_FRAME: Self = Self {
        width: 2,
        height: 3,
    };
}

/// Colour as 8-bit sRGB plus opacity, as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbaColor {
    pub rgb: [u8; 3],
    pub alpha: f32,
}

impl RgbaColor {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self {
            rgb: [r, g, b],
            alpha: 1.0,
        }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self {
            rgb: [r, g, b],
            alpha,
        }
    }

    /// Normalized straight-alpha `[r, g, b, a]`.
    pub fn to_f32(self) -> [f32; 4] {
        let rgb: palette::Srgb<f32> = palette::Srgb::from(self.rgb).into_format();
        [rgb.red, rgb.green, rgb.blue, self.alpha.clamp(0.0, 1.0)]
    }
}

/// Tunables for the frame compositor and preview approximator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target crop aspect ratio.
    pub crop_aspect: AspectRatio,

    // Polaroid frame
    /// Side/top border, as a fraction of crop width.
    pub polaroid_border_fraction: f64,
    /// Caption strip below the photo, as a fraction of crop height.
    pub polaroid_bottom_fraction: f64,
    /// Instant-film stock colour behind the photo.
    pub polaroid_background: RgbaColor,
    /// Background outside the crop when no frame is drawn.
    pub plain_background: RgbaColor,

    // Vignette
    /// Fraction of the vignette radius that stays fully transparent.
    pub vignette_inner_stop: f32,
    /// Vignette radius as a multiple of the crop's longest side.
    pub vignette_radius_factor: f32,
    /// Black opacity reached at the vignette radius.
    pub vignette_max_opacity: f32,

    // Grain
    /// Dots per pixel of crop area.
    pub grain_density: f64,
    /// Dot opacity per unit of film grain intensity.
    pub grain_alpha_scale: f32,
    pub grain_light: [u8; 3],
    pub grain_dark: [u8; 3],
    /// Fixed seed for grain; `None` draws from OS entropy per job.
    pub grain_seed: Option<u64>,

    // Overlays
    /// Date stamp glyph height as a fraction of crop height.
    pub date_stamp_font_fraction: f32,
    pub date_stamp_color: RgbaColor,
    pub date_stamp_shadow: RgbaColor,
    /// Caption font sizes as fractions of canvas width.
    pub caption_date_fraction: f32,
    pub caption_location_fraction: f32,
    pub caption_watermark_fraction: f32,
    pub caption_date_color: RgbaColor,
    pub caption_location_color: RgbaColor,
    pub caption_watermark_color: RgbaColor,
    /// Font file to prefer; the system sans-serif is used when it can't load.
    pub font_path: Option<PathBuf>,

    // Output
    pub jpeg_quality: u8,
    /// Canvases larger than this are refused with a surface allocation error.
    pub max_canvas_pixels: u64,
    /// Grade a reduced copy at capture time (longest side); `None` grades at
    /// full resolution.
    pub capture_lut_max_dimension: Option<u32>,
    /// Longest side of the reduced copy graded by the CPU preview LUT path.
    pub preview_lut_dimension: u32,
    /// Abandon a capture job after this long and keep the original.
    #[serde(with = "optional_millis")]
    pub job_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crop_aspect: AspectRatio::HALF_FRAME,
            polaroid_border_fraction: 0.04,
            polaroid_bottom_fraction: 0.15,
            polaroid_background: RgbaColor::opaque(0xF5, 0xF3, 0xEE),
            plain_background: RgbaColor::opaque(0, 0, 0),
            vignette_inner_stop: 0.5,
            vignette_radius_factor: 0.7,
            vignette_max_opacity: 0.35,
            grain_density: 0.0003,
            grain_alpha_scale: 0.1,
            grain_light: [0xF0, 0xF0, 0xF0],
            grain_dark: [0x10, 0x10, 0x10],
            grain_seed: None,
            date_stamp_font_fraction: 0.035,
            date_stamp_color: RgbaColor::with_alpha(0xFF, 0x6B, 0x35, 0.95),
            date_stamp_shadow: RgbaColor::with_alpha(0, 0, 0, 0.5),
            caption_date_fraction: 0.035,
            caption_location_fraction: 0.028,
            caption_watermark_fraction: 0.022,
            caption_date_color: RgbaColor::opaque(0x33, 0x33, 0x33),
            caption_location_color: RgbaColor::opaque(0x66, 0x66, 0x66),
            caption_watermark_color: RgbaColor::with_alpha(0x99, 0x99, 0x99, 0.9),
            font_path: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
            capture_lut_max_dimension: None,
            preview_lut_dimension: DEFAULT_PREVIEW_DIMENSION,
            job_timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON config document; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Apply `HALFFRAME_*` environment overrides.
    ///
    /// - `HALFFRAME_JPEG_QUALITY`: 1..=100
    /// - `HALFFRAME_FONT`: path to a font file
    /// - `HALFFRAME_GRAIN_SEED`: fixed grain seed
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(quality) = std::env::var("HALFFRAME_JPEG_QUALITY")
            .ok()
            .and_then(|s| s.parse::<u8>().ok())
        {
            self.jpeg_quality = quality.clamp(1, 100);
        }
        if let Ok(font) = std::env::var("HALFFRAME_FONT") {
            self.font_path = Some(PathBuf::from(font));
        }
        if let Some(seed) = std::env::var("HALFFRAME_GRAIN_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.grain_seed = Some(seed);
        }
        self
    }
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{ "jpeg_quality": 80, "job_timeout": 2500 }"#)
            .expect("valid config");
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.job_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.crop_aspect, AspectRatio::HALF_FRAME);
        assert_eq!(config.polaroid_border_fraction, 0.04);
    }

    #[test]
    fn test_color_to_f32() {
        let c = RgbaColor::with_alpha(255, 0, 51, 0.5).to_f32();
        let expected = [1.0, 0.0, 0.2, 0.5];
        for i in 0..4 {
            assert!((c[i] - expected[i]).abs() < 1e-6, "ch{i}: {} vs {}", c[i], expected[i]);
        }
    }
}
