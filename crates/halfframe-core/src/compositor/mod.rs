//! Frame Compositor: raw capture in, finished half-frame JPEG out.
//!
//! # Pipeline
//! ```text
//!   decode → crop 2:3 → canvas (+ Polaroid margins) → grade crop
//!          → vignette → grain → date stamp | caption → JPEG → new file
//! ```
//! Only decode, surface allocation and encode can fail; every other step
//! degrades instead.

pub mod codec;
pub mod grain;
pub mod layout;
pub mod overlay;
pub mod text;
pub mod vignette;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use image::imageops;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{PipelineConfig, RgbaColor};
use crate::error::PipelineError;
use crate::film::{FilmRegistry, FilmStock};
use crate::image::Surface;
use crate::transform::{ColorTransform, LutStore};

pub use layout::{FrameLayout, Rect};
pub use text::TextRenderer;

/// Per-capture request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub film_id: String,
    pub add_date_stamp: bool,
    pub add_grain: bool,
    pub add_polaroid_frame: bool,
    /// Caption line, drawn only with the Polaroid frame.
    pub location: Option<String>,
    /// Timestamp for the date stamp and caption; the local time at
    /// processing when absent.
    pub captured_at: Option<NaiveDateTime>,
}

impl ProcessingOptions {
    /// All toggles off.
    pub fn new(film_id: impl Into<String>) -> Self {
        Self {
            film_id: film_id.into(),
            add_date_stamp: false,
            add_grain: false,
            add_polaroid_frame: false,
            location: None,
            captured_at: None,
        }
    }
}

/// A finished output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedImageResult {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub film_id: String,
    pub film_name: String,
    pub film_label: String,
}

impl ProcessedImageResult {
    fn new(path: PathBuf, width: u32, height: u32, stock: &FilmStock) -> Self {
        Self {
            path,
            width,
            height,
            film_id: stock.id.clone(),
            film_name: stock.display_name.clone(),
            film_label: stock.short_label.clone(),
        }
    }
}

/// Runs capture jobs against an engine's shared registry, LUTs and fonts.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    config: Arc<PipelineConfig>,
    registry: Arc<FilmRegistry>,
    luts: Arc<LutStore>,
    text: Arc<TextRenderer>,
}

impl FrameCompositor {
    pub fn new(
        config: Arc<PipelineConfig>,
        registry: Arc<FilmRegistry>,
        luts: Arc<LutStore>,
        text: Arc<TextRenderer>,
    ) -> Self {
        Self {
            config,
            registry,
            luts,
            text,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process `source` with grain drawn from the configured seed, or from OS
    /// entropy when none is set.
    pub fn process(
        &self,
        source: &Path,
        options: &ProcessingOptions,
    ) -> Result<ProcessedImageResult, PipelineError> {
        let mut rng = match self.config.grain_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.process_with_rng(source, options, &mut rng)
    }

    /// Process `source` using `rng` for grain.
    pub fn process_with_rng<R: Rng + ?Sized>(
        &self,
        source: &Path,
        options: &ProcessingOptions,
        rng: &mut R,
    ) -> Result<ProcessedImageResult, PipelineError> {
        let started = Instant::now();
        let config = &*self.config;
        let stock = self.registry.resolve(&options.film_id);
        let polaroid = options.add_polaroid_frame;

        let decoded = codec::decode(source)?;
        let layout = FrameLayout::compute(decoded.width(), decoded.height(), config, polaroid);
        tracing::debug!(
            source = %source.display(),
            width = decoded.width(),
            height = decoded.height(),
            crop_w = layout.crop.width,
            crop_h = layout.crop.height,
            "decoded in {:.1}ms",
            elapsed_ms(started)
        );

        let background = if polaroid {
            config.polaroid_background
        } else {
            config.plain_background
        };
        let mut canvas = Surface::allocate(
            layout.canvas_width,
            layout.canvas_height,
            fill_of(background),
            config.max_canvas_pixels,
        )?;

        let crop = layout.crop;
        let mut photo = imageops::crop_imm(&decoded, crop.x, crop.y, crop.width, crop.height).to_image();
        drop(decoded);

        let step = Instant::now();
        let transform = ColorTransform::for_stock(&stock, &self.luts);
        match config.capture_lut_max_dimension {
            Some(max) => transform.apply_image_reduced(&mut photo, max),
            None => transform.apply_image(&mut photo),
        }
        canvas.blit(&photo, layout.photo.x, layout.photo.y);
        drop(photo);
        tracing::debug!(
            film = %stock.id,
            transform = transform.kind(),
            "graded in {:.1}ms",
            elapsed_ms(step)
        );

        vignette::apply_vignette(canvas.image_mut(), layout.photo, config);

        if options.add_grain && stock.grain_intensity > 0.0 {
            let dots = grain::apply_grain(&mut canvas, layout.photo, stock.grain_intensity, config, rng);
            tracing::debug!(dots, "grain applied");
        }

        let captured_at = options
            .captured_at
            .unwrap_or_else(|| chrono::Local::now().naive_local());

        if polaroid {
            if options.add_date_stamp {
                tracing::debug!("date stamp suppressed by Polaroid frame");
            }
            overlay::draw_caption(
                &mut canvas,
                &layout,
                &captured_at,
                options.location.as_deref(),
                &stock.short_label,
                &self.text,
                config,
            );
        } else if options.add_date_stamp {
            overlay::draw_date_stamp(&mut canvas, layout.photo, &captured_at, &self.text, config);
        }

        let (width, height) = (canvas.width(), canvas.height());
        let path = codec::write_jpeg_beside(canvas.as_image(), source, "processed", config.jpeg_quality)?;
        tracing::info!(
            output = %path.display(),
            width,
            height,
            film = %stock.id,
            "processed capture in {:.1}ms",
            elapsed_ms(started)
        );
        Ok(ProcessedImageResult::new(path, width, height, &stock))
    }

    /// Re-grade an existing image with another film stock: colour transform
    /// and vignette only, written to `<stem>_<film>.jpg`. The input is left
    /// in place.
    pub fn regrade(&self, source: &Path, film_id: &str) -> Result<ProcessedImageResult, PipelineError> {
        let started = Instant::now();
        let config = &*self.config;
        let stock = self.registry.resolve(film_id);

        let mut image = codec::decode(source)?;
        let (width, height) = image.dimensions();
        if (width as u64) * (height as u64) > config.max_canvas_pixels {
            return Err(PipelineError::SurfaceAllocation { width, height });
        }

        let transform = ColorTransform::for_stock(&stock, &self.luts);
        transform.apply_image(&mut image);
        let area = Rect {
            x: 0,
            y: 0,
            width,
            height,
        };
        vignette::apply_vignette(&mut image, area, config);

        let path = codec::write_jpeg_beside(&image, source, &stock.id, config.jpeg_quality)?;
        tracing::info!(
            output = %path.display(),
            film = %stock.id,
            transform = transform.kind(),
            "regraded in {:.1}ms",
            elapsed_ms(started)
        );
        Ok(ProcessedImageResult::new(path, width, height, &stock))
    }
}

fn fill_of(color: RgbaColor) -> [u8; 4] {
    let [r, g, b] = color.rgb;
    [r, g, b, crate::image::from_unit(color.alpha)]
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
