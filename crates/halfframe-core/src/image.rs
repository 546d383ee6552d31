//! Pixel surface used by the compositor and the CPU preview path.
//!
//! Surfaces are 8-bit RGBA in gamma-encoded sRGB, the same space the film
//! matrices and LUTs were authored in. Colour math converts to normalized
//! `f32` per pixel and rounds back on write.

use image::{Rgba, RgbaImage};

use crate::error::PipelineError;

/// Normalize an 8-bit channel to `[0, 1]`.
#[inline]
pub fn to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

/// Quantize a normalized channel to 8 bits (round-to-nearest, clamped).
#[inline]
pub fn from_unit(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// An owned RGBA8 canvas.
#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// Allocate a surface filled with `fill`.
    ///
    /// Fails with [`PipelineError::SurfaceAllocation`] if the pixel count
    /// exceeds `max_pixels` or the allocator refuses the buffer.
    pub fn allocate(
        width: u32,
        height: u32,
        fill: [u8; 4],
        max_pixels: u64,
    ) -> Result<Self, PipelineError> {
        let refuse = || PipelineError::SurfaceAllocation { width, height };

        let pixels = (width as u64).checked_mul(height as u64).ok_or_else(refuse)?;
        if width == 0 || height == 0 || pixels > max_pixels {
            return Err(refuse());
        }
        let len = usize::try_from(pixels * 4).map_err(|_| refuse())?;

        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| refuse())?;
        for _ in 0..pixels {
            buf.extend_from_slice(&fill);
        }

        let image = RgbaImage::from_raw(width, height, buf).ok_or_else(refuse)?;
        Ok(Self { image })
    }

    /// Wrap an already decoded image.
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Copy `src` into this surface with its top-left corner at `(x, y)`.
    /// Pixels falling outside the surface are dropped.
    pub fn blit(&mut self, src: &RgbaImage, x: u32, y: u32) {
        image::imageops::replace(&mut self.image, src, x as i64, y as i64);
    }

    /// Source-over blend a straight-alpha colour onto one pixel. Out-of-bounds
    /// coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: [f32; 4]) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        blend_over(px, color);
    }
}

/// Source-over blend of a straight-alpha colour onto an opaque-ish pixel.
/// Destination alpha is preserved.
#[inline]
pub fn blend_over(px: &mut Rgba<u8>, color: [f32; 4]) {
    let a = color[3].clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let dst = to_unit(px.0[c]);
        px.0[c] = from_unit(dst + (color[c] - dst) * a);
    }
}
