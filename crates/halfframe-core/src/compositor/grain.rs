//! Film grain: scattered light and dark specks over the photo area.
//!
//! Grain is stochastic by nature. The random source is passed in so callers
//! can seed it; output is only ever checked for quantity, not exact pixels.

use rand::Rng;

use super::layout::Rect;
use crate::config::PipelineConfig;
use crate::image::{Surface, to_unit};

/// Neighbourhood of one grain dot: the centre and its four neighbours.
const DOT_OFFSETS: [(i64, i64); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

/// Number of dots for a photo of `area` pixels.
pub fn dot_count(area: u64, density: f64) -> u64 {
    (area as f64 * density.max(0.0) + 1e-9).floor() as u64
}

/// Scatter grain over `area`. Returns the number of dots drawn (zero when
/// the intensity is zero or the area too small to earn a single dot).
pub fn apply_grain<R: Rng + ?Sized>(
    canvas: &mut Surface,
    area: Rect,
    intensity: f32,
    config: &PipelineConfig,
    rng: &mut R,
) -> u64 {
    let alpha = intensity.clamp(0.0, 1.0) * config.grain_alpha_scale;
    let count = dot_count(area.area(), config.grain_density);
    if alpha <= 0.0 || count == 0 {
        return 0;
    }

    let shade = |rgb: [u8; 3]| [to_unit(rgb[0]), to_unit(rgb[1]), to_unit(rgb[2]), alpha];
    let light = shade(config.grain_light);
    let dark = shade(config.grain_dark);

    let (x0, y0) = (area.x as i64, area.y as i64);
    let (x1, y1) = (area.right() as i64, area.bottom() as i64);

    for _ in 0..count {
        let cx = rng.gen_range(x0..x1);
        let cy = rng.gen_range(y0..y1);
        let color = if rng.gen_bool(0.5) { light } else { dark };
        for (dx, dy) in DOT_OFFSETS {
            let (x, y) = (cx + dx, cy + dy);
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                canvas.blend_pixel(x, y, color);
            }
        }
    }
    count
}
