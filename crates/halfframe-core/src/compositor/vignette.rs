//! Radial vignette over the photo area.
//!
//! # Formula
//! With `R = max(w, h) · radius_factor` and `d` the distance from the photo
//! centre to the pixel centre:
//! ```text
//!   t     = clamp((d / R − inner_stop) / (1 − inner_stop), 0, 1)
//!   alpha = t · max_opacity            (black, source-over)
//! ```

use image::RgbaImage;
use rayon::prelude::*;

use super::layout::Rect;
use crate::config::PipelineConfig;
use crate::image::blend_over;

/// Darken `area` of `canvas` towards its edges. Pixels outside `area` are
/// untouched.
pub fn apply_vignette(canvas: &mut RgbaImage, area: Rect, config: &PipelineConfig) {
    if area.width == 0 || area.height == 0 || config.vignette_max_opacity <= 0.0 {
        return;
    }
    let radius = area.width.max(area.height) as f32 * config.vignette_radius_factor;
    if radius <= 0.0 {
        return;
    }
    let cx = area.width as f32 / 2.0;
    let cy = area.height as f32 / 2.0;
    let inner = config.vignette_inner_stop.clamp(0.0, 0.999);
    let max_opacity = config.vignette_max_opacity.clamp(0.0, 1.0);

    let canvas_width = canvas.width();
    let row_len = canvas_width as usize * 4;
    let x_end = area.right().min(canvas_width);

    canvas
        .par_chunks_mut(row_len)
        .enumerate()
        .skip(area.y as usize)
        .take(area.height as usize)
        .for_each(|(y, row)| {
            let dy = (y as u32 - area.y) as f32 + 0.5 - cy;
            for x in area.x..x_end {
                let dx = (x - area.x) as f32 + 0.5 - cx;
                let alpha = opacity_at((dx * dx + dy * dy).sqrt() / radius, inner, max_opacity);
                if alpha > 0.0 {
                    let i = x as usize * 4;
                    let px = &mut row[i..i + 4];
                    let mut rgba = image::Rgba([px[0], px[1], px[2], px[3]]);
                    blend_over(&mut rgba, [0.0, 0.0, 0.0, alpha]);
                    px.copy_from_slice(&rgba.0);
                }
            }
        });
}

/// Vignette opacity at normalized radius `r` (1.0 = vignette radius).
#[inline]
pub fn opacity_at(r: f32, inner_stop: f32, max_opacity: f32) -> f32 {
    ((r - inner_stop) / (1.0 - inner_stop)).clamp(0.0, 1.0) * max_opacity
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_opacity_profile() {
        assert_eq!(opacity_at(0.0, 0.5, 0.35), 0.0);
        assert_eq!(opacity_at(0.5, 0.5, 0.35), 0.0);
        assert!((opacity_at(0.75, 0.5, 0.35) - 0.175).abs() < EPSILON);
        assert!((opacity_at(1.0, 0.5, 0.35) - 0.35).abs() < EPSILON);
        assert!((opacity_at(1.4, 0.5, 0.35) - 0.35).abs() < EPSILON);
    }

    #[test]
    fn test_centre_untouched_corners_darkened() {
        let mut canvas = RgbaImage::from_pixel(200, 300, Rgba([200, 200, 200, 255]));
        let area = Rect {
            x: 0,
            y: 0,
            width: 200,
            height: 300,
        };
        apply_vignette(&mut canvas, area, &PipelineConfig::default());
        assert_eq!(canvas.get_pixel(100, 150).0, [200, 200, 200, 255]);
        let corner = canvas.get_pixel(0, 0).0;
        assert!(corner[0] < 200, "corner {corner:?}");
    }

    #[test]
    fn test_border_outside_area_untouched() {
        let white = Rgba([245, 243, 238, 255]);
        let mut canvas = RgbaImage::from_pixel(120, 160, white);
        let area = Rect {
            x: 10,
            y: 10,
            width: 100,
            height: 120,
        };
        apply_vignette(&mut canvas, area, &PipelineConfig::default());
        for (x, y) in [(0, 0), (5, 80), (115, 80), (60, 140), (119, 159)] {
            assert_eq!(*canvas.get_pixel(x, y), white, "({x},{y})");
        }
        assert_ne!(*canvas.get_pixel(10, 10), white);
    }
}
