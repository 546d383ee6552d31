//! Date stamp and Polaroid caption block.

use chrono::NaiveDateTime;

use super::layout::{FrameLayout, Rect};
use super::text::TextRenderer;
use crate::config::PipelineConfig;
use crate::image::Surface;

/// Date stamp inset from the photo's bottom-right corner, as a fraction of
/// crop height.
const STAMP_PADDING_FRACTION: f32 = 0.03;
/// Caption block inset inside the bottom strip, as a fraction of its height.
const CAPTION_TOP_FRACTION: f32 = 0.18;

/// `'YY MM DD`
pub fn date_stamp_text(at: &NaiveDateTime) -> String {
    at.format("'%y %m %d").to_string()
}

/// `Mon D, YYYY  H:MM AM/PM`
pub fn caption_date_text(at: &NaiveDateTime) -> String {
    at.format("%b %-d, %Y  %-I:%M %p").to_string()
}

/// Draw the orange date stamp in the photo's bottom-right corner, with a
/// dark shadow one pixel down and right.
pub fn draw_date_stamp(
    canvas: &mut Surface,
    photo: Rect,
    at: &NaiveDateTime,
    text: &TextRenderer,
    config: &PipelineConfig,
) {
    let label = date_stamp_text(at);
    let size = photo.height as f32 * config.date_stamp_font_fraction;
    let padding = photo.height as f32 * STAMP_PADDING_FRACTION;
    let (w, h) = text.measure(&label, size);

    let x = (photo.right() as f32 - padding - w).round() as i64;
    let y = (photo.bottom() as f32 - padding - h).round() as i64;

    text.draw(canvas, &label, x + 1, y + 1, size, config.date_stamp_shadow.to_f32());
    text.draw(canvas, &label, x, y, size, config.date_stamp_color.to_f32());
}

/// Draw the caption block in the Polaroid bottom strip: date/time and the
/// optional location on the left, the film label watermark on the right.
pub fn draw_caption(
    canvas: &mut Surface,
    layout: &FrameLayout,
    at: &NaiveDateTime,
    location: Option<&str>,
    film_label: &str,
    text: &TextRenderer,
    config: &PipelineConfig,
) {
    let Some(margins) = layout.margins else {
        return;
    };
    let canvas_w = layout.canvas_width as f32;
    let strip_top = layout.photo.bottom() as f32;
    let left = layout.photo.x as f32;
    let right = layout.photo.right() as f32;

    let date_size = canvas_w * config.caption_date_fraction;
    let location_size = canvas_w * config.caption_location_fraction;
    let mark_size = canvas_w * config.caption_watermark_fraction;

    let date_y = strip_top + margins.bottom as f32 * CAPTION_TOP_FRACTION;
    let date = caption_date_text(at);
    text.draw(
        canvas,
        &date,
        left.round() as i64,
        date_y.round() as i64,
        date_size,
        config.caption_date_color.to_f32(),
    );

    if let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) {
        let (_, date_h) = text.measure(&date, date_size);
        text.draw(
            canvas,
            location,
            left.round() as i64,
            (date_y + date_h).round() as i64,
            location_size,
            config.caption_location_color.to_f32(),
        );
    }

    if !film_label.is_empty() {
        let (w, h) = text.measure(film_label, mark_size);
        let bottom = layout.canvas_height as f32 - margins.bottom as f32 * CAPTION_TOP_FRACTION;
        text.draw(
            canvas,
            film_label,
            (right - w).round() as i64,
            (bottom - h).round() as i64,
            mark_size,
            config.caption_watermark_color.to_f32(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RgbaColor;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 7)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .expect("valid date")
    }

    #[test]
    fn test_date_stamp_format() {
        assert_eq!(date_stamp_text(&at(9, 5)), "'24 05 07");
    }

    #[test]
    fn test_caption_date_format() {
        assert_eq!(caption_date_text(&at(9, 5)), "May 7, 2024  9:05 AM");
        assert_eq!(caption_date_text(&at(0, 30)), "May 7, 2024  12:30 AM");
        assert_eq!(caption_date_text(&at(15, 45)), "May 7, 2024  3:45 PM");
    }

    const BG: [u8; 4] = [10, 20, 30, 255];

    /// Coordinates where `surface` differs from `reference`.
    fn changed(surface: &Surface, reference: &Surface) -> Vec<(u32, u32)> {
        surface
            .as_image()
            .enumerate_pixels()
            .filter(|(x, y, p)| reference.as_image().get_pixel(*x, *y) != *p)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    /// `(min_x, min_y, max_x, max_y)`
    fn bounds(points: &[(u32, u32)]) -> (u32, u32, u32, u32) {
        assert!(!points.is_empty(), "nothing was drawn");
        points.iter().fold((u32::MAX, u32::MAX, 0, 0), |(x0, y0, x1, y1), &(x, y)| {
            (x0.min(x), y0.min(y), x1.max(x), y1.max(y))
        })
    }

    fn blank(width: u32, height: u32) -> Surface {
        Surface::allocate(width, height, BG, u64::MAX).expect("surface")
    }

    fn caption_layout() -> FrameLayout {
        FrameLayout::compute(1000, 1500, &PipelineConfig::default(), true)
    }

    #[test]
    fn test_date_stamp_sits_in_photo_bottom_right() {
        let config = PipelineConfig::default();
        let text = TextRenderer::new(None);
        let photo = Rect {
            x: 20,
            y: 30,
            width: 400,
            height: 600,
        };
        let mut canvas = blank(440, 660);
        draw_date_stamp(&mut canvas, photo, &at(9, 5), &text, &config);

        let (x0, y0, x1, y1) = bounds(&changed(&canvas, &blank(440, 660)));
        let padding = (photo.height as f32 * STAMP_PADDING_FRACTION) as u32;
        assert!(x0 >= photo.x + photo.width / 2, "stamp starts at x={x0}");
        assert!(y0 >= photo.y + photo.height / 2, "stamp starts at y={y0}");
        assert!(x1 < photo.right() - padding / 2, "stamp ends at x={x1}");
        assert!(y1 < photo.bottom() - padding / 2, "stamp ends at y={y1}");
    }

    #[test]
    fn test_date_stamp_shadow_is_one_pixel_down_right() {
        let text = TextRenderer::new(None);
        let photo = Rect {
            x: 0,
            y: 0,
            width: 400,
            height: 600,
        };
        let white = RgbaColor::opaque(255, 255, 255);
        let hidden = RgbaColor::with_alpha(255, 255, 255, 0.0);

        let shadow_only = PipelineConfig {
            date_stamp_color: hidden,
            date_stamp_shadow: white,
            ..PipelineConfig::default()
        };
        let label_only = PipelineConfig {
            date_stamp_color: white,
            date_stamp_shadow: hidden,
            ..PipelineConfig::default()
        };

        let mut shadow = blank(400, 600);
        draw_date_stamp(&mut shadow, photo, &at(9, 5), &text, &shadow_only);
        let mut label = blank(400, 600);
        draw_date_stamp(&mut label, photo, &at(9, 5), &text, &label_only);

        let shadow_px = changed(&shadow, &blank(400, 600));
        let shifted: Vec<(u32, u32)> = changed(&label, &blank(400, 600))
            .into_iter()
            .map(|(x, y)| (x + 1, y + 1))
            .collect();
        assert!(!shadow_px.is_empty());
        // Both lists come out of a row-major scan, so order matches too.
        assert_eq!(shadow_px, shifted);
    }

    #[test]
    fn test_caption_stays_in_bottom_strip() {
        let config = PipelineConfig::default();
        let layout = caption_layout();
        let text = TextRenderer::new(None);
        let (w, h) = (layout.canvas_width, layout.canvas_height);

        let mut canvas = blank(w, h);
        draw_caption(&mut canvas, &layout, &at(15, 45), Some("Lisbon"), "250D", &text, &config);

        let (x0, y0, x1, y1) = bounds(&changed(&canvas, &blank(w, h)));
        assert!(y0 >= layout.photo.bottom(), "caption starts at y={y0}");
        assert!(y1 < h, "caption ends at y={y1}");
        assert!(x0 >= layout.photo.x, "caption starts at x={x0}");
        assert!(x1 <= layout.photo.right() + 2, "caption ends at x={x1}");
    }

    #[test]
    fn test_location_line_below_date_line() {
        let config = PipelineConfig::default();
        let layout = caption_layout();
        let text = TextRenderer::new(None);
        let (w, h) = (layout.canvas_width, layout.canvas_height);

        let mut date_only = blank(w, h);
        draw_caption(&mut date_only, &layout, &at(15, 45), None, "", &text, &config);
        let mut with_location = blank(w, h);
        draw_caption(&mut with_location, &layout, &at(15, 45), Some("Lisbon"), "", &text, &config);

        let (_, date_top, _, _) = bounds(&changed(&date_only, &blank(w, h)));
        let (loc_left, loc_top, _, _) = bounds(&changed(&with_location, &date_only));
        let date_size = w as f32 * config.caption_date_fraction;
        assert!(
            loc_top as f32 >= date_top as f32 + date_size * 0.5,
            "location top {loc_top}, date top {date_top}"
        );
        assert!(loc_left < w / 2, "location starts at x={loc_left}");
    }

    #[test]
    fn test_whitespace_location_is_skipped() {
        let config = PipelineConfig::default();
        let layout = caption_layout();
        let text = TextRenderer::new(None);
        let (w, h) = (layout.canvas_width, layout.canvas_height);

        let mut date_only = blank(w, h);
        draw_caption(&mut date_only, &layout, &at(15, 45), None, "", &text, &config);
        let mut blank_location = blank(w, h);
        draw_caption(&mut blank_location, &layout, &at(15, 45), Some("   "), "", &text, &config);
        assert!(changed(&blank_location, &date_only).is_empty());
    }

    #[test]
    fn test_watermark_in_right_half_of_strip() {
        let config = PipelineConfig::default();
        let layout = caption_layout();
        let text = TextRenderer::new(None);
        let (w, h) = (layout.canvas_width, layout.canvas_height);

        let mut without = blank(w, h);
        draw_caption(&mut without, &layout, &at(15, 45), None, "", &text, &config);
        let mut with_mark = blank(w, h);
        draw_caption(&mut with_mark, &layout, &at(15, 45), None, "250D", &text, &config);

        let (x0, y0, _, y1) = bounds(&changed(&with_mark, &without));
        assert!(x0 >= w / 2, "watermark starts at x={x0}");
        assert!(y0 >= layout.photo.bottom(), "watermark starts at y={y0}");
        assert!(y1 < h, "watermark ends at y={y1}");
    }

    #[test]
    fn test_caption_without_margins_is_noop() {
        let config = PipelineConfig::default();
        let layout = FrameLayout::compute(60, 90, &config, false);
        let mut canvas = Surface::allocate(60, 90, [1, 2, 3, 255], u64::MAX).expect("surface");
        let text = TextRenderer::new(None);
        draw_caption(&mut canvas, &layout, &at(1, 1), Some("Paris"), "250D", &text, &config);
        assert!(canvas.as_image().pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }
}
