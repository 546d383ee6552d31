//! Text rasterization for date stamps and captions.
//!
//! Wraps a cosmic-text `FontSystem` that is created on first use (scanning
//! system fonts is slow) and shared by every job of an engine. If a
//! configured font file can't be loaded the system sans-serif is used; if no
//! font is available at all, text simply doesn't draw.

use std::path::PathBuf;

use cosmic_text::{Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache};
use parking_lot::Mutex;

use crate::image::{Surface, to_unit};

/// Line height as a multiple of font size.
const LINE_HEIGHT: f32 = 1.2;
/// Layout width wide enough that captions never wrap.
const MAX_LINE_WIDTH: f32 = 100_000.0;

struct FontState {
    fonts: FontSystem,
    swash: SwashCache,
    /// Family of the configured font, if it loaded.
    family: Option<String>,
}

/// Shared text renderer.
pub struct TextRenderer {
    font_path: Option<PathBuf>,
    state: Mutex<Option<FontState>>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("font_path", &self.font_path)
            .finish_non_exhaustive()
    }
}

impl TextRenderer {
    pub fn new(font_path: Option<PathBuf>) -> Self {
        Self {
            font_path,
            state: Mutex::new(None),
        }
    }

    fn init(&self) -> FontState {
        let mut fonts = FontSystem::new();
        let family = self.font_path.as_ref().and_then(|path| {
            let before = fonts.db().len();
            match fonts.db_mut().load_font_file(path) {
                Ok(()) => {
                    let family = fonts
                        .db()
                        .faces()
                        .nth(before)
                        .and_then(|face| face.families.first())
                        .map(|(name, _)| name.clone());
                    if family.is_none() {
                        tracing::warn!(path = %path.display(), "font file has no faces, using system font");
                    }
                    family
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to load font ({e}), using system font");
                    None
                }
            }
        });
        FontState {
            fonts,
            swash: SwashCache::new(),
            family,
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FontState) -> T) -> T {
        let mut guard = self.state.lock();
        let state = guard.get_or_insert_with(|| self.init());
        f(state)
    }

    /// Width and height in pixels of `text` set at `size_px`.
    pub fn measure(&self, text: &str, size_px: f32) -> (f32, f32) {
        self.with_state(|state| {
            let buffer = shape(state, text, size_px);
            extent(&buffer, size_px)
        })
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn draw(&self, surface: &mut Surface, text: &str, x: i64, y: i64, size_px: f32, color: [f32; 4]) {
        if text.is_empty() || size_px < 1.0 || color[3] <= 0.0 {
            return;
        }
        self.with_state(|state| {
            let buffer = shape(state, text, size_px);
            let FontState { fonts, swash, .. } = state;
            // Coverage comes back in the alpha channel; the colour is ours.
            buffer.draw(fonts, swash, Color::rgba(255, 255, 255, 255), |gx, gy, w, h, coverage| {
                let alpha = to_unit(coverage.a()) * color[3];
                if alpha <= 0.0 {
                    return;
                }
                let px = [color[0], color[1], color[2], alpha];
                for dy in 0..h as i64 {
                    for dx in 0..w as i64 {
                        surface.blend_pixel(x + gx as i64 + dx, y + gy as i64 + dy, px);
                    }
                }
            });
        });
    }
}

fn shape(state: &mut FontState, text: &str, size_px: f32) -> Buffer {
    let metrics = Metrics::new(size_px, size_px * LINE_HEIGHT);
    let mut buffer = Buffer::new(&mut state.fonts, metrics);
    buffer.set_size(&mut state.fonts, Some(MAX_LINE_WIDTH), None);
    let attrs = match state.family.as_deref() {
        Some(name) => Attrs::new().family(Family::Name(name)),
        None => Attrs::new().family(Family::SansSerif),
    };
    buffer.set_text(&mut state.fonts, text, &attrs, Shaping::Advanced);
    buffer.shape_until_scroll(&mut state.fonts, false);
    buffer
}

fn extent(buffer: &Buffer, size_px: f32) -> (f32, f32) {
    let mut width = 0.0f32;
    let mut lines = 0usize;
    for run in buffer.layout_runs() {
        width = width.max(run.line_w);
        lines = lines.max(run.line_i + 1);
    }
    (width, lines.max(1) as f32 * size_px * LINE_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_file_degrades() {
        let renderer = TextRenderer::new(Some(PathBuf::from("/nonexistent/font.ttf")));
        let mut surface = Surface::allocate(64, 32, [0, 0, 0, 255], u64::MAX).expect("surface");
        renderer.draw(&mut surface, "'24 05 17", 2, 2, 12.0, [1.0, 0.4, 0.2, 0.95]);
        let (_, height) = renderer.measure("'24 05 17", 12.0);
        assert!(height > 0.0);
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let renderer = TextRenderer::new(None);
        let mut surface = Surface::allocate(8, 8, [9, 9, 9, 255], u64::MAX).expect("surface");
        renderer.draw(&mut surface, "", 0, 0, 12.0, [1.0; 4]);
        assert!(surface.as_image().pixels().all(|p| p.0 == [9, 9, 9, 255]));
    }
}
