//! Half-frame crop and canvas geometry.
//!
//! All arithmetic is integer (or floored) so the same source size always
//! yields the same rectangles.

use crate::config::{AspectRatio, PipelineConfig};

/// Slack added before flooring a fractional margin, so products such as
/// `3000 × 0.15` floor to 450 rather than 449.
const FLOOR_SLACK: f64 = 1e-9;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Polaroid margins around the photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolaroidMargins {
    /// Left, right and top border.
    pub side: u32,
    /// Caption strip below the photo.
    pub bottom: u32,
}

/// Where everything goes for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Crop window in source coordinates.
    pub crop: Rect,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// The cropped photo's placement on the canvas.
    pub photo: Rect,
    pub margins: Option<PolaroidMargins>,
}

impl FrameLayout {
    /// Lay out a frame for a `source_width × source_height` capture.
    pub fn compute(
        source_width: u32,
        source_height: u32,
        config: &PipelineConfig,
        polaroid: bool,
    ) -> Self {
        let crop = crop_window(source_width, source_height, config.crop_aspect);

        let margins = polaroid.then(|| PolaroidMargins {
            side: fraction_of(crop.width, config.polaroid_border_fraction),
            bottom: fraction_of(crop.height, config.polaroid_bottom_fraction),
        });

        let (canvas_width, canvas_height, origin) = match margins {
            Some(m) => (
                crop.width + 2 * m.side,
                crop.height + m.side + m.bottom,
                m.side,
            ),
            None => (crop.width, crop.height, 0),
        };

        Self {
            crop,
            canvas_width,
            canvas_height,
            photo: Rect {
                x: origin,
                y: origin,
                width: crop.width,
                height: crop.height,
            },
            margins,
        }
    }
}

/// Centered crop of the source to `aspect`.
///
/// Wider sources lose columns, taller ones lose rows; the kept extent is
/// floored. Never returns an empty rectangle for a non-empty source.
pub fn crop_window(source_width: u32, source_height: u32, aspect: AspectRatio) -> Rect {
    let (sw, sh) = (source_width as u64, source_height as u64);
    let (aw, ah) = (aspect.width.max(1) as u64, aspect.height.max(1) as u64);

    let (width, height) = if sw * ah > sh * aw {
        ((sh * aw / ah).max(1), sh)
    } else {
        (sw, (sw * ah / aw).max(1))
    };
    let (width, height) = (width.min(sw) as u32, height.min(sh) as u32);

    Rect {
        x: (source_width - width) / 2,
        y: (source_height - height) / 2,
        width,
        height,
    }
}

fn fraction_of(extent: u32, fraction: f64) -> u32 {
    (extent as f64 * fraction + FLOOR_SLACK).floor().max(0.0) as u32
}
