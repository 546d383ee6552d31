//! Color Transform Engine: per-pixel and per-image application of a film
//! stock's matrix or LUT transform.

use std::ops::DerefMut;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};
use rayon::prelude::*;

use super::lut::Lut3D;
use super::matrix::ColorMatrix;
use super::store::LutStore;
use crate::error::LutError;
use crate::film::FilmStock;
use crate::image::{from_unit, to_unit};

/// The transform selected for a film stock.
#[derive(Debug, Clone)]
pub enum ColorTransform {
    /// 4×5 matrix, already composed with luminance for monochrome stocks.
    Matrix(ColorMatrix),
    /// Trilinear 3D LUT. Monochrome stocks collapse the LUT output to luma.
    Lut { lut: Arc<Lut3D>, monochrome: bool },
}

impl ColorTransform {
    /// Pick the final-quality transform for `stock`.
    ///
    /// The LUT is preferred when the stock names one and it loads. A missing
    /// LUT (`warn`) and a corrupt LUT (`error`) both fall back to the stock's
    /// matrix.
    pub fn for_stock(stock: &FilmStock, luts: &LutStore) -> Self {
        let Some(reference) = stock.lut_reference.as_deref() else {
            return Self::Matrix(stock.effective_matrix());
        };

        match luts.load(reference) {
            Ok(lut) => Self::Lut {
                lut,
                monochrome: stock.is_black_and_white,
            },
            Err(LutError::NotFound(_)) => {
                tracing::warn!(
                    film = %stock.id,
                    reference,
                    "missing LUT, falling back to colour matrix"
                );
                Self::Matrix(stock.effective_matrix())
            }
            Err(e) => {
                tracing::error!(
                    film = %stock.id,
                    reference,
                    "corrupt LUT ({e}), falling back to colour matrix"
                );
                Self::Matrix(stock.effective_matrix())
            }
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Matrix(_) => "matrix",
            Self::Lut { .. } => "lut",
        }
    }

    /// Whether applying this transform would leave every pixel unchanged.
    pub fn is_identity(&self) -> bool {
        match self {
            Self::Matrix(m) => m.is_identity(),
            Self::Lut { lut, monochrome } => !monochrome && lut.is_identity(0.0),
        }
    }

    /// Transform one straight-alpha RGBA pixel. The LUT path never touches
    /// alpha.
    #[inline]
    pub fn apply_pixel(&self, rgba: [f32; 4]) -> [f32; 4] {
        match self {
            Self::Matrix(m) => m.apply(rgba),
            Self::Lut { lut, monochrome } => {
                let [r, g, b] = lut.sample([rgba[0], rgba[1], rgba[2]]);
                let out = [r, g, b, rgba[3]];
                if *monochrome {
                    ColorMatrix::luminance().apply(out)
                } else {
                    out
                }
            }
        }
    }

    /// Transform every pixel of `image` in place, rows in parallel.
    pub fn apply_image<C>(&self, image: &mut ImageBuffer<Rgba<u8>, C>)
    where
        C: DerefMut<Target = [u8]>,
    {
        if self.is_identity() {
            return;
        }
        let row_len = image.width() as usize * 4;
        if row_len == 0 {
            return;
        }
        image.par_chunks_mut(row_len).for_each(|row| {
            for px in row.chunks_exact_mut(4) {
                let out = self.apply_pixel([
                    to_unit(px[0]),
                    to_unit(px[1]),
                    to_unit(px[2]),
                    to_unit(px[3]),
                ]);
                for c in 0..4 {
                    px[c] = from_unit(out[c]);
                }
            }
        });
    }

    /// Downsample–process–upsample.
    ///
    /// Images whose longest side exceeds `max_dimension` are graded on a
    /// reduced copy which is then scaled back up; the source alpha is kept.
    /// Matrix transforms are cheap enough to run at full size regardless.
    pub fn apply_image_reduced<C>(&self, image: &mut ImageBuffer<Rgba<u8>, C>, max_dimension: u32)
    where
        C: DerefMut<Target = [u8]>,
    {
        let (width, height) = image.dimensions();
        let longest = width.max(height);
        if matches!(self, Self::Matrix(_)) || longest <= max_dimension || max_dimension == 0 {
            self.apply_image(image);
            return;
        }

        let scale = max_dimension as f64 / longest as f64;
        let small_w = ((width as f64 * scale).round() as u32).max(1);
        let small_h = ((height as f64 * scale).round() as u32).max(1);

        let mut small = imageops::resize(&*image, small_w, small_h, FilterType::Triangle);
        self.apply_image(&mut small);
        let graded = imageops::resize(&small, width, height, FilterType::Triangle);

        for (dst, src) in image.pixels_mut().zip(graded.pixels()) {
            let alpha = dst.0[3];
            *dst = *src;
            dst.0[3] = alpha;
        }
        tracing::debug!(width, height, small_w, small_h, "graded reduced copy");
    }
}
