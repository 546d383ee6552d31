//! 2D texture atlas form of a 3D LUT, as consumed by the preview shaders.
//!
//! The N blue slices (each N×N, red across, green down) are laid side by side
//! in a single strip:
//! ```text
//!   width  = N·N,  height = N
//!   texel(r, g, b) at x = r + b·N, y = g
//! ```
//! Texels are RGBA8 with alpha fixed at 255.

use super::lut::Lut3D;
use crate::image::{from_unit, to_unit};

/// A LUT flattened into an `N² × N` RGBA8 strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutAtlas {
    size: u32,
    texels: Vec<[u8; 4]>,
}

impl LutAtlas {
    /// Flatten `lut` into atlas layout, quantizing samples to 8 bits.
    pub fn bake(lut: &Lut3D) -> Self {
        let n = lut.size();
        let width = n * n;
        let mut texels = vec![[0, 0, 0, 255]; (width * n) as usize];
        for b in 0..n {
            for g in 0..n {
                for r in 0..n {
                    let [sr, sg, sb] = lut.at(r, g, b);
                    let x = r + b * n;
                    texels[(g * width + x) as usize] = [from_unit(sr), from_unit(sg), from_unit(sb), 255];
                }
            }
        }
        Self { size: n, texels }
    }

    /// Lattice resolution N.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size * self.size
    }

    pub fn height(&self) -> u32 {
        self.size
    }

    /// Texel data, row-major, tightly packed.
    pub fn as_bytes(&self) -> &[u8] {
        self.texels.as_flattened()
    }

    #[inline]
    fn fetch(&self, r: u32, g: u32, b: u32) -> [f32; 3] {
        let t = self.texels[(g * self.width() + r + b * self.size) as usize];
        [to_unit(t[0]), to_unit(t[1]), to_unit(t[2])]
    }

    /// CPU reference of the preview LUT shader.
    ///
    /// Same reduction order as [`Lut3D::sample`] (R, then G, then B) but
    /// reading the quantized atlas texels, which is what the GPU sees when it
    /// samples texel centres (`(x + 0.5) / width`).
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        let n = self.size;
        let max = (n - 1) as f32;
        let axis = |v: f32| {
            let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) } * max;
            let lo = (v.floor() as u32).min(n - 1);
            (lo, (lo + 1).min(n - 1), v - lo as f32)
        };
        let (r0, r1, rf) = axis(rgb[0]);
        let (g0, g1, gf) = axis(rgb[1]);
        let (b0, b1, bf) = axis(rgb[2]);

        let mix = |a: [f32; 3], b: [f32; 3], t: f32| {
            [
                a[0] + (b[0] - a[0]) * t,
                a[1] + (b[1] - a[1]) * t,
                a[2] + (b[2] - a[2]) * t,
            ]
        };
        let c00 = mix(self.fetch(r0, g0, b0), self.fetch(r1, g0, b0), rf);
        let c10 = mix(self.fetch(r0, g1, b0), self.fetch(r1, g1, b0), rf);
        let c01 = mix(self.fetch(r0, g0, b1), self.fetch(r1, g0, b1), rf);
        let c11 = mix(self.fetch(r0, g1, b1), self.fetch(r1, g1, b1), rf);
        mix(mix(c00, c10, gf), mix(c01, c11, gf), bf)
    }
}
