//! 4×5 colour matrix transform.
//!
//! # Formula
//! Coefficients are four rows of five, `[cR, cG, cB, cA, offset]`, one row per
//! output channel (R, G, B, A):
//! ```text
//!   out[X] = clamp(cR·r + cG·g + cB·b + cA·a + offset, 0, 1)
//! ```
//! Offsets are in normalized units. This is the cheap transform: no memory
//! lookups beyond the 20 coefficients, deterministic for a given input.

use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};

/// Rec. 601 luma weights, as used by the black-and-white stocks.
const LUMA_REC601: [f32; 3] = [0.299, 0.587, 0.114];

/// A 4×5 colour matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 20]", into = "[f32; 20]")]
pub struct ColorMatrix {
    linear: Mat4,
    offset: Vec4,
}

impl ColorMatrix {
    /// Pass-through matrix.
    pub const IDENTITY: Self = Self {
        linear: Mat4::IDENTITY,
        offset: Vec4::ZERO,
    };

    /// Build from 20 row-major coefficients.
    pub fn from_rows(coeffs: [f32; 20]) -> Self {
        let row = |i: usize| Vec4::new(coeffs[i * 5], coeffs[i * 5 + 1], coeffs[i * 5 + 2], coeffs[i * 5 + 3]);
        Self {
            // glam is column-major: build from rows, then transpose.
            linear: Mat4::from_cols(row(0), row(1), row(2), row(3)).transpose(),
            offset: Vec4::new(coeffs[4], coeffs[9], coeffs[14], coeffs[19]),
        }
    }

    /// Collapse RGB to luminance, keeping alpha.
    pub fn luminance() -> Self {
        let [wr, wg, wb] = LUMA_REC601;
        Self::from_rows([
            wr, wg, wb, 0.0, 0.0, //
            wr, wg, wb, 0.0, 0.0, //
            wr, wg, wb, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ])
    }

    /// The 20 coefficients, row-major.
    pub fn to_rows(&self) -> [f32; 20] {
        let t = self.linear.transpose();
        let mut out = [0.0; 20];
        for r in 0..4 {
            let row = t.col(r);
            out[r * 5..r * 5 + 4].copy_from_slice(&row.to_array());
            out[r * 5 + 4] = self.offset[r];
        }
        out
    }

    /// Rows as `(coefficients, offset)` pairs, the layout shaders consume.
    pub fn shader_rows(&self) -> ([[f32; 4]; 4], [f32; 4]) {
        let t = self.linear.transpose();
        (
            [
                t.col(0).to_array(),
                t.col(1).to_array(),
                t.col(2).to_array(),
                t.col(3).to_array(),
            ],
            self.offset.to_array(),
        )
    }

    /// Compose: apply `self`, then `next`. Intermediate clamping is dropped.
    pub fn then(&self, next: &ColorMatrix) -> ColorMatrix {
        ColorMatrix {
            linear: next.linear * self.linear,
            offset: next.linear * self.offset + next.offset,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Transform one straight-alpha RGBA pixel.
    #[inline]
    pub fn apply(&self, rgba: [f32; 4]) -> [f32; 4] {
        let v = self.linear * Vec4::from_array(rgba) + self.offset;
        v.clamp(Vec4::ZERO, Vec4::ONE).to_array()
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f32; 20]> for ColorMatrix {
    fn from(coeffs: [f32; 20]) -> Self {
        Self::from_rows(coeffs)
    }
}

impl From<ColorMatrix> for [f32; 20] {
    fn from(m: ColorMatrix) -> Self {
        m.to_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    const GOLD_200: [f32; 20] = [
        1.15, 0.05, 0.0, 0.0, 0.04, //
        0.0, 1.05, 0.0, 0.0, 0.02, //
        0.0, 0.05, 0.85, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ];

    #[test]
    fn test_identity_is_pass_through() {
        let px = [0.1, 0.5, 0.9, 0.7];
        assert_eq!(ColorMatrix::IDENTITY.apply(px), px);
    }

    #[test]
    fn test_row_layout_matches_formula() {
        let m = ColorMatrix::from_rows(GOLD_200);
        let [r, g, b, a] = [0.4_f32, 0.6, 0.2, 1.0];
        let out = m.apply([r, g, b, a]);
        let expected_r = (1.15 * r + 0.05 * g + 0.04_f32).clamp(0.0, 1.0);
        let expected_g = (1.05 * g + 0.02_f32).clamp(0.0, 1.0);
        let expected_b = (0.05 * g + 0.85 * b).clamp(0.0, 1.0);
        assert!((out[0] - expected_r).abs() < EPSILON, "R {} vs {}", out[0], expected_r);
        assert!((out[1] - expected_g).abs() < EPSILON, "G {} vs {}", out[1], expected_g);
        assert!((out[2] - expected_b).abs() < EPSILON, "B {} vs {}", out[2], expected_b);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_output_is_clamped() {
        let m = ColorMatrix::from_rows([
            2.0, 0.0, 0.0, 0.0, 0.5, //
            0.0, 1.0, 0.0, 0.0, -0.8, //
            0.0, 0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ]);
        let out = m.apply([0.9, 0.3, 0.5, 1.0]);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_apply_is_deterministic() {
        let m = ColorMatrix::from_rows(GOLD_200);
        for i in 0..64 {
            let t = i as f32 / 63.0;
            let px = [t, 1.0 - t, t * t, 1.0];
            assert_eq!(m.apply(px).map(f32::to_bits), m.apply(px).map(f32::to_bits));
        }
    }

    #[test]
    fn test_rows_round_trip() {
        let m = ColorMatrix::from_rows(GOLD_200);
        assert_eq!(m.to_rows(), GOLD_200);
    }

    #[test]
    fn test_luminance_collapses_channels() {
        let out = ColorMatrix::luminance().apply([0.8, 0.4, 0.2, 0.6]);
        assert!((out[0] - out[1]).abs() < EPSILON);
        assert!((out[1] - out[2]).abs() < EPSILON);
        assert_eq!(out[3], 0.6);
    }

    #[test]
    fn test_then_composes_in_order() {
        let gain = ColorMatrix::from_rows([
            0.5, 0.0, 0.0, 0.0, 0.0, //
            0.0, 0.5, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.5, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ]);
        let lift = ColorMatrix::from_rows([
            1.0, 0.0, 0.0, 0.0, 0.1, //
            0.0, 1.0, 0.0, 0.0, 0.1, //
            0.0, 0.0, 1.0, 0.0, 0.1, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ]);
        let px = [0.6, 0.4, 0.2, 1.0];
        let composed = gain.then(&lift).apply(px);
        let sequential = lift.apply(gain.apply(px));
        for c in 0..4 {
            assert!((composed[c] - sequential[c]).abs() < EPSILON);
        }
        // Gain first: 0.6 * 0.5 + 0.1
        assert!((composed[0] - 0.4).abs() < EPSILON);
    }
}
