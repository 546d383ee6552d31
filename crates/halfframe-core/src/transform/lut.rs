//! 3D LUT parsing and trilinear application.
//!
//! Lattice samples are stored r-fastest, then g, then b:
//! ```text
//!   index(r, g, b) = b·N² + g·N + r
//! ```
//! which is also the row order of `.cube` files.

use crate::error::LutError;

/// Largest lattice accepted from untrusted data (256³ samples ≈ 200 MB).
const MAX_LUT_SIZE: u32 = 256;

/// A parsed 3D lookup table. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// Lattice resolution per axis.
    size: u32,
    /// `size³` RGB samples in `[0, 1]`.
    data: Vec<[f32; 3]>,
    /// Informational label (`TITLE` line of a `.cube` file).
    title: String,
}

impl Lut3D {
    /// Build from a flat `[r, g, b, r, g, b, ...]` sample array, the
    /// pre-parsed form embedded in asset bundles.
    pub fn from_samples(
        size: u32,
        title: impl Into<String>,
        flat_rgb: &[f32],
    ) -> Result<Self, LutError> {
        let expected = checked_volume(size)?;
        if flat_rgb.len() % 3 != 0 || flat_rgb.len() / 3 != expected {
            return Err(LutError::Malformed {
                reference: String::new(),
                expected,
                found: flat_rgb.len() / 3,
            });
        }
        if let Some(i) = flat_rgb.iter().position(|v| !v.is_finite()) {
            return Err(LutError::Parse(format!("non-finite sample at index {i}")));
        }
        let data = flat_rgb
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self {
            size,
            data,
            title: title.into(),
        })
    }

    /// Lattice that maps every colour to itself.
    pub fn identity(size: u32) -> Result<Self, LutError> {
        let n = checked_volume(size)?;
        let max = (size - 1) as f32;
        let mut data = Vec::with_capacity(n);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push([r as f32 / max, g as f32 / max, b as f32 / max]);
                }
            }
        }
        Ok(Self {
            size,
            data,
            title: format!("Identity {size}"),
        })
    }

    /// Parse `.cube` text.
    ///
    /// Recognized directives: `LUT_3D_SIZE` (or bare `SIZE`) and `TITLE`.
    /// Comments, `DOMAIN_MIN`/`DOMAIN_MAX`, `LUT_3D_INPUT_RANGE` and any line
    /// that isn't exactly three numbers are skipped. A file that only
    /// declares `LUT_1D_SIZE` is rejected.
    pub fn parse_cube(text: &str) -> Result<Self, LutError> {
        let mut size: Option<u32> = None;
        let mut saw_1d = false;
        let mut title = String::new();
        let mut data: Vec<[f32; 3]> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(head) = tokens.next() else { continue };
            match head {
                "TITLE" => {
                    title = line["TITLE".len()..].trim().trim_matches('"').to_string();
                    continue;
                }
                "LUT_3D_SIZE" | "SIZE" => {
                    let value = tokens.next().unwrap_or_default();
                    let n = value.parse::<u32>().map_err(|_| {
                        LutError::InvalidSize(format!("`{value}` is not a lattice size"))
                    })?;
                    if size.replace(n).is_some_and(|prev| prev != n) {
                        return Err(LutError::Parse("conflicting LUT_3D_SIZE lines".into()));
                    }
                    continue;
                }
                "LUT_1D_SIZE" => {
                    saw_1d = true;
                    continue;
                }
                _ => {}
            }

            if let Some(rgb) = parse_triple(line) {
                if !rgb.iter().all(|v| v.is_finite()) {
                    return Err(LutError::Parse(format!("non-finite sample `{line}`")));
                }
                data.push(rgb);
            }
        }

        let size = match size {
            Some(n) => n,
            None if saw_1d => {
                return Err(LutError::InvalidSize("1D LUTs are not supported".into()));
            }
            None => return Err(LutError::InvalidSize("missing LUT_3D_SIZE".into())),
        };

        let expected = checked_volume(size)?;
        if data.len() != expected {
            return Err(LutError::Malformed {
                reference: String::new(),
                expected,
                found: data.len(),
            });
        }

        Ok(Self { size, data, title })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Samples in lattice order.
    pub fn samples(&self) -> &[[f32; 3]] {
        &self.data
    }

    /// Sample at lattice coordinate `(r, g, b)`.
    #[inline]
    pub fn at(&self, r: u32, g: u32, b: u32) -> [f32; 3] {
        let n = self.size as usize;
        self.data[b as usize * n * n + g as usize * n + r as usize]
    }

    /// Trilinear lookup of a normalized RGB triple.
    ///
    /// # Algorithm
    /// Each channel is clamped to `[0, 1]` and scaled to `[0, N-1]`. The
    /// eight surrounding lattice points are blended along R first (four
    /// lerps), then G (two), then B (one). Upper indices clamp to `N-1`, so
    /// inputs of exactly 1.0 read the last sample without going out of
    /// bounds.
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        let max = (self.size - 1) as f32;
        let axis = |v: f32| {
            let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) } * max;
            let lo = (v.floor() as u32).min(self.size - 1);
            let hi = (lo + 1).min(self.size - 1);
            (lo, hi, v - lo as f32)
        };
        let (r0, r1, rf) = axis(rgb[0]);
        let (g0, g1, gf) = axis(rgb[1]);
        let (b0, b1, bf) = axis(rgb[2]);

        // Along R.
        let c00 = lerp3(self.at(r0, g0, b0), self.at(r1, g0, b0), rf);
        let c10 = lerp3(self.at(r0, g1, b0), self.at(r1, g1, b0), rf);
        let c01 = lerp3(self.at(r0, g0, b1), self.at(r1, g0, b1), rf);
        let c11 = lerp3(self.at(r0, g1, b1), self.at(r1, g1, b1), rf);
        // Along G.
        let c0 = lerp3(c00, c10, gf);
        let c1 = lerp3(c01, c11, gf);
        // Along B.
        lerp3(c0, c1, bf)
    }

    /// Whether this table is (within `tolerance`) the identity lattice.
    pub fn is_identity(&self, tolerance: f32) -> bool {
        let max = (self.size - 1) as f32;
        let n = self.size as usize;
        self.data.iter().enumerate().all(|(i, s)| {
            let expected = [
                (i % n) as f32 / max,
                ((i / n) % n) as f32 / max,
                (i / (n * n)) as f32 / max,
            ];
            (0..3).all(|c| (s[c] - expected[c]).abs() <= tolerance)
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────

fn checked_volume(size: u32) -> Result<usize, LutError> {
    if !(2..=MAX_LUT_SIZE).contains(&size) {
        return Err(LutError::InvalidSize(format!(
            "lattice size {size} outside 2..={MAX_LUT_SIZE}"
        )));
    }
    Ok((size as usize).pow(3))
}

fn parse_triple(line: &str) -> Option<[f32; 3]> {
    let mut it = line.split_whitespace();
    let r = it.next()?.parse().ok()?;
    let g = it.next()?.parse().ok()?;
    let b = it.next()?.parse().ok()?;
    if it.next().is_some() {
        return None;
    }
    Some([r, g, b])
}

#[inline]
fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}
