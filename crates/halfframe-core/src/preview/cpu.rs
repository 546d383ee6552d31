//! CPU preview backend.
//!
//! Tint and matrix run per pixel at full frame size. The LUT strategy grades
//! a reduced copy (longest side `working_dimension`) and scales it back, which
//! keeps a trilinear pass affordable on the frame thread.

use rayon::prelude::*;

use super::{FrameMut, PreviewBackend, PreviewFilter, PreviewPlan, PreviewStrategy};
use crate::error::PreviewError;
use crate::image::{from_unit, to_unit};
use crate::transform::ColorTransform;

#[derive(Debug, Clone)]
pub struct CpuPreviewBackend {
    working_dimension: u32,
}

impl CpuPreviewBackend {
    pub fn new(working_dimension: u32) -> Self {
        Self {
            working_dimension: working_dimension.max(1),
        }
    }
}

impl PreviewBackend for CpuPreviewBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn supports(&self, _strategy: PreviewStrategy) -> bool {
        true
    }

    fn apply(&mut self, frame: &mut FrameMut<'_>, plan: &PreviewPlan) -> Result<(), PreviewError> {
        let row_len = frame.width() as usize * 4;
        if row_len == 0 || frame.height() == 0 {
            return Ok(());
        }
        match &plan.filter {
            PreviewFilter::Passthrough => {}
            PreviewFilter::Tint(tint) => {
                let [tr, tg, tb, a] = *tint;
                frame.par_chunks_mut(row_len).for_each(|row| {
                    for px in row.chunks_exact_mut(4) {
                        for (c, t) in [tr, tg, tb].into_iter().enumerate() {
                            let dst = to_unit(px[c]);
                            px[c] = from_unit(dst + (t - dst) * a);
                        }
                    }
                });
            }
            PreviewFilter::Matrix(matrix) => {
                ColorTransform::Matrix(*matrix).apply_image(frame);
            }
            PreviewFilter::Lut { lut, monochrome, .. } => {
                let transform = ColorTransform::Lut {
                    lut: lut.clone(),
                    monochrome: *monochrome,
                };
                transform.apply_image_reduced(frame, self.working_dimension);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::frame_from_raw;
    use crate::transform::{ColorMatrix, LutStore};

    fn plan(filter: PreviewFilter) -> PreviewPlan {
        PreviewPlan {
            film_id: "test".into(),
            filter,
        }
    }

    #[test]
    fn test_tint_blends_towards_overlay() {
        let mut backend = CpuPreviewBackend::new(640);
        let mut data = vec![0u8, 0, 0, 255, 255, 255, 255, 255];
        let mut frame = frame_from_raw(2, 1, &mut data).expect("frame");
        backend
            .apply(&mut frame, &plan(PreviewFilter::Tint([1.0, 0.0, 0.0, 0.5])))
            .expect("apply");
        assert_eq!(data, vec![128, 0, 0, 255, 255, 128, 128, 255]);
    }

    #[test]
    fn test_matrix_matches_capture_math() {
        let matrix = ColorMatrix::from_rows([
            1.1, 0.05, -0.02, 0.0, 0.02, //
            0.02, 1.0, 0.0, 0.0, 0.01, //
            -0.05, 0.0, 0.95, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ]);
        let mut backend = CpuPreviewBackend::new(640);
        let mut data = vec![90u8, 140, 200, 255];
        let mut frame = frame_from_raw(1, 1, &mut data).expect("frame");
        backend.apply(&mut frame, &plan(PreviewFilter::Matrix(matrix))).expect("apply");
        let want = matrix
            .apply([90.0 / 255.0, 140.0 / 255.0, 200.0 / 255.0, 1.0])
            .map(from_unit);
        assert_eq!(data, want.to_vec());
    }

    #[test]
    fn test_lut_small_frame_matches_full_grade() {
        let luts = LutStore::with_builtin();
        let lut = luts.load("vintage-overlay.cube").expect("bundled LUT");
        let mut backend = CpuPreviewBackend::new(640);
        let mut data: Vec<u8> = (0..16u32 * 16).flat_map(|i| [(i % 256) as u8, (i * 7 % 256) as u8, 64, 255]).collect();
        let original = data.clone();
        let mut frame = frame_from_raw(16, 16, &mut data).expect("frame");
        let filter = PreviewFilter::Lut {
            reference: "vintage-overlay.cube".into(),
            lut: lut.clone(),
            monochrome: false,
        };
        backend.apply(&mut frame, &plan(filter)).expect("apply");

        let transform = ColorTransform::Lut { lut, monochrome: false };
        for (got, src) in data.chunks_exact(4).zip(original.chunks_exact(4)) {
            let want = transform
                .apply_pixel([to_unit(src[0]), to_unit(src[1]), to_unit(src[2]), to_unit(src[3])])
                .map(from_unit);
            assert_eq!(got, &want[..]);
        }
    }
}
