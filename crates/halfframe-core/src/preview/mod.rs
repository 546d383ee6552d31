//! Live Preview Approximator.
//!
//! A cheap per-frame stand-in for the selected film stock, applied to the
//! viewfinder stream. Three strategies, from cheapest to most accurate:
//!
//! | Strategy | Per pixel |
//! |---|---|
//! | `Tint` | blend the stock's flat overlay colour |
//! | `Matrix` | 4×5 preview matrix |
//! | `Lut` | trilinear lookup in the baked LUT atlas |
//!
//! Selecting a stock resolves everything the frame path needs into an
//! immutable [`PreviewPlan`] and swaps it in. The frame path only clones the
//! current plan's `Arc` and hands it to the backend, so it never touches
//! disk or the LUT parser. A frame that fails to filter is passed through
//! unchanged.

pub mod cpu;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::{ImageBuffer, Rgba};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::PreviewError;
use crate::film::{FilmRegistry, FilmStock};
use crate::transform::{ColorMatrix, Lut3D, LutStore};

pub use cpu::CpuPreviewBackend;

/// How a preview frame is approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStrategy {
    Tint,
    Matrix,
    Lut,
}

impl PreviewStrategy {
    /// The next cheaper strategy.
    pub fn fallback(self) -> Option<Self> {
        match self {
            Self::Lut => Some(Self::Matrix),
            Self::Matrix => Some(Self::Tint),
            Self::Tint => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tint => "tint",
            Self::Matrix => "matrix",
            Self::Lut => "lut",
        }
    }
}

impl fmt::Display for PreviewStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-resolved per-frame work.
#[derive(Debug, Clone)]
pub enum PreviewFilter {
    /// Nothing to do; frames are left alone.
    Passthrough,
    /// Straight-alpha overlay colour.
    Tint([f32; 4]),
    Matrix(ColorMatrix),
    Lut {
        reference: String,
        lut: Arc<Lut3D>,
        monochrome: bool,
    },
}

impl PreviewFilter {
    pub fn strategy(&self) -> Option<PreviewStrategy> {
        match self {
            Self::Passthrough => None,
            Self::Tint(_) => Some(PreviewStrategy::Tint),
            Self::Matrix(_) => Some(PreviewStrategy::Matrix),
            Self::Lut { .. } => Some(PreviewStrategy::Lut),
        }
    }
}

/// The filter for the currently selected film stock.
#[derive(Debug, Clone)]
pub struct PreviewPlan {
    pub film_id: String,
    pub filter: PreviewFilter,
}

impl PreviewPlan {
    pub fn passthrough() -> Self {
        Self {
            film_id: String::new(),
            filter: PreviewFilter::Passthrough,
        }
    }

    /// Build the filter for `strategy`, or `None` if the stock has no data
    /// for it (no LUT reference, LUT failed to load).
    fn for_strategy(stock: &FilmStock, strategy: PreviewStrategy, luts: &LutStore) -> Option<Self> {
        let filter = match strategy {
            PreviewStrategy::Tint => {
                let tint = stock.overlay_tint.to_f32();
                if tint[3] <= 0.0 {
                    PreviewFilter::Passthrough
                } else {
                    PreviewFilter::Tint(tint)
                }
            }
            PreviewStrategy::Matrix => {
                let matrix = stock.effective_preview_matrix();
                if matrix.is_identity() {
                    PreviewFilter::Passthrough
                } else {
                    PreviewFilter::Matrix(matrix)
                }
            }
            PreviewStrategy::Lut => {
                let reference = stock.lut_reference.as_deref()?;
                let lut = luts
                    .load(reference)
                    .map_err(|e| {
                        tracing::warn!(film = %stock.id, reference, "preview LUT unavailable: {e}");
                    })
                    .ok()?;
                if !stock.is_black_and_white && lut.is_identity(0.0) {
                    PreviewFilter::Passthrough
                } else {
                    PreviewFilter::Lut {
                        reference: reference.to_string(),
                        lut,
                        monochrome: stock.is_black_and_white,
                    }
                }
            }
        };
        Some(Self {
            film_id: stock.id.clone(),
            filter,
        })
    }
}

/// A mutable RGBA8 frame borrowed from the camera pipeline.
pub type FrameMut<'a> = ImageBuffer<Rgba<u8>, &'a mut [u8]>;

/// Wrap a raw RGBA8 buffer, checking its length.
pub fn frame_from_raw(width: u32, height: u32, data: &mut [u8]) -> Result<FrameMut<'_>, PreviewError> {
    let expected = width as usize * height as usize * 4;
    let found = data.len();
    if found != expected {
        return Err(PreviewError::FrameSize { expected, found });
    }
    ImageBuffer::from_raw(width, height, data).ok_or(PreviewError::FrameSize { expected, found })
}

/// Executes preview plans on frames.
pub trait PreviewBackend: Send {
    fn name(&self) -> &'static str;

    fn supports(&self, strategy: PreviewStrategy) -> bool;

    /// Bake whatever `plan` needs ahead of the first frame. Runs on the
    /// selection path, not the frame path.
    fn prepare(&mut self, plan: &PreviewPlan) -> Result<(), PreviewError> {
        let _ = plan;
        Ok(())
    }

    /// Filter one frame in place. On error the frame must be left as it was.
    fn apply(&mut self, frame: &mut FrameMut<'_>, plan: &PreviewPlan) -> Result<(), PreviewError>;
}

/// Selection state plus a backend, shared between the UI thread (which
/// selects) and the frame thread (which filters).
pub struct LivePreview<B: PreviewBackend> {
    registry: Arc<FilmRegistry>,
    luts: Arc<LutStore>,
    preferred: PreviewStrategy,
    plan: RwLock<Arc<PreviewPlan>>,
    backend: Mutex<B>,
    skipped_frames: AtomicU64,
}

impl<B: PreviewBackend> LivePreview<B> {
    pub fn new(registry: Arc<FilmRegistry>, luts: Arc<LutStore>, backend: B, preferred: PreviewStrategy) -> Self {
        Self {
            registry,
            luts,
            preferred,
            plan: RwLock::new(Arc::new(PreviewPlan::passthrough())),
            backend: Mutex::new(backend),
            skipped_frames: AtomicU64::new(0),
        }
    }

    /// Switch to `film_id`, falling back from the preferred strategy through
    /// cheaper ones until the backend and the stock can both honour it.
    /// Takes effect on the next frame.
    pub fn select(&self, film_id: &str) -> Arc<PreviewPlan> {
        let stock = self.registry.resolve(film_id);

        // LUT loads happen between the two locks so frames keep flowing.
        let strategies: Vec<PreviewStrategy> = {
            let backend = self.backend.lock();
            std::iter::successors(Some(self.preferred), |s| s.fallback())
                .filter(|s| backend.supports(*s))
                .collect()
        };
        let candidates: Vec<PreviewPlan> = strategies
            .into_iter()
            .filter_map(|strategy| PreviewPlan::for_strategy(&stock, strategy, &self.luts))
            .collect();

        let mut backend = self.backend.lock();
        let prepared = candidates.into_iter().find(|plan| match backend.prepare(plan) {
            Ok(()) => true,
            Err(e) => {
                let strategy = plan.filter.strategy().map_or("passthrough", PreviewStrategy::as_str);
                tracing::warn!(film = %stock.id, strategy, backend = backend.name(), "preview prepare failed: {e}");
                false
            }
        });
        drop(backend);
        let plan = prepared.unwrap_or_else(|| PreviewPlan {
            film_id: stock.id.clone(),
            filter: PreviewFilter::Passthrough,
        });

        tracing::info!(
            film = %plan.film_id,
            strategy = plan.filter.strategy().map_or("passthrough", PreviewStrategy::as_str),
            "preview film selected"
        );
        let plan = Arc::new(plan);
        *self.plan.write() = plan.clone();
        plan
    }

    /// Stop filtering.
    pub fn clear(&self) {
        *self.plan.write() = Arc::new(PreviewPlan::passthrough());
    }

    pub fn current_plan(&self) -> Arc<PreviewPlan> {
        self.plan.read().clone()
    }

    /// Filter one frame. Returns whether a filter was applied; on failure
    /// the frame is passed through unfiltered.
    pub fn process_frame(&self, frame: &mut FrameMut<'_>) -> bool {
        let plan = self.current_plan();
        if matches!(plan.filter, PreviewFilter::Passthrough) {
            return false;
        }
        let mut backend = self.backend.lock();
        match backend.apply(frame, &plan) {
            Ok(()) => true,
            Err(e) => {
                let skipped = self.skipped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(backend = backend.name(), skipped, "preview frame passed through: {e}");
                false
            }
        }
    }

    /// [`process_frame`](Self::process_frame) over a raw RGBA8 buffer.
    pub fn process_raw(&self, width: u32, height: u32, data: &mut [u8]) -> bool {
        match frame_from_raw(width, height, data) {
            Ok(mut frame) => self.process_frame(&mut frame),
            Err(e) => {
                self.skipped_frames.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("preview frame passed through: {e}");
                false
            }
        }
    }

    /// Frames passed through because filtering failed.
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames.load(Ordering::Relaxed)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.lock().name()
    }
}
