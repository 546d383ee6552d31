//! Halfframe Core: film-emulation grading pipeline.
//!
//! This crate contains the film stock catalog, LUT parsing and caching, the
//! matrix and trilinear LUT transforms, the half-frame compositor, and the
//! live preview approximator with its CPU backend. No GPU dependencies; the
//! wgpu preview backend lives in `halfframe-gpu`.

pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod film;
pub mod image;
pub mod jobs;
pub mod preview;
pub mod transform;

// Re-exports for convenience.
pub use compositor::{FrameCompositor, ProcessedImageResult, ProcessingOptions};
pub use config::{AspectRatio, PipelineConfig, RgbaColor};
pub use engine::{Engine, EngineBuilder};
pub use error::{LutError, PipelineError, PreviewError, RegistryError};
pub use film::{FilmRegistry, FilmStock};
pub use jobs::{CaptureOutcome, CaptureWorker, SubmitError};
pub use preview::{LivePreview, PreviewBackend, PreviewFilter, PreviewPlan, PreviewStrategy};
pub use transform::{ColorMatrix, ColorTransform, Lut3D, LutAtlas, LutStore};
