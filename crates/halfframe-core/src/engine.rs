//! The engine: owns the caches shared by capture jobs and the live preview.
//!
//! One engine per application. Everything it hands out (compositors,
//! previews, workers) shares its registry, LUT cache and font system through
//! `Arc`s; dropping the engine and all of those releases the caches.

use std::sync::Arc;

use crate::compositor::{FrameCompositor, TextRenderer};
use crate::config::PipelineConfig;
use crate::error::RegistryError;
use crate::film::FilmRegistry;
use crate::jobs::CaptureWorker;
use crate::preview::{CpuPreviewBackend, LivePreview, PreviewBackend, PreviewStrategy};
use crate::transform::LutStore;

#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<PipelineConfig>,
    registry: Arc<FilmRegistry>,
    luts: Arc<LutStore>,
    text: Arc<TextRenderer>,
}

impl Engine {
    /// Engine with the built-in film catalog and LUTs.
    pub fn new(config: PipelineConfig) -> Result<Self, RegistryError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<FilmRegistry> {
        &self.registry
    }

    pub fn luts(&self) -> &Arc<LutStore> {
        &self.luts
    }

    pub fn compositor(&self) -> FrameCompositor {
        FrameCompositor::new(
            self.config.clone(),
            self.registry.clone(),
            self.luts.clone(),
            self.text.clone(),
        )
    }

    /// Single-flight async wrapper around [`compositor`](Self::compositor).
    pub fn capture_worker(&self) -> CaptureWorker {
        CaptureWorker::new(self.compositor(), self.config.job_timeout)
    }

    pub fn live_preview<B: PreviewBackend>(&self, backend: B, preferred: PreviewStrategy) -> LivePreview<B> {
        LivePreview::new(self.registry.clone(), self.luts.clone(), backend, preferred)
    }

    /// Live preview on the CPU backend, preferring the LUT strategy.
    pub fn cpu_preview(&self) -> LivePreview<CpuPreviewBackend> {
        self.live_preview(
            CpuPreviewBackend::new(self.config.preview_lut_dimension),
            PreviewStrategy::Lut,
        )
    }
}

#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: Option<PipelineConfig>,
    registry: Option<FilmRegistry>,
    luts: Option<LutStore>,
}

impl EngineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the built-in catalog.
    pub fn registry(mut self, registry: FilmRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the built-in LUT store.
    pub fn luts(mut self, luts: LutStore) -> Self {
        self.luts = Some(luts);
        self
    }

    pub fn build(self) -> Result<Engine, RegistryError> {
        let config = self.config.unwrap_or_default();
        let registry = match self.registry {
            Some(r) => r,
            None => FilmRegistry::builtin()?,
        };
        let luts = self.luts.unwrap_or_else(LutStore::with_builtin);
        let text = TextRenderer::new(config.font_path.clone());

        tracing::debug!(
            stocks = registry.len(),
            luts = luts.references().len(),
            "engine ready"
        );
        Ok(Engine {
            config: Arc::new(config),
            registry: Arc::new(registry),
            luts: Arc::new(luts),
            text: Arc::new(text),
        })
    }
}
