//! [`PreviewBackend`] on wgpu compute.
//!
//! LUT atlases are baked and uploaded in `prepare` (the selection path) and
//! cached per reference; the frame path only uploads the frame, dispatches
//! one pass and reads the result back.

use std::collections::HashMap;
use std::sync::Arc;

use halfframe_core::preview::FrameMut;
use halfframe_core::{Lut3D, LutAtlas, PreviewBackend, PreviewError, PreviewFilter, PreviewPlan, PreviewStrategy};

use crate::GpuContext;
use crate::buffers::{GpuFrameBuffers, GpuLutAtlas};
use crate::error::GpuError;
use crate::preview_pipeline::{PreviewParamsGpu, PreviewPipeline};
use crate::readback;

struct CachedAtlas {
    source: Arc<Lut3D>,
    atlas: GpuLutAtlas,
}

pub struct GpuPreviewBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: PreviewPipeline,
    placeholder: GpuLutAtlas,
    atlases: HashMap<String, CachedAtlas>,
    /// Reallocated when the frame size changes.
    frame: Option<GpuFrameBuffers>,
}

impl GpuPreviewBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let pipeline = PreviewPipeline::new(&device);
        let placeholder = GpuLutAtlas::placeholder(&device, &queue);
        Self {
            device,
            queue,
            pipeline,
            placeholder,
            atlases: HashMap::new(),
            frame: None,
        }
    }

    pub fn from_context(context: &GpuContext) -> Self {
        Self::new(context.device.clone(), context.queue.clone())
    }

    /// Open the default adapter and build a backend on it.
    pub fn create_blocking() -> Result<Self, GpuError> {
        GpuContext::create_blocking().map(|context| Self::from_context(&context))
    }

    /// Number of LUT atlases resident on the device.
    pub fn cached_atlases(&self) -> usize {
        self.atlases.len()
    }

    /// Upload `lut` unless the cached atlas for `reference` came from the
    /// same table.
    fn ensure_atlas(&mut self, reference: &str, lut: &Arc<Lut3D>) -> Result<(), GpuError> {
        if self
            .atlases
            .get(reference)
            .is_some_and(|cached| Arc::ptr_eq(&cached.source, lut))
        {
            return Ok(());
        }
        let atlas = GpuLutAtlas::upload(&self.device, &self.queue, &LutAtlas::bake(lut))?;
        tracing::debug!(reference, size = atlas.size, "LUT atlas uploaded");
        self.atlases.insert(
            reference.to_string(),
            CachedAtlas {
                source: lut.clone(),
                atlas,
            },
        );
        Ok(())
    }

    fn atlas_for(&self, filter: &PreviewFilter) -> &GpuLutAtlas {
        match filter {
            PreviewFilter::Lut { reference, .. } => self
                .atlases
                .get(reference)
                .map_or(&self.placeholder, |cached| &cached.atlas),
            _ => &self.placeholder,
        }
    }

    fn ensure_frame(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        if self.frame.as_ref().is_some_and(|f| f.matches(width, height)) {
            return Ok(());
        }
        self.frame = Some(GpuFrameBuffers::new(&self.device, width, height)?);
        tracing::debug!(width, height, "preview frame buffers allocated");
        Ok(())
    }
}

impl PreviewBackend for GpuPreviewBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn supports(&self, _strategy: PreviewStrategy) -> bool {
        true
    }

    fn prepare(&mut self, plan: &PreviewPlan) -> Result<(), PreviewError> {
        if let PreviewFilter::Lut { reference, lut, .. } = &plan.filter {
            self.ensure_atlas(reference, lut)?;
        }
        Ok(())
    }

    fn apply(&mut self, frame: &mut FrameMut<'_>, plan: &PreviewPlan) -> Result<(), PreviewError> {
        let Some(strategy) = plan.filter.strategy() else {
            return Ok(());
        };
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(());
        }

        let mut params = PreviewParamsGpu::new(width, height);
        match &plan.filter {
            PreviewFilter::Passthrough => {}
            PreviewFilter::Tint(tint) => params.set_tint(*tint),
            PreviewFilter::Matrix(matrix) => params.set_matrix(matrix),
            PreviewFilter::Lut {
                reference,
                lut,
                monochrome,
            } => {
                self.ensure_atlas(reference, lut)?;
                params.set_lut(lut.size(), *monochrome);
            }
        }
        self.ensure_frame(width, height)?;

        let Some(buffers) = self.frame.as_ref() else {
            return Err(PreviewError::Backend("frame buffers unavailable".into()));
        };
        let atlas = self.atlas_for(&plan.filter);
        let pixels: &mut [u8] = frame;
        self.queue.write_buffer(&buffers.input, 0, pixels);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("halfframe_preview_encoder"),
        });
        self.pipeline
            .dispatch(&self.device, &self.queue, &mut encoder, strategy, &params, buffers, atlas);
        readback::submit_and_read(&self.device, &self.queue, encoder, buffers, pixels)?;
        Ok(())
    }
}
