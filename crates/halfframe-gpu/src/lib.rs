//! Halfframe GPU: wgpu compute backend for the live preview.
//!
//! Plugs into [`halfframe_core::LivePreview`] through the
//! [`PreviewBackend`](halfframe_core::PreviewBackend) trait. Frames are uploaded
//! as packed RGBA8 storage buffers, LUTs as a 2D atlas texture (see
//! [`halfframe_core::LutAtlas`]), and results are read back synchronously.

pub mod backend;
pub mod buffers;
pub mod error;
pub mod preview_pipeline;
pub mod readback;

use std::sync::Arc;

pub use backend::GpuPreviewBackend;
pub use error::GpuError;
pub use preview_pipeline::{PreviewParamsGpu, PreviewPipeline};

/// Device features the preview shaders need. Core WebGPU is enough.
pub fn required_features() -> wgpu::Features {
    wgpu::Features::empty()
}

/// An adapter's device and queue, shared by everything the backend creates.
#[derive(Debug, Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_name: String,
}

impl GpuContext {
    /// Pick the high-performance adapter and open a device on it.
    pub fn create_blocking() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        }))
        .map_err(|e| GpuError::Adapter(e.to_string()))?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("halfframe_preview_device"),
            required_features: required_features(),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .map_err(|e| GpuError::Device(e.to_string()))?;

        tracing::info!(adapter = %adapter_name, "GPU preview device ready");
        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
        })
    }
}
