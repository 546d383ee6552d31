use halfframe_core::PreviewError;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),
    #[error("failed to open GPU device: {0}")]
    Device(String),
    #[error("frame of {width}x{height} exceeds the device's buffer limits")]
    FrameTooLarge { width: u32, height: u32 },
    #[error("LUT atlas for size {size} exceeds the device's texture limits")]
    AtlasTooLarge { size: u32 },
    #[error("GPU readback failed: {0}")]
    Readback(String),
}

impl From<GpuError> for PreviewError {
    fn from(e: GpuError) -> Self {
        PreviewError::Backend(e.to_string())
    }
}
