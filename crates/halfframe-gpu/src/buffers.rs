//! GPU buffer and texture management for the preview pipeline.

use halfframe_core::LutAtlas;

use crate::error::GpuError;

/// Per-resolution frame buffers: packed RGBA8 in, packed RGBA8 out, and a
/// mappable staging copy of the output.
///
/// One `u32` per pixel, bytes in memory order R, G, B, A, which is what
/// `unpack4x8unorm` / `pack4x8unorm` expect.
pub struct GpuFrameBuffers {
    pub input: wgpu::Buffer,
    pub output: wgpu::Buffer,
    pub staging: wgpu::Buffer,
    pub width: u32,
    pub height: u32,
}

impl GpuFrameBuffers {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, GpuError> {
        let size = (width as u64) * (height as u64) * 4;
        let limits = device.limits();
        if size == 0 || size > limits.max_storage_buffer_binding_size as u64 || size > limits.max_buffer_size {
            return Err(GpuError::FrameTooLarge { width, height });
        }

        let input = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("halfframe_frame_input"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("halfframe_frame_output"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("halfframe_frame_staging"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Ok(Self {
            input,
            output,
            staging,
            width,
            height,
        })
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Buffer size in bytes.
    pub fn byte_size(&self) -> u64 {
        (self.width as u64) * (self.height as u64) * 4
    }
}

/// A [`LutAtlas`] uploaded as an `Rgba8Unorm` texture.
///
/// The shader fetches texel centres itself and interpolates in the same
/// order as the CPU, so the sampler is nearest-filtered.
pub struct GpuLutAtlas {
    pub texture: wgpu::Texture,
    pub texture_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: u32,
}

impl GpuLutAtlas {
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, atlas: &LutAtlas) -> Result<Self, GpuError> {
        let max = device.limits().max_texture_dimension_2d;
        if atlas.width() > max || atlas.height() > max {
            return Err(GpuError::AtlasTooLarge { size: atlas.size() });
        }
        Ok(Self::from_texels(
            device,
            queue,
            atlas.width(),
            atlas.height(),
            atlas.size(),
            atlas.as_bytes(),
        ))
    }

    /// 1×1 stand-in bound when the active filter is not a LUT.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_texels(device, queue, 1, 1, 1, &[0, 0, 0, 255])
    }

    fn from_texels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        size: u32,
        texels: &[u8],
    ) -> Self {
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("halfframe_lut_atlas"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: None,
            },
            extent,
        );

        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("halfframe_lut_atlas_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            texture_view,
            sampler,
            size,
        }
    }
}
