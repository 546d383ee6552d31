//! Compute pipelines for the three preview filters.
//!
//! All three entry points in `preview.wgsl` share one bind group layout:
//!
//! ```text
//!   0  src     storage, read        packed RGBA8 frame
//!   1  dst     storage, read_write  packed RGBA8 frame
//!   2  params  uniform              PreviewParamsGpu
//!   3  atlas   texture_2d<f32>      LUT atlas (1×1 placeholder otherwise)
//!   4  sampler nearest, clamp
//! ```

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use halfframe_core::{ColorMatrix, PreviewStrategy};

use crate::buffers::{GpuFrameBuffers, GpuLutAtlas};

const WORKGROUP_SIZE: u32 = 16;

/// Uniform block mirrored by `Params` in `preview.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PreviewParamsGpu {
    /// width, height, LUT size, monochrome flag.
    pub dims: [u32; 4],
    pub row_r: [f32; 4],
    pub row_g: [f32; 4],
    pub row_b: [f32; 4],
    pub row_a: [f32; 4],
    pub offset: [f32; 4],
    pub tint: [f32; 4],
}

impl PreviewParamsGpu {
    pub fn new(width: u32, height: u32) -> Self {
        let mut params = Self::zeroed();
        params.dims = [width, height, 1, 0];
        params.set_matrix(&ColorMatrix::IDENTITY);
        params
    }

    pub fn set_matrix(&mut self, matrix: &ColorMatrix) {
        let ([r, g, b, a], offset) = matrix.shader_rows();
        self.row_r = r;
        self.row_g = g;
        self.row_b = b;
        self.row_a = a;
        self.offset = offset;
    }

    pub fn set_tint(&mut self, tint: [f32; 4]) {
        self.tint = tint;
    }

    pub fn set_lut(&mut self, size: u32, monochrome: bool) {
        self.dims[2] = size;
        self.dims[3] = u32::from(monochrome);
    }
}

pub struct PreviewPipeline {
    layout: wgpu::BindGroupLayout,
    tint_pipeline: wgpu::ComputePipeline,
    matrix_pipeline: wgpu::ComputePipeline,
    lut_pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
}

impl PreviewPipeline {
    /// Compile `preview.wgsl` and build one pipeline per filter.
    pub fn new(device: &wgpu::Device) -> Self {
        let params_size = std::mem::size_of::<PreviewParamsGpu>() as u64;
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("halfframe_preview_params"),
            size: params_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("halfframe_preview_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/preview.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("halfframe_preview_layout"),
            entries: &[
                storage_ro_entry(0, 4),
                storage_rw_entry(1, 4),
                uniform_entry(2, params_size),
                atlas_texture_entry(3),
                sampler_entry(4),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("halfframe_preview_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let build = |label: &'static str, entry_point: &'static str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };

        Self {
            tint_pipeline: build("halfframe_preview_tint_pipeline", "apply_tint"),
            matrix_pipeline: build("halfframe_preview_matrix_pipeline", "apply_matrix"),
            lut_pipeline: build("halfframe_preview_lut_pipeline", "apply_lut"),
            layout,
            params_buffer,
        }
    }

    /// Record one filter pass from `frame.input` into `frame.output`.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        strategy: PreviewStrategy,
        params: &PreviewParamsGpu,
        frame: &GpuFrameBuffers,
        atlas: &GpuLutAtlas,
    ) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("halfframe_preview_bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame.input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: frame.output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&atlas.texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&atlas.sampler),
                },
            ],
        });

        let pipeline = match strategy {
            PreviewStrategy::Tint => &self.tint_pipeline,
            PreviewStrategy::Matrix => &self.matrix_pipeline,
            PreviewStrategy::Lut => &self.lut_pipeline,
        };

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("halfframe_preview_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(
            frame.width.div_ceil(WORKGROUP_SIZE),
            frame.height.div_ceil(WORKGROUP_SIZE),
            1,
        );
    }
}

// ── Layout helpers ──────────────────────────────────────────────────

fn storage_ro_entry(binding: u32, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(min_size),
        },
        count: None,
    }
}

fn storage_rw_entry(binding: u32, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(min_size),
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(min_size),
        },
        count: None,
    }
}

fn atlas_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_layout_matches_shader_struct() {
        // vec4<u32> + six vec4<f32>
        assert_eq!(std::mem::size_of::<PreviewParamsGpu>(), 112);
    }

    #[test]
    fn test_params_carry_matrix_rows() {
        let matrix = ColorMatrix::from_rows([
            1.0, 2.0, 3.0, 4.0, 5.0, //
            6.0, 7.0, 8.0, 9.0, 10.0, //
            11.0, 12.0, 13.0, 14.0, 15.0, //
            16.0, 17.0, 18.0, 19.0, 20.0,
        ]);
        let mut params = PreviewParamsGpu::new(8, 4);
        params.set_matrix(&matrix);
        assert_eq!(params.row_r, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(params.row_b, [11.0, 12.0, 13.0, 14.0]);
        assert_eq!(params.offset, [5.0, 10.0, 15.0, 20.0]);
        assert_eq!(params.dims, [8, 4, 1, 0]);
    }

    #[test]
    fn test_params_lut_flags() {
        let mut params = PreviewParamsGpu::new(2, 2);
        params.set_lut(17, true);
        assert_eq!(params.dims, [2, 2, 17, 1]);
    }
}
