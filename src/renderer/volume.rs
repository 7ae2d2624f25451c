//! Volumetric field: 3D texture upload and ray-march parameters.

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use crate::frame::VolumetricField;
use crate::gpu::pipeline_helpers::{clamped_sampler, filtering_sampler, texture_3d, uniform_buffer};

/// Upper bound on march steps per segment.
const MAX_MARCH_STEPS: u32 = 512;

/// Ray-march parameters.
/// Must match the WGSL `VolumeParams` struct layout exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VolumeParams {
    /// Corner of the grid used for texture addressing.
    pub sample_origin: [f32; 3],
    /// Opacity multiplier.
    pub density: f32,
    /// World size of the whole grid.
    pub extent: [f32; 3],
    /// Reference step: half the smallest voxel edge.
    pub step_length: f32,
    /// Step cap per march.
    pub max_steps: u32,
    pub(crate) _pad: [u32; 3],
}

impl VolumeParams {
    /// Parameters for marching `field` at `density`.
    #[must_use]
    pub fn new(field: &VolumetricField, density: f32) -> Self {
        let cell = field.cell_size.abs();
        Self {
            sample_origin: field.sample_origin().to_array(),
            density: density.max(0.0),
            extent: field.extent().abs().max(glam::Vec3::splat(f32::EPSILON)).to_array(),
            step_length: (0.5 * cell.min_element()).max(1e-4),
            max_steps: MAX_MARCH_STEPS,
            _pad: [0; 3],
        }
    }
}

/// Resident copy of the current frame's field.
pub struct VolumeResources {
    /// Group 2 of the volume composite: field texture, sampler, params.
    pub layout: wgpu::BindGroupLayout,
    nearest: wgpu::Sampler,
    linear: wgpu::Sampler,
    params: wgpu::Buffer,
    texture: Option<(wgpu::Texture, wgpu::BindGroup)>,
    linear_filter: bool,
}

impl VolumeResources {
    /// Layout, samplers and params buffer; no field is resident yet.
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Volume Layout"),
            entries: &[texture_3d(0), filtering_sampler(1), uniform_buffer(2)],
        });
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Volume Params"),
            contents: bytemuck::bytes_of(&VolumeParams::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            layout,
            nearest: clamped_sampler(device, "Volume Nearest", wgpu::FilterMode::Nearest),
            linear: clamped_sampler(device, "Volume Linear", wgpu::FilterMode::Linear),
            params,
            texture: None,
            linear_filter: false,
        }
    }

    /// Bind group of the uploaded field, if any.
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.texture.as_ref().map(|(_, bg)| bg)
    }

    /// Replace the resident field. `None`, empty grids, and grids beyond
    /// the device's 3D texture limit leave no field resident.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        field: Option<&VolumetricField>,
        density: f32,
    ) {
        let Some(field) = field.filter(|f| !f.is_empty()) else {
            self.texture = None;
            return;
        };
        let [x, y, z] = field.cell_count.to_array().map(|c| c.unsigned_abs());
        let limit = device.limits().max_texture_dimension_3d;
        if x > limit || y > limit || z > limit {
            log::warn!("field grid {x}x{y}x{z} exceeds the 3D texture limit {limit}");
            self.texture = None;
            return;
        }

        let size = wgpu::Extent3d {
            width: x,
            height: y,
            depth_or_array_layers: z,
        };
        let reuse = self
            .texture
            .as_ref()
            .is_some_and(|(t, _)| t.size() == size);
        if !reuse {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Volumetric Field"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D3,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let bind_group = self.make_bind_group(device, &texture);
            self.texture = Some((texture, bind_group));
        }
        if let Some((texture, _)) = &self.texture {
            queue.write_texture(
                texture.as_image_copy(),
                &field.voxels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * x),
                    rows_per_image: Some(y),
                },
                size,
            );
        }
        self.write_params(queue, field, density);
    }

    /// Rewrite the march parameters, e.g. after a density change.
    pub fn write_params(&self, queue: &wgpu::Queue, field: &VolumetricField, density: f32) {
        queue.write_buffer(&self.params, 0, bytemuck::bytes_of(&VolumeParams::new(field, density)));
    }

    /// Switch between nearest and trilinear sampling.
    pub fn set_linear_filter(&mut self, device: &wgpu::Device, linear: bool) {
        if self.linear_filter == linear {
            return;
        }
        self.linear_filter = linear;
        if let Some((texture, _)) = self.texture.take() {
            let bind_group = self.make_bind_group(device, &texture);
            self.texture = Some((texture, bind_group));
        }
    }

    fn make_bind_group(&self, device: &wgpu::Device, texture: &wgpu::Texture) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = if self.linear_filter {
            &self.linear
        } else {
            &self.nearest
        };
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Volume Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params.as_entire_binding(),
                },
            ],
        })
    }
}
