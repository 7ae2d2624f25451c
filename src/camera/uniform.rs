use glam::Mat4;
use wgpu::util::DeviceExt;

use super::orbit::OrbitCamera;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
/// GPU uniform buffer holding the camera matrices and per-view render
/// state shared by every pass.
pub struct CameraUniform {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Inverse of `view_proj`, for reconstructing world positions from
    /// depth.
    pub inv_view_proj: [[f32; 4]; 4],
    /// Camera world-space position.
    pub position: [f32; 3],
    /// Instance index of the selected cell (-1 if none).
    pub selected_index: i32,
    /// Render target size in pixels.
    pub screen_size: [f32; 2],
    /// 1 to draw thin silhouette outlines, 0 for regular ones.
    pub thin_outlines: u32,
    /// Padding for GPU alignment.
    pub(crate) _pad: u32,
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    /// Identity matrices, nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            inv_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 3],
            selected_index: -1,
            screen_size: [1.0, 1.0],
            thin_outlines: 0,
            _pad: 0,
        }
    }

    /// Update the matrix fields from the camera's current pose.
    pub fn update_view_proj(&mut self, camera: &OrbitCamera) {
        let view_proj = camera.view_projection();
        self.view_proj = view_proj.to_cols_array_2d();
        self.inv_view_proj = view_proj.inverse().to_cols_array_2d();
        self.position = camera.position().to_array();
    }
}

/// GPU side of the camera: uniform buffer, bind group layout and bind
/// group at group 0 of every camera-aware pipeline.
pub struct CameraBinding {
    /// CPU copy of the uniform, written once per tick.
    pub uniform: CameraUniform,
    /// Uniform buffer.
    pub buffer: wgpu::Buffer,
    /// VERTEX | FRAGMENT uniform layout.
    pub layout: wgpu::BindGroupLayout,
    /// Bind group over `buffer`.
    pub bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    /// Allocate the buffer and bind group.
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();

        let buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });

        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX
                        | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("Camera Bind Group"),
        });

        Self {
            uniform,
            buffer,
            layout,
            bind_group,
        }
    }

    /// Upload the current uniform.
    pub fn update_gpu(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
