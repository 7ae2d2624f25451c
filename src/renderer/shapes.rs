//! Overlay spheres, drawn into the peel color target once per layer.

use super::pipeline_util::{mesh_pipeline, MeshPipelineDesc, BLEND_FORMAT};
use crate::error::ViewerError;
use crate::frame::{ShapeKind, ShapeOverlay};
use crate::gpu::dynamic_buffer::InstanceBuffer;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::model::{GpuMesh, Mesh, MeshVertex};

/// Per-instance data for one overlay sphere.
/// Must match the WGSL `ShapeInstance` struct layout exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShapeInstance {
    /// Centre (xyz) and radius (w).
    pub center_radius: [f32; 4],
    /// Straight (not premultiplied) RGBA.
    pub color: [f32; 4],
}

impl ShapeInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![3 => Float32x4, 4 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Instances for the drawable overlays; unknown kinds are skipped.
#[must_use]
pub fn shape_instances(shapes: &[ShapeOverlay]) -> Vec<ShapeInstance> {
    shapes
        .iter()
        .filter(|s| s.kind == ShapeKind::Sphere && s.radius > 0.0)
        .map(|s| ShapeInstance {
            center_radius: s.position.extend(s.radius).to_array(),
            color: s.color,
        })
        .collect()
}

/// Peel parameters shared by every layer.
/// Must match the WGSL `PeelParams` struct layout exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PeelParams {
    /// Fragments at or in front of `previous + depth_bias` are peeled.
    pub depth_bias: f32,
    pub(crate) _pad: [f32; 3],
}

/// Instanced sphere draw with per-fragment depth peeling.
///
/// The last layer uses a variant that writes the surviving surface fully
/// opaque, so whatever lies past the layer budget still covers what is
/// behind it.
pub struct ShapePass {
    layer: wgpu::RenderPipeline,
    last: wgpu::RenderPipeline,
    mesh: GpuMesh,
    instances: InstanceBuffer<ShapeInstance>,
}

impl ShapePass {
    /// Build the layer and final-layer pipelines.
    ///
    /// # Errors
    ///
    /// Returns the composer error if `raster/shape.wgsl` fails to compose
    /// or validate.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        camera_layout: &wgpu::BindGroupLayout,
        peel_input_layout: &wgpu::BindGroupLayout,
        sphere: &Mesh,
    ) -> Result<Self, ViewerError> {
        let shader = composer.compose(device, Shader::Shape)?;
        let bind_group_layouts = [camera_layout, peel_input_layout];
        let buffers = [MeshVertex::layout(), ShapeInstance::layout()];
        let pipeline = |label: &str, fragment_entry: &str| {
            mesh_pipeline(
                device,
                &MeshPipelineDesc {
                    label,
                    shader: &shader,
                    fragment_entry,
                    bind_group_layouts: &bind_group_layouts,
                    buffers: &buffers,
                    format: BLEND_FORMAT,
                    cull_mode: Some(wgpu::Face::Back),
                },
            )
        };
        Ok(Self {
            layer: pipeline("Shape Peel", "fs_main"),
            last: pipeline("Shape Peel Final", "fs_final"),
            mesh: GpuMesh::new(device, "Sphere", sphere),
            instances: InstanceBuffer::new(device, "Shape Instances"),
        })
    }

    /// Replace the instance list.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shapes: &[ShapeOverlay],
    ) {
        let _ = self.instances.write(device, queue, &shape_instances(shapes));
    }

    /// Draw one peel layer; `last` selects the opaque variant.
    pub fn draw<'a>(
        &'a self,
        rp: &mut wgpu::RenderPass<'a>,
        camera: &'a wgpu::BindGroup,
        peel_input: &'a wgpu::BindGroup,
        last: bool,
    ) {
        if self.instances.is_empty() {
            return;
        }
        rp.set_pipeline(if last { &self.last } else { &self.layer });
        rp.set_bind_group(0, camera, &[]);
        rp.set_bind_group(1, peel_input, &[]);
        rp.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        rp.set_vertex_buffer(1, self.instances.slice());
        rp.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rp.draw_indexed(0..self.mesh.index_count, 0, 0..self.instances.len());
    }
}
