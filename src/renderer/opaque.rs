//! Opaque pass: ground grid and instanced capsule cells.

use super::pipeline_util::{mesh_pipeline, MeshPipelineDesc, OPAQUE_FORMAT};
use crate::error::ViewerError;
use crate::frame::CellInstance;
use crate::gpu::dynamic_buffer::InstanceBuffer;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::model::{GpuMesh, Mesh, MeshVertex};

/// Lines per grid direction.
pub const GRID_LINES: u32 = 201;
/// Instances drawn for the grid: one quad per line, both directions.
pub const GRID_INSTANCES: u32 = 2 * GRID_LINES;

const CELL_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    3 => Float32x3,
    4 => Float32x3,
    5 => Float32,
    6 => Float32,
    7 => Unorm8x4,
];

/// [`CellInstance`] as a per-instance vertex buffer at locations 3..=7.
pub fn cell_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: CellInstance::SIZE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &CELL_ATTRIBUTES,
    }
}

/// Instanced capsule draw.
pub struct CellPass {
    pipeline: wgpu::RenderPipeline,
    mesh: GpuMesh,
    instances: InstanceBuffer<CellInstance>,
}

impl CellPass {
    /// Build the capsule pipeline around `capsule`.
    ///
    /// # Errors
    ///
    /// Returns the composer error if `raster/cell.wgsl` fails to compose or
    /// validate.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        camera_layout: &wgpu::BindGroupLayout,
        capsule: &Mesh,
    ) -> Result<Self, ViewerError> {
        let shader = composer.compose(device, Shader::Cell)?;
        let pipeline = mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Cell",
                shader: &shader,
                fragment_entry: "fs_main",
                bind_group_layouts: &[camera_layout],
                buffers: &[MeshVertex::layout(), cell_instance_layout()],
                format: OPAQUE_FORMAT,
                cull_mode: Some(wgpu::Face::Back),
            },
        );
        Ok(Self {
            pipeline,
            mesh: GpuMesh::new(device, "Capsule", capsule),
            instances: InstanceBuffer::new(device, "Cell Instances"),
        })
    }

    /// Overwrite the instance buffer with a new frame's cells.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        cells: &[CellInstance],
    ) {
        let _ = self.instances.write(device, queue, cells);
    }

    /// Draw every uploaded cell. Nothing is drawn for an empty frame.
    pub fn draw<'a>(
        &'a self,
        rp: &mut wgpu::RenderPass<'a>,
        camera: &'a wgpu::BindGroup,
    ) {
        if self.instances.is_empty() {
            return;
        }
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, camera, &[]);
        rp.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        rp.set_vertex_buffer(1, self.instances.slice());
        rp.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rp.draw_indexed(0..self.mesh.index_count, 0, 0..self.instances.len());
    }
}

/// Ground grid: vertex-less instanced quads, culling off.
pub struct GridPass {
    pipeline: wgpu::RenderPipeline,
}

impl GridPass {
    /// Build the grid pipeline.
    ///
    /// # Errors
    ///
    /// Returns the composer error if `raster/grid.wgsl` fails to compose or
    /// validate.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        camera_layout: &wgpu::BindGroupLayout,
    ) -> Result<Self, ViewerError> {
        let shader = composer.compose(device, Shader::Grid)?;
        let pipeline = mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Grid",
                shader: &shader,
                fragment_entry: "fs_main",
                bind_group_layouts: &[camera_layout],
                buffers: &[],
                format: OPAQUE_FORMAT,
                cull_mode: None,
            },
        );
        Ok(Self { pipeline })
    }

    /// Draw the grid lines.
    pub fn draw<'a>(
        &'a self,
        rp: &mut wgpu::RenderPass<'a>,
        camera: &'a wgpu::BindGroup,
    ) {
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, camera, &[]);
        rp.draw(0..6, 0..GRID_INSTANCES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_layout_matches_wire_record() {
        let layout = cell_instance_layout();
        assert_eq!(layout.array_stride, 36);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 28, 32]);
        assert_eq!(
            std::mem::offset_of!(CellInstance, color_rgba) as u64,
            offsets[4]
        );
    }
}
