//! Triangle meshes for the instanced draws: the cell capsule and the
//! overlay sphere.
//!
//! Both come either from the procedural generators in [`procedural`] or
//! from a single-primitive glTF file ([`gltf`]). A loaded capsule must use
//! the same convention as the generated one: unit radius along +Y with the
//! hemisphere centres at `y = ±1`.

pub mod gltf;
pub mod procedural;

use std::path::Path;

use wgpu::util::DeviceExt;

use crate::error::ViewerError;
use crate::options::ModelOptions;

/// One mesh vertex, as laid out in the vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Unit normal.
    pub normal: [f32; 3],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
    ];

    /// Per-vertex buffer layout at shader locations 0..=2.
    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertices.
    pub vertices: Vec<MeshVertex>,
    /// Counter-clockwise (outward-facing) triangles.
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn validate(&self, name: &str) -> Result<(), ViewerError> {
        if self.indices.is_empty() || self.indices.len() % 3 != 0 {
            return Err(ViewerError::Model(format!(
                "{name}: {} indices is not a triangle list",
                self.indices.len()
            )));
        }
        let count = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(ViewerError::Model(format!(
                "{name}: index {bad} out of range for {count} vertices"
            )));
        }
        Ok(())
    }
}

/// A mesh resident on the GPU.
pub struct GpuMesh {
    /// Vertex buffer of [`MeshVertex`].
    pub vertex_buffer: wgpu::Buffer,
    /// `u32` index buffer.
    pub index_buffer: wgpu::Buffer,
    /// Number of indices to draw.
    pub index_count: u32,
}

impl GpuMesh {
    /// Upload `mesh`.
    #[must_use]
    pub fn new(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertices")),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: u32::try_from(mesh.indices.len()).unwrap_or(u32::MAX),
        }
    }
}

/// The meshes every frame draws with.
#[derive(Debug, Clone)]
pub struct MeshSet {
    /// Cell capsule.
    pub capsule: Mesh,
    /// Overlay sphere (unit radius).
    pub sphere: Mesh,
}

impl MeshSet {
    /// Load or generate the meshes named in `options`.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Model`] if a file cannot be read, is not a usable
    /// single-primitive glTF, or yields a malformed triangle list.
    pub fn load(options: &ModelOptions) -> Result<Self, ViewerError> {
        let stacks = options.stacks.max(2);
        let slices = options.slices.max(3);
        let capsule = load_or(options.capsule.as_deref(), "capsule", || {
            procedural::capsule(stacks, slices)
        })?;
        let sphere = load_or(options.sphere.as_deref(), "sphere", || {
            procedural::uv_sphere(stacks, slices)
        })?;
        Ok(Self { capsule, sphere })
    }
}

fn load_or(
    path: Option<&Path>,
    name: &str,
    generate: impl FnOnce() -> Mesh,
) -> Result<Mesh, ViewerError> {
    let mesh = match path {
        Some(path) => {
            let mesh = gltf::load(path)?;
            log::info!(
                "loaded {name} mesh from {} ({} triangles)",
                path.display(),
                mesh.triangle_count()
            );
            mesh
        }
        None => generate(),
    };
    mesh.validate(name)?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_32_bytes() {
        assert_eq!(size_of::<MeshVertex>(), 32);
        assert_eq!(MeshVertex::layout().array_stride, 32);
    }

    #[test]
    fn default_options_generate_both_meshes() {
        let set = MeshSet::load(&ModelOptions::default()).unwrap();
        assert!(set.capsule.triangle_count() > 0);
        assert!(set.sphere.triangle_count() > 0);
    }

    #[test]
    fn missing_file_is_fatal() {
        let options = ModelOptions {
            capsule: Some("/nonexistent/capsule.gltf".into()),
            ..ModelOptions::default()
        };
        assert!(matches!(
            MeshSet::load(&options),
            Err(ViewerError::Model(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_indices() {
        let mesh = Mesh {
            vertices: vec![MeshVertex::default(); 3],
            indices: vec![0, 1, 3],
        };
        assert!(mesh.validate("t").is_err());
        let mesh = Mesh {
            vertices: vec![MeshVertex::default(); 3],
            indices: vec![0, 1],
        };
        assert!(mesh.validate("t").is_err());
    }
}
