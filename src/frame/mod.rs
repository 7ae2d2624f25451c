//! Per-step simulation snapshots and the overlays that accompany them.
//!
//! A [`Frame`] is immutable once decoded: the session replaces the whole
//! frame when a newer one is applied, it never patches one in place.

pub mod codec;
pub mod shapes;

use glam::{IVec3, Vec3};

pub use codec::{decode, encode, FrameError};
pub use shapes::{ShapeKind, ShapeOverlay};

/// One capsule-shaped agent, laid out exactly like its 36-byte wire record
/// so a frame's cells upload to the GPU as a per-instance vertex buffer
/// without conversion.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct CellInstance {
    /// Capsule center in world space.
    pub position: [f32; 3],
    /// Unit axis direction.
    pub axis_direction: [f32; 3],
    /// Length of the cylindrical body (cap centers are `length` apart).
    pub length: f32,
    /// Cap / body radius.
    pub radius: f32,
    /// Display color, RGBA8.
    pub color_rgba: [u8; 4],
}

impl CellInstance {
    /// Size of one record in bytes, in memory and on the wire.
    pub const SIZE: usize = 36;

    /// Center as a vector.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Axis reconstructed through its spherical angles.
    ///
    /// `yaw = atan2(x, z)`, `pitch = acos(y)`; the stored direction is
    /// normalized first so slightly denormalized input still lands on the
    /// unit sphere. A zero direction falls back to +Y.
    #[must_use]
    pub fn axis(&self) -> Vec3 {
        let d = Vec3::from_array(self.axis_direction).normalize_or(Vec3::Y);
        let yaw = d.x.atan2(d.z);
        let pitch = d.y.clamp(-1.0, 1.0).acos();
        Vec3::new(
            yaw.sin() * pitch.sin(),
            pitch.cos(),
            yaw.cos() * pitch.sin(),
        )
    }

    /// Cap-center endpoints at `position ± 0.5·length·axis`.
    #[must_use]
    pub fn endpoints(&self) -> (Vec3, Vec3) {
        let half = self.axis() * (0.5 * self.length.max(0.0));
        let c = self.center();
        (c - half, c + half)
    }
}

/// Uniform 3D grid of RGBA8 color+opacity samples.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumetricField {
    /// Field origin, stored as received.
    pub origin: Vec3,
    /// Extent of one grid cell.
    pub cell_size: Vec3,
    /// Number of grid cells along each axis.
    pub cell_count: IVec3,
    /// `4 * x * y * z` bytes, x fastest.
    pub voxels: Vec<u8>,
}

impl VolumetricField {
    /// Corner-aligned origin used for texture addressing.
    #[must_use]
    pub fn sample_origin(&self) -> Vec3 {
        self.origin - 0.5 * self.cell_size
    }

    /// World-space extent of the whole grid.
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.cell_size * self.cell_count.as_vec3()
    }

    /// Total voxel count.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        let c = self.cell_count.max(IVec3::ZERO);
        c.x as usize * c.y as usize * c.z as usize
    }

    /// `true` if the grid has no voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voxel_count() == 0
    }
}

/// Immutable snapshot of one simulation step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Capsule records.
    pub cells: Vec<CellInstance>,
    /// Stable identifiers, parallel to `cells`.
    pub cell_ids: Vec<u64>,
    /// Optional volumetric signal field.
    pub field: Option<VolumetricField>,
}

impl Frame {
    /// Number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Index of the cell carrying `id`, by linear scan.
    #[must_use]
    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.cell_ids.iter().position(|&c| c == id)
    }

    /// Identifier of the cell at `index`.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<u64> {
        self.cell_ids.get(index).copied()
    }
}
