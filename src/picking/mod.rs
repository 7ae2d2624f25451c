//! CPU picking: resolve a pointer pixel to the identifier of the nearest
//! cell under it.
//!
//! The ray is unprojected through the camera's inverse projection and
//! inverse view; every capsule is tested with [`capsule::intersect_capsule`].
//! The search sits behind [`CapsuleIndex`] so an acceleration structure can
//! replace the linear scan without changing [`pick`].

pub mod capsule;

use glam::{Vec2, Vec3, Vec4};

pub use capsule::{intersect_capsule, Ray};

use crate::camera::OrbitCamera;
use crate::frame::Frame;

/// Nearest-hit query over a frame's capsules.
pub trait CapsuleIndex {
    /// Index and distance of the closest capsule hit by `ray`.
    fn nearest_hit(&self, frame: &Frame, ray: &Ray) -> Option<(usize, f32)>;
}

/// O(n) scan over every cell.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearScan;

impl CapsuleIndex for LinearScan {
    fn nearest_hit(&self, frame: &Frame, ray: &Ray) -> Option<(usize, f32)> {
        frame
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| {
                let (a, b) = cell.endpoints();
                intersect_capsule(ray, a, b, cell.radius).map(|t| (i, t))
            })
            .min_by(|x, y| x.1.total_cmp(&y.1))
    }
}

/// World-space ray through `pixel` (origin top-left) of a
/// `viewport`-sized target.
#[must_use]
pub fn screen_ray(camera: &OrbitCamera, pixel: Vec2, viewport: Vec2) -> Ray {
    let ndc = Vec2::new(
        2.0 * pixel.x / viewport.x - 1.0,
        1.0 - 2.0 * pixel.y / viewport.y,
    );
    let inv_proj = camera.projection_matrix().inverse();
    let inv_view = camera.view_matrix().inverse();

    let eye = inv_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
    let view_dir = (eye.truncate() / eye.w).normalize_or(Vec3::NEG_Z);
    let direction = inv_view.transform_vector3(view_dir).normalize();

    Ray {
        origin: camera.position(),
        direction,
    }
}

/// Identifier of the frontmost cell under `pixel`, if any.
#[must_use]
pub fn pick(
    camera: &OrbitCamera,
    pixel: Vec2,
    viewport: Vec2,
    frame: &Frame,
) -> Option<u64> {
    pick_with(&LinearScan, camera, pixel, viewport, frame)
}

/// [`pick`] over a caller-supplied index.
#[must_use]
pub fn pick_with(
    index: &impl CapsuleIndex,
    camera: &OrbitCamera,
    pixel: Vec2,
    viewport: Vec2,
    frame: &Frame,
) -> Option<u64> {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return None;
    }
    let ray = screen_ray(camera, pixel, viewport);
    let (hit, _) = index.nearest_hit(frame, &ray)?;
    frame.id_at(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{codec, CellInstance};
    use crate::options::CameraOptions;

    fn cell(position: [f32; 3]) -> CellInstance {
        CellInstance {
            position,
            axis_direction: [1.0, 0.0, 0.0],
            length: 3.0,
            radius: 1.0,
            color_rgba: [200, 200, 200, 255],
        }
    }

    fn project(camera: &OrbitCamera, world: Vec3, viewport: Vec2) -> Vec2 {
        let clip = camera.view_projection() * world.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.x,
            (1.0 - ndc.y) * 0.5 * viewport.y,
        )
    }

    #[test]
    fn center_pixel_ray_points_at_orbit_center() {
        let camera = OrbitCamera::new(&CameraOptions::default(), 1.5);
        let viewport = Vec2::new(900.0, 600.0);
        let ray = screen_ray(&camera, viewport * 0.5, viewport);
        let to_center = (camera.orbit_center - ray.origin).normalize();
        assert!((ray.direction - to_center).length() < 1e-4);
    }

    #[test]
    fn decoded_frame_picks_projected_cell() {
        let frame = Frame {
            cells: vec![cell([-10.0, 0.0, 0.0]), cell([10.0, 0.0, 5.0])],
            cell_ids: vec![100, 200],
            field: None,
        };
        let decoded = codec::decode(&codec::encode(&frame)).unwrap();
        assert_eq!(decoded.cell_ids, vec![100, 200]);
        assert_eq!(decoded.cells[1].position, [10.0, 0.0, 5.0]);

        let viewport = Vec2::new(800.0, 600.0);
        let camera = OrbitCamera::new(&CameraOptions::default(), 800.0 / 600.0);
        let pixel = project(&camera, Vec3::new(10.0, 0.0, 5.0), viewport);
        assert_eq!(pick(&camera, pixel, viewport, &decoded), Some(200));

        let pixel = project(&camera, Vec3::new(-10.0, 0.0, 0.0), viewport);
        assert_eq!(pick(&camera, pixel, viewport, &decoded), Some(100));
    }

    #[test]
    fn empty_space_picks_nothing() {
        let frame = Frame {
            cells: vec![cell([0.0, 0.0, 0.0])],
            cell_ids: vec![1],
            field: None,
        };
        let viewport = Vec2::new(800.0, 600.0);
        let camera = OrbitCamera::new(&CameraOptions::default(), 800.0 / 600.0);
        assert_eq!(pick(&camera, Vec2::new(5.0, 5.0), viewport, &frame), None);
    }

    #[test]
    fn nearest_of_overlapping_cells_wins() {
        // Stacked along the view axis: the higher cell is closer to a
        // camera looking straight down.
        let frame = Frame {
            cells: vec![cell([0.0, 0.0, 0.0]), cell([0.0, 5.0, 0.0])],
            cell_ids: vec![1, 2],
            field: None,
        };
        let viewport = Vec2::new(640.0, 640.0);
        let camera = OrbitCamera::new(&CameraOptions::default(), 1.0);
        assert_eq!(pick(&camera, viewport * 0.5, viewport, &frame), Some(2));
    }
}
