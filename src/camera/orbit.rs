use glam::{Mat4, Quat, Vec2, Vec3};

use crate::options::CameraOptions;

/// Orbit camera: a yaw/pitch rotation around `orbit_center` at
/// `orbit_radius`.
///
/// Angles are in degrees. The camera sits at
/// `center + rotation * Z * radius` and looks down its local -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// Point the camera orbits around.
    pub orbit_center: Vec3,
    /// Distance from the center.
    pub orbit_radius: f32,
    /// Heading around world +Y, degrees.
    pub yaw: f32,
    /// Elevation around the camera's local X, degrees.
    pub pitch: f32,
    /// Vertical field of view, degrees.
    pub fovy: f32,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Near clipping plane.
    pub znear: f32,
    /// Far clipping plane.
    pub zfar: f32,
    min_radius: f32,
    look_sensitivity: f32,
    pan_sensitivity: f32,
    zoom_sensitivity: f32,
}

impl OrbitCamera {
    /// Camera at the configured initial pose.
    #[must_use]
    pub fn new(options: &CameraOptions, aspect: f32) -> Self {
        Self {
            orbit_center: Vec3::from_array(options.orbit_center),
            orbit_radius: options.orbit_radius.max(options.min_radius),
            yaw: options.yaw,
            pitch: options.pitch,
            fovy: options.fovy,
            aspect,
            znear: options.znear,
            zfar: options.zfar,
            min_radius: options.min_radius,
            look_sensitivity: options.look_sensitivity,
            pan_sensitivity: options.pan_sensitivity,
            zoom_sensitivity: options.zoom_sensitivity,
        }
    }

    /// Current rotation: yaw about world Y, then pitch about local X.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw.to_radians())
            * Quat::from_rotation_x(self.pitch.to_radians())
    }

    /// Eye position in world space.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.orbit_center + self.rotation() * Vec3::Z * self.orbit_radius
    }

    /// World → view transform.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation(), self.position())
            .inverse()
    }

    /// View → clip transform with a `[0, 1]` depth range.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        )
    }

    /// Combined projection * view.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Orbit by a pointer delta in pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        self.yaw = (self.yaw - self.look_sensitivity * delta.x) % 360.0;
        self.pitch = (self.pitch - self.look_sensitivity * delta.y) % 360.0;
    }

    /// Slide the orbit center along the camera's right/up axes.
    pub fn pan(&mut self, delta: Vec2) {
        let rot = self.rotation();
        let right = rot * Vec3::X;
        let up = rot * Vec3::Y;
        self.orbit_center += (up * delta.y - right * delta.x)
            * self.pan_sensitivity;
    }

    /// Change the orbit radius; positive `delta` (wheel notches) zooms in.
    pub fn zoom(&mut self, delta: f32) {
        self.orbit_radius = (self.orbit_radius
            - delta * self.zoom_sensitivity)
            .max(self.min_radius);
    }

    /// Update the aspect ratio for a new viewport size. Ignores zero sizes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraOptions::default(), 1.0)
    }

    #[test]
    fn default_pose_looks_straight_down() {
        let cam = camera();
        let pos = cam.position();
        assert!((pos - Vec3::new(0.0, 50.0, 0.0)).length() < 1e-3);

        // The orbit center lands in the middle of the view, in front of
        // the camera.
        let center = cam.view_matrix().transform_point3(Vec3::ZERO);
        assert!(center.x.abs() < 1e-3 && center.y.abs() < 1e-3);
        assert!((center.z + 50.0).abs() < 1e-3);
    }

    #[test]
    fn zoom_clamps_to_min_radius() {
        let mut cam = camera();
        cam.zoom(1000.0);
        assert_eq!(cam.orbit_radius, 2.0);
        cam.zoom(-1.0);
        assert!(cam.orbit_radius > 2.0);
    }

    #[test]
    fn rotate_wraps_angles() {
        let mut cam = camera();
        cam.rotate(Vec2::new(-1000.0, 0.0));
        assert!(cam.yaw.abs() < 360.0);
        assert!((cam.yaw - 40.0).abs() < 1e-3);
    }

    #[test]
    fn pan_moves_center_in_view_plane() {
        let mut cam = camera();
        let before = cam.position() - cam.orbit_center;
        cam.pan(Vec2::new(10.0, 0.0));
        let offset = cam.orbit_center;
        // Pure horizontal drag keeps the center in the ground plane when
        // looking straight down.
        assert!(offset.y.abs() < 1e-4);
        assert!(offset.length() > 0.0);
        let after = cam.position() - cam.orbit_center;
        assert!((before - after).length() < 1e-4);
    }
}
