use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Orbit camera pose, projection and control parameters.
pub struct CameraOptions {
    /// Initial orbit center.
    pub orbit_center: [f32; 3],
    /// Initial orbit radius.
    pub orbit_radius: f32,
    /// Closest the camera may zoom to the center.
    pub min_radius: f32,
    /// Initial heading, degrees.
    pub yaw: f32,
    /// Initial elevation, degrees (-90 looks straight down).
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
    /// Degrees of orbit per pixel of drag.
    pub look_sensitivity: f32,
    /// World units of pan per pixel of drag.
    pub pan_sensitivity: f32,
    /// Radius change per wheel notch.
    pub zoom_sensitivity: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            orbit_center: [0.0; 3],
            orbit_radius: 50.0,
            min_radius: 2.0,
            yaw: 0.0,
            pitch: -90.0,
            fovy: 60.0,
            znear: 0.1,
            zfar: 2000.0,
            look_sensitivity: 0.4,
            pan_sensitivity: 0.08,
            zoom_sensitivity: 2.0,
        }
    }
}
