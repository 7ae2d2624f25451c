//! Camera system for 3D scene viewing.
//!
//! An orbit camera driven by pointer input, and the GPU uniform every
//! camera-aware pass binds at group 0.

/// Orbit camera math: yaw/pitch/radius around a center point.
pub mod orbit;
/// Camera GPU uniform and bind group.
pub mod uniform;

pub use orbit::OrbitCamera;
pub use uniform::{CameraBinding, CameraUniform};
