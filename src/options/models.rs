use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Mesh sources. Empty paths select the built-in procedural meshes.
pub struct ModelOptions {
    /// Single-primitive glTF file for the cell capsule.
    pub capsule: Option<PathBuf>,
    /// Single-primitive glTF file for overlay spheres.
    pub sphere: Option<PathBuf>,
    /// Latitude bands of the procedural meshes.
    pub stacks: u32,
    /// Longitude segments of the procedural meshes.
    pub slices: u32,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            capsule: None,
            sphere: None,
            stacks: 16,
            slices: 24,
        }
    }
}
