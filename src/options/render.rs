use serde::{Deserialize, Serialize};

/// Smallest allowed number of peeled transparency layers.
pub const MIN_PEEL_LAYERS: u32 = 1;
/// Largest allowed number of peeled transparency layers.
pub const MAX_PEEL_LAYERS: u32 = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Transparency, field and styling parameters.
pub struct RenderOptions {
    /// Run the depth-peeled transparency pass at all.
    pub depth_peeling: bool,
    /// Peeled layers per tick; clamped to `[1, 64]` on use.
    pub layer_count: u32,
    /// Depth slack when rejecting fragments at or in front of the
    /// previous layer.
    pub depth_compare_bias: f32,
    /// Draw thin cell outlines instead of regular ones.
    pub thin_outlines: bool,
    /// Composite the volumetric signal field when a frame carries one.
    pub field_enabled: bool,
    /// Opacity multiplier applied while marching the field.
    pub field_density: f32,
    /// Trilinear field sampling instead of nearest.
    pub field_linear_filter: bool,
    /// Draw the ground grid.
    pub grid_enabled: bool,
    /// Opaque pass clear color.
    pub background: [f32; 4],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            depth_peeling: true,
            layer_count: 5,
            depth_compare_bias: 1e-6,
            thin_outlines: false,
            field_enabled: true,
            field_density: 1.0,
            field_linear_filter: false,
            grid_enabled: true,
            background: [0.7, 0.7, 0.7, 1.0],
        }
    }
}

impl RenderOptions {
    /// Layer count clamped to the supported range.
    #[must_use]
    pub fn peel_layers(&self) -> u32 {
        self.layer_count.clamp(MIN_PEEL_LAYERS, MAX_PEEL_LAYERS)
    }

    /// Step the layer count by `delta`, staying in range.
    pub fn adjust_layers(&mut self, delta: i32) {
        let next = self.peel_layers() as i32 + delta;
        self.layer_count =
            next.clamp(MIN_PEEL_LAYERS as i32, MAX_PEEL_LAYERS as i32) as u32;
    }
}
