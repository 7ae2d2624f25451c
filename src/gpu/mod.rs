//! GPU resource management utilities.
//!
//! Provides wgpu device/surface initialization, growable instance buffers,
//! render targets, pipeline boilerplate and shader composition.

/// Growable per-instance vertex buffers.
pub mod dynamic_buffer;
/// Shared wgpu boilerplate for bind group layouts and screen-space pipelines.
pub mod pipeline_helpers;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Render-target textures and the shared depth format.
pub mod texture;
