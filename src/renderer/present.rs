//! Final copy of the accumulation target onto the surface.

use crate::error::ViewerError;
use crate::gpu::pipeline_helpers::create_screen_space_pipeline;
use crate::gpu::shader_composer::{Shader, ShaderComposer};

use super::targets::TargetLayouts;

/// Fragment entry for a surface of `format`.
#[must_use]
pub fn present_entry(format: wgpu::TextureFormat) -> &'static str {
    if format.is_srgb() {
        "fs_srgb"
    } else {
        "fs_main"
    }
}

/// Full-screen copy onto the swapchain texture.
pub struct PresentPass {
    pipeline: wgpu::RenderPipeline,
}

impl PresentPass {
    /// Build the present pipeline for `surface_format`.
    ///
    /// # Errors
    ///
    /// Returns the composer error if `screen/present.wgsl` fails to compose or
    /// validate.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        layouts: &TargetLayouts,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, ViewerError> {
        let shader = composer.compose(device, Shader::Present)?;
        let pipeline = create_screen_space_pipeline(
            device,
            "Present",
            &shader,
            present_entry(surface_format),
            surface_format,
            None,
            &[&layouts.single_texture],
        );
        Ok(Self { pipeline })
    }

    /// Copy `source` onto the attachment of `rp`.
    pub fn draw<'a>(&'a self, rp: &mut wgpu::RenderPass<'a>, source: &'a wgpu::BindGroup) {
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, source, &[]);
        rp.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_surfaces_get_the_decoding_entry() {
        assert_eq!(present_entry(wgpu::TextureFormat::Bgra8UnormSrgb), "fs_srgb");
        assert_eq!(present_entry(wgpu::TextureFormat::Bgra8Unorm), "fs_main");
    }
}
