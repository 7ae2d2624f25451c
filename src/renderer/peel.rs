//! Layer compositing for dual depth peeling.
//!
//! The accumulation target starts at `(0, 0, 0, 1)` and every layer is
//! blended *under* what is already there, front to back. Alpha tracks the
//! remaining transmittance, so the opaque image composited last with the
//! same blend ends up weighted by whatever light still gets through.

use crate::error::ViewerError;
use crate::gpu::pipeline_helpers::create_screen_space_pipeline;
use crate::gpu::shader_composer::{Shader, ShaderComposer};

use super::pipeline_util::BLEND_FORMAT;
use super::targets::TargetLayouts;

/// `dst.rgb += dst.a * src.rgb`, `dst.a *= 1 - src.a` (premultiplied source).
pub const UNDER_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::DstAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Clear value of the accumulation target: nothing gathered, fully
/// transmissive.
pub const ACCUM_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// Plain layer composite: one texture, blended under the accumulation.
pub struct CompositePass {
    pipeline: wgpu::RenderPipeline,
}

impl CompositePass {
    /// Build the under-blended composite pipeline.
    ///
    /// # Errors
    ///
    /// Returns the composer error if `screen/composite.wgsl` fails to compose or
    /// validate.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        layouts: &TargetLayouts,
    ) -> Result<Self, ViewerError> {
        let shader = composer.compose(device, Shader::Composite)?;
        let pipeline = create_screen_space_pipeline(
            device,
            "Layer Composite",
            &shader,
            "fs_main",
            BLEND_FORMAT,
            Some(UNDER_BLEND),
            &[&layouts.single_texture],
        );
        Ok(Self { pipeline })
    }

    /// Blend `source` under the attachment of `rp`.
    pub fn draw<'a>(&'a self, rp: &mut wgpu::RenderPass<'a>, source: &'a wgpu::BindGroup) {
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, source, &[]);
        rp.draw(0..3, 0..1);
    }
}

/// Layer composite that also marches the field through the slab between
/// consecutive peel depths.
pub struct VolumeCompositePass {
    layer: wgpu::RenderPipeline,
    last: wgpu::RenderPipeline,
}

impl VolumeCompositePass {
    /// Build the `fs_layer` and `fs_final` pipelines.
    ///
    /// # Errors
    ///
    /// Returns the composer error if `screen/composite_volume.wgsl` fails to compose or
    /// validate.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        camera_layout: &wgpu::BindGroupLayout,
        layouts: &TargetLayouts,
        volume_layout: &wgpu::BindGroupLayout,
    ) -> Result<Self, ViewerError> {
        let shader = composer.compose(device, Shader::CompositeVolume)?;
        let bind_group_layouts = [camera_layout, &layouts.volume_input, volume_layout];
        let layer = create_screen_space_pipeline(
            device,
            "Volume Layer Composite",
            &shader,
            "fs_layer",
            BLEND_FORMAT,
            Some(UNDER_BLEND),
            &bind_group_layouts,
        );
        let last = create_screen_space_pipeline(
            device,
            "Volume Final Composite",
            &shader,
            "fs_final",
            BLEND_FORMAT,
            Some(UNDER_BLEND),
            &bind_group_layouts,
        );
        Ok(Self { layer, last })
    }

    /// `last` selects the variant that also marches from the final peel
    /// depth to the opaque surface.
    pub fn draw<'a>(
        &'a self,
        rp: &mut wgpu::RenderPass<'a>,
        camera: &'a wgpu::BindGroup,
        input: &'a wgpu::BindGroup,
        volume: &'a wgpu::BindGroup,
        last: bool,
    ) {
        rp.set_pipeline(if last { &self.last } else { &self.layer });
        rp.set_bind_group(0, camera, &[]);
        rp.set_bind_group(1, input, &[]);
        rp.set_bind_group(2, volume, &[]);
        rp.draw(0..3, 0..1);
    }
}
