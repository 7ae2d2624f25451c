//! Per-tick rendering.
//!
//! One command buffer per tick:
//!
//! 1. **Opaque**: background, ground grid and instanced capsules into an
//!    RGBA8 target with its own depth buffer.
//! 2. **Peel layers**: for each of `layer_count` layers, the overlay spheres
//!    are drawn against a copy of the opaque depth, discarding fragments at
//!    or in front of the previous layer's depth. The nearest surviving
//!    layer is blended *under* the accumulation target; when a field is
//!    resident the composite also marches the field through the slab
//!    between the two peel depths.
//! 3. **Opaque under**: the opaque image is blended under the
//!    accumulation, weighted by the remaining transmittance.
//! 4. **Present**: the accumulation is copied onto the surface.
//!
//! Every stage is built independently. A stage whose shader fails to build
//! is reported to the message log and skipped, the rest of the tick still
//! renders.

pub mod opaque;
pub mod peel;
pub(crate) mod pipeline_util;
pub mod present;
pub mod shapes;
pub mod targets;
pub mod volume;

use wgpu::util::DeviceExt;

use crate::camera::CameraBinding;
use crate::error::ViewerError;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::model::MeshSet;
use crate::scene::{MessageLog, SceneState};

use opaque::{CellPass, GridPass};
use peel::{CompositePass, VolumeCompositePass, ACCUM_CLEAR};
use present::PresentPass;
use shapes::{PeelParams, ShapePass};
use targets::{peel_layers, PeelTargets, TargetLayouts, PEEL_DEPTH_SEEDS};
use volume::VolumeResources;

const SHADER_ERROR_TITLE: &str = "Shader Error";

/// Keep a built stage, or report why it is missing.
fn stage<T>(name: &str, built: Result<T, ViewerError>, log: &mut MessageLog) -> Option<T> {
    match built {
        Ok(stage) => Some(stage),
        Err(e) => {
            log::error!("{name} disabled: {e}");
            log.report(SHADER_ERROR_TITLE, &format!("{name}: {e}"));
            None
        }
    }
}

/// Owns every GPU resource the viewer draws with.
pub struct Renderer {
    camera: CameraBinding,
    layouts: TargetLayouts,
    targets: PeelTargets,
    peel_params: wgpu::Buffer,
    depth_bias: f32,

    cells: Option<CellPass>,
    grid: Option<GridPass>,
    shapes: Option<ShapePass>,
    composite: Option<CompositePass>,
    volume_composite: Option<VolumeCompositePass>,
    present: Option<PresentPass>,
    volume: VolumeResources,

    frame_version: Option<u64>,
    shapes_version: Option<u64>,
    field_density: f32,
}

impl Renderer {
    /// Build targets and pipelines for `context`. Shader failures are
    /// written to `log`; the affected stages stay disabled.
    pub fn new(context: &RenderContext, meshes: &MeshSet, log: &mut MessageLog) -> Self {
        let device = &context.device;
        let camera = CameraBinding::new(device);
        let layouts = TargetLayouts::new(device);
        let depth_bias = 0.0;
        let peel_params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Peel Params"),
            contents: bytemuck::bytes_of(&PeelParams {
                depth_bias,
                _pad: [0.0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let targets = PeelTargets::new(device, context.size(), &layouts, &peel_params);
        let volume = VolumeResources::new(device);

        let mut renderer = Self {
            camera,
            layouts,
            targets,
            peel_params,
            depth_bias,
            cells: None,
            grid: None,
            shapes: None,
            composite: None,
            volume_composite: None,
            present: None,
            volume,
            frame_version: None,
            shapes_version: None,
            field_density: 0.0,
        };

        let mut composer = match ShaderComposer::new() {
            Ok(composer) => composer,
            Err(e) => {
                let _ = stage::<()>("Shader modules", Err(e), log);
                return renderer;
            }
        };
        let camera_layout = &renderer.camera.layout;
        let layouts = &renderer.layouts;
        renderer.cells = stage(
            "Cell pass",
            CellPass::new(device, &mut composer, camera_layout, &meshes.capsule),
            log,
        );
        renderer.grid = stage("Grid pass", GridPass::new(device, &mut composer, camera_layout), log);
        renderer.shapes = stage(
            "Shape pass",
            ShapePass::new(device, &mut composer, camera_layout, &layouts.peel_input, &meshes.sphere),
            log,
        );
        renderer.composite = stage(
            "Layer composite",
            CompositePass::new(device, &mut composer, layouts),
            log,
        );
        renderer.volume_composite = stage(
            "Volume composite",
            VolumeCompositePass::new(
                device,
                &mut composer,
                camera_layout,
                layouts,
                &renderer.volume.layout,
            ),
            log,
        );
        renderer.present = stage(
            "Present",
            PresentPass::new(device, &mut composer, layouts, context.format()),
            log,
        );
        renderer
    }

    /// Recreate the size-dependent targets after a surface resize.
    pub fn resize(&mut self, context: &RenderContext) {
        self.targets = PeelTargets::new(
            &context.device,
            context.size(),
            &self.layouts,
            &self.peel_params,
        );
    }

    /// Push everything that changed in `scene` since the last tick.
    pub fn prepare(&mut self, context: &RenderContext, scene: &SceneState) {
        let device = &context.device;
        let queue = &context.queue;
        let render = &scene.render;

        let uniform = &mut self.camera.uniform;
        uniform.update_view_proj(&scene.camera);
        uniform.selected_index = scene.selection.shader_index();
        uniform.screen_size = [self.targets.size.0 as f32, self.targets.size.1 as f32];
        uniform.thin_outlines = u32::from(render.thin_outlines);
        self.camera.update_gpu(queue);

        self.volume.set_linear_filter(device, render.field_linear_filter);
        if self.frame_version != Some(scene.frame_version) {
            if let Some(cells) = &mut self.cells {
                cells.upload(device, queue, &scene.frame.cells);
            }
            self.volume
                .upload(device, queue, scene.frame.field.as_ref(), render.field_density);
            self.frame_version = Some(scene.frame_version);
            self.field_density = render.field_density;
        } else if self.field_density.to_bits() != render.field_density.to_bits() {
            if let Some(field) = &scene.frame.field {
                self.volume.write_params(queue, field, render.field_density);
            }
            self.field_density = render.field_density;
        }

        if self.shapes_version != Some(scene.shapes_version) {
            if let Some(shapes) = &mut self.shapes {
                shapes.upload(device, queue, &scene.shapes);
            }
            self.shapes_version = Some(scene.shapes_version);
        }

        if self.depth_bias.to_bits() != render.depth_compare_bias.to_bits() {
            self.depth_bias = render.depth_compare_bias;
            queue.write_buffer(
                &self.peel_params,
                0,
                bytemuck::bytes_of(&PeelParams {
                    depth_bias: self.depth_bias,
                    _pad: [0.0; 3],
                }),
            );
        }
    }

    /// Prepare, record and present one tick.
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] if the swapchain frame cannot be
    /// acquired.
    pub fn render(
        &mut self,
        context: &RenderContext,
        scene: &SceneState,
    ) -> Result<(), wgpu::SurfaceError> {
        self.prepare(context, scene);

        let frame = context.get_next_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = context.create_encoder();
        self.encode_opaque(&mut encoder, scene);
        clear_pass(&mut encoder, "Accumulation Clear", &self.targets.accum.view, ACCUM_CLEAR);
        if scene.render.depth_peeling {
            self.encode_peel_layers(&mut encoder, scene);
        }
        if let Some(composite) = &self.composite {
            let mut rp = load_pass(&mut encoder, "Opaque Under", &self.targets.accum.view);
            composite.draw(&mut rp, &self.targets.opaque_color_source);
        }
        self.encode_present(&mut encoder, &view);
        context.submit(encoder);

        frame.present();
        Ok(())
    }

    fn encode_opaque(&self, encoder: &mut wgpu::CommandEncoder, scene: &SceneState) {
        let [r, g, b, a] = scene.render.background.map(f64::from);
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Opaque Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets.opaque_color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.opaque_depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        if scene.render.grid_enabled {
            if let Some(grid) = &self.grid {
                grid.draw(&mut rp, &self.camera.bind_group);
            }
        }
        if let Some(cells) = &self.cells {
            cells.draw(&mut rp, &self.camera.bind_group);
        }
    }

    fn encode_peel_layers(&self, encoder: &mut wgpu::CommandEncoder, scene: &SceneState) {
        let targets = &self.targets;
        let volume = match (&self.volume_composite, self.volume.bind_group()) {
            (Some(pass), Some(field)) if scene.render.field_enabled => Some((pass, field)),
            _ => None,
        };
        if volume.is_none() && self.composite.is_none() {
            return;
        }

        for (slot, depth) in PEEL_DEPTH_SEEDS.into_iter().enumerate() {
            depth_clear_pass(encoder, "Peel Depth Seed", &targets.depth[slot].view, depth);
        }

        let extent = targets.peel_depth.extent();
        for layer in peel_layers(scene.render.peel_layers()) {
            encoder.copy_texture_to_texture(
                targets.opaque_depth.texture.as_image_copy(),
                targets.peel_depth.texture.as_image_copy(),
                extent,
            );
            {
                let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Shape Peel Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &targets.peel_color.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &targets.peel_depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                if let Some(shapes) = &self.shapes {
                    shapes.draw(
                        &mut rp,
                        &self.camera.bind_group,
                        &targets.peel_inputs[layer.current],
                        layer.last,
                    );
                }
            }
            {
                let mut rp = load_pass(encoder, "Layer Composite", &targets.accum.view);
                match (volume, &self.composite) {
                    (Some((pass, field)), _) => pass.draw(
                        &mut rp,
                        &self.camera.bind_group,
                        &targets.volume_inputs[layer.current],
                        field,
                        layer.last,
                    ),
                    (None, Some(composite)) => composite.draw(&mut rp, &targets.peel_color_source),
                    (None, None) => {}
                }
            }
            encoder.copy_texture_to_texture(
                targets.peel_depth.texture.as_image_copy(),
                targets.depth[layer.current].texture.as_image_copy(),
                extent,
            );
        }
    }

    fn encode_present(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Present Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        // Without the composite stage the accumulation never sees the
        // opaque image, so show that directly.
        let source = if self.composite.is_some() {
            &self.targets.accum_source
        } else {
            &self.targets.opaque_color_source
        };
        if let Some(present) = &self.present {
            present.draw(&mut rp, source);
        }
    }
}

/// Color pass that only clears `view`.
fn clear_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    color: wgpu::Color,
) {
    let _ = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(color),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
}

/// Depth-only pass that only clears `view` to `depth`.
fn depth_clear_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    depth: f32,
) {
    let _ = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(depth),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });
}

/// Color pass that keeps the contents of `view`.
fn load_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_stage_is_reported_and_skipped() {
        let mut log = MessageLog::default();
        let built: Option<()> = stage(
            "Cell pass",
            Err(ViewerError::ShaderBuild {
                label: "cell".into(),
                message: "unknown identifier".into(),
            }),
            &mut log,
        );
        assert!(built.is_none());
        assert!(log.open);
        assert_eq!(log.title, SHADER_ERROR_TITLE);
        assert!(log.text.contains("Cell pass"));
        assert!(log.text.contains("unknown identifier"));

        assert_eq!(stage("Grid pass", Ok(7), &mut log), Some(7));
    }
}
