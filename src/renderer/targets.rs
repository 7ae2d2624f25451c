//! Intermediate attachments and the bind groups that read them.
//!
//! Everything here depends on the surface size, so the whole set is built
//! in one go and swapped in on resize; the old set is dropped with it.

use super::pipeline_util::{BLEND_FORMAT, OPAQUE_FORMAT};
use crate::gpu::pipeline_helpers::{depth_texture_2d, texture_2d_unfilterable, uniform_buffer};
use crate::gpu::texture::RenderTarget;

/// Depth each ping-pong target is cleared to before the first layer.
/// Layer 0 peels against slot 1, i.e. against the near plane.
pub const PEEL_DEPTH_SEEDS: [f32; 2] = [1.0, 0.0];

/// Depth slots and variant for one peel layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeelLayer {
    /// Layer index, front to back.
    pub index: u32,
    /// Slot this layer's depth is stored into.
    pub current: usize,
    /// Slot holding the previous layer's depth, which this layer peels
    /// against.
    pub previous: usize,
    /// Final layer of the budget.
    pub last: bool,
}

impl PeelLayer {
    fn new(index: u32, count: u32) -> Self {
        let current = (index % 2) as usize;
        Self {
            index,
            current,
            previous: 1 - current,
            last: index + 1 == count,
        }
    }
}

/// The `count` layers in draw order.
pub fn peel_layers(count: u32) -> impl Iterator<Item = PeelLayer> {
    (0..count).map(move |index| PeelLayer::new(index, count))
}

/// Bind group layouts for reading the attachments; created once.
pub struct TargetLayouts {
    /// One unfilterable color texture at binding 0.
    pub single_texture: wgpu::BindGroupLayout,
    /// Previous peel depth plus the peel parameters uniform.
    pub peel_input: wgpu::BindGroupLayout,
    /// Peel color, peel depth, previous depth, opaque depth.
    pub volume_input: wgpu::BindGroupLayout,
}

impl TargetLayouts {
    /// Create the layouts.
    pub fn new(device: &wgpu::Device) -> Self {
        let single_texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Single Texture Layout"),
            entries: &[texture_2d_unfilterable(0)],
        });
        let peel_input = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Peel Input Layout"),
            entries: &[depth_texture_2d(0), uniform_buffer(1)],
        });
        let volume_input = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Volume Composite Input Layout"),
            entries: &[
                texture_2d_unfilterable(0),
                depth_texture_2d(1),
                depth_texture_2d(2),
                depth_texture_2d(3),
            ],
        });
        Self {
            single_texture,
            peel_input,
            volume_input,
        }
    }
}

/// Attachments for one surface size.
///
/// `depth[0]` / `depth[1]` are the ping-ponged peel depths, assigned per
/// layer by [`peel_layers`]. The per-layer bind groups are indexed by
/// [`PeelLayer::current`].
pub struct PeelTargets {
    /// Size every attachment was built for.
    pub size: (u32, u32),
    /// Opaque pass color.
    pub opaque_color: RenderTarget,
    /// Opaque pass depth, copied into `peel_depth` before each layer.
    pub opaque_depth: RenderTarget,
    /// Color of the layer being peeled.
    pub peel_color: RenderTarget,
    /// Depth of the layer being peeled.
    pub peel_depth: RenderTarget,
    /// Ping-ponged depths of finished layers.
    pub depth: [RenderTarget; 2],
    /// Front-to-back accumulation.
    pub accum: RenderTarget,

    /// Shape pass group 1, by current slot.
    pub peel_inputs: [wgpu::BindGroup; 2],
    /// Volume composite group 1, by current slot.
    pub volume_inputs: [wgpu::BindGroup; 2],
    /// Composite source: the current peel layer.
    pub peel_color_source: wgpu::BindGroup,
    /// Composite source: the opaque image.
    pub opaque_color_source: wgpu::BindGroup,
    /// Present source: the accumulation target.
    pub accum_source: wgpu::BindGroup,
}

impl PeelTargets {
    /// Build every attachment at `size` (clamped to at least 1x1).
    pub fn new(
        device: &wgpu::Device,
        size: (u32, u32),
        layouts: &TargetLayouts,
        peel_params: &wgpu::Buffer,
    ) -> Self {
        let size = (size.0.max(1), size.1.max(1));
        let opaque_color = RenderTarget::new(
            device,
            "Opaque Color",
            size,
            OPAQUE_FORMAT,
            wgpu::TextureUsages::empty(),
        );
        let opaque_depth = RenderTarget::depth(device, "Opaque Depth", size);
        let peel_color = RenderTarget::new(
            device,
            "Peel Color",
            size,
            BLEND_FORMAT,
            wgpu::TextureUsages::empty(),
        );
        let peel_depth = RenderTarget::depth(device, "Peel Depth", size);
        let depth = [
            RenderTarget::depth(device, "Peel Depth 0", size),
            RenderTarget::depth(device, "Peel Depth 1", size),
        ];
        let accum = RenderTarget::new(
            device,
            "Accumulation",
            size,
            BLEND_FORMAT,
            wgpu::TextureUsages::empty(),
        );

        let texture_group = |label: &str, view: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layouts.single_texture,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                }],
            })
        };
        let peel_input = |slot: u32| {
            let layer = PeelLayer::new(slot, 2);
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Peel Input {slot}")),
                layout: &layouts.peel_input,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&depth[layer.previous].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: peel_params.as_entire_binding(),
                    },
                ],
            })
        };
        let volume_input = |slot: u32| {
            let layer = PeelLayer::new(slot, 2);
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Volume Composite Input {slot}")),
                layout: &layouts.volume_input,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&peel_color.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&peel_depth.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&depth[layer.previous].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&opaque_depth.view),
                    },
                ],
            })
        };

        let peel_inputs = [peel_input(0), peel_input(1)];
        let volume_inputs = [volume_input(0), volume_input(1)];
        let peel_color_source = texture_group("Peel Color Source", &peel_color.view);
        let opaque_color_source = texture_group("Opaque Color Source", &opaque_color.view);
        let accum_source = texture_group("Accumulation Source", &accum.view);

        Self {
            size,
            opaque_color,
            opaque_depth,
            peel_color,
            peel_depth,
            depth,
            accum,
            peel_inputs,
            volume_inputs,
            peel_color_source,
            opaque_color_source,
            accum_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_layer_peels_against_near_plane() {
        let first = peel_layers(5).next().unwrap();
        assert_eq!(PEEL_DEPTH_SEEDS[first.previous], 0.0);
        assert_eq!(PEEL_DEPTH_SEEDS[first.current], 1.0);
    }

    #[test]
    fn each_layer_reads_what_the_one_before_wrote() {
        let layers: Vec<_> = peel_layers(8).collect();
        for pair in layers.windows(2) {
            assert_eq!(pair[1].previous, pair[0].current);
        }
        for layer in &layers {
            assert_ne!(layer.current, layer.previous);
        }
    }

    #[test]
    fn only_the_final_layer_is_marked_last() {
        let last: Vec<_> = peel_layers(4).map(|l| l.last).collect();
        assert_eq!(last, [false, false, false, true]);
        assert!(peel_layers(1).all(|l| l.last));
        assert_eq!(peel_layers(0).count(), 0);
    }

    /// Per-pixel walk of the layer loop: copy opaque depth, keep the
    /// nearest fragment behind the previous slot, store it in the current
    /// slot.
    fn peel_pixel(fragments: &[f32], opaque: f32, bias: f32, count: u32) -> Vec<Option<f32>> {
        let mut slots = PEEL_DEPTH_SEEDS;
        peel_layers(count)
            .map(|layer| {
                let previous = slots[layer.previous];
                let nearest = fragments
                    .iter()
                    .copied()
                    .filter(|&z| z > previous + bias && z < opaque)
                    .min_by(f32::total_cmp);
                slots[layer.current] = nearest.unwrap_or(opaque);
                nearest
            })
            .collect()
    }

    #[test]
    fn ping_pong_peels_front_to_back() {
        let peeled = peel_pixel(&[0.7, 0.3, 0.5, 0.95], 0.9, 1e-6, 5);
        let expected: [Option<f32>; 5] = [Some(0.3), Some(0.5), Some(0.7), None, None];
        assert_eq!(peeled, expected);
    }

    #[test]
    fn layer_budget_stops_peeling() {
        let peeled = peel_pixel(&[0.1, 0.2, 0.3, 0.4], 1.0, 1e-6, 2);
        let expected: [Option<f32>; 2] = [Some(0.1), Some(0.2)];
        assert_eq!(peeled, expected);
    }
}
