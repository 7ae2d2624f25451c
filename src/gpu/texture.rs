//! Render-target textures.

/// Depth format shared by every depth attachment. `Depth32Float` supports
/// texture-to-texture copies, which depth peeling relies on.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A 2D render-target texture and its default view.
///
/// Always carries `RENDER_ATTACHMENT | TEXTURE_BINDING`; callers add
/// `COPY_SRC` / `COPY_DST` where the texture takes part in copies.
pub struct RenderTarget {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    /// Create a render target with the given dimensions and format.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        extra_usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | extra_usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Depth target that can be copied to and from.
    #[must_use]
    pub fn depth(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
    ) -> Self {
        Self::new(
            device,
            label,
            size,
            DEPTH_FORMAT,
            wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
        )
    }

    /// Texture extent, for whole-texture copies.
    #[must_use]
    pub fn extent(&self) -> wgpu::Extent3d {
        self.texture.size()
    }
}
