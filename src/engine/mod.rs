//! The per-window viewer engine.

pub mod command;
mod input;

use crate::error::ViewerError;
use crate::gpu::render_context::RenderContext;
use crate::input::InputProcessor;
use crate::model::MeshSet;
use crate::options::Options;
use crate::renderer::Renderer;
use crate::scene::SceneState;
use crate::session::FrameSession;

/// Ties the scene, the network session and the renderer together.
///
/// # Construction
///
/// Create a [`RenderContext`] for the window, then call
/// [`ViewerEngine::new`] with the simulation id to subscribe to.
///
/// # Frame loop
///
/// Each tick, call [`update`](Self::update) to apply whatever the network
/// delivered, then [`render`](Self::render) to draw and present. Call
/// [`resize`](Self::resize) when the window size changes. Input is
/// forwarded via [`handle_input`](Self::handle_input) and
/// [`handle_key`](Self::handle_key), or as commands via
/// [`execute`](Self::execute).
pub struct ViewerEngine {
    /// Core wgpu device, queue, and surface.
    pub context: RenderContext,
    scene: SceneState,
    session: FrameSession,
    renderer: Renderer,
    input: InputProcessor,
}

impl ViewerEngine {
    /// Build the engine and open the event stream for `uuid`.
    ///
    /// Shader failures do not fail construction; they land in the message
    /// log and disable the affected pass.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Model`] if a configured mesh cannot be
    /// loaded and [`ViewerError::ThreadSpawn`] if the stream thread cannot
    /// start.
    pub fn new(context: RenderContext, options: &Options, uuid: &str) -> Result<Self, ViewerError> {
        let meshes = MeshSet::load(&options.models)?;
        let session = FrameSession::connect(&options.connection, uuid)?;
        Ok(Self::with_session(context, options, &meshes, session))
    }

    /// Build the engine around an already constructed session.
    #[must_use]
    pub fn with_session(
        context: RenderContext,
        options: &Options,
        meshes: &MeshSet,
        session: FrameSession,
    ) -> Self {
        let (width, height) = context.size();
        let mut scene = SceneState::new(options, width as f32 / height.max(1) as f32);
        let renderer = Renderer::new(&context, meshes, &mut scene.message_log);
        log::info!(
            "viewer ready: {}x{} surface, {:?}",
            width,
            height,
            context.format()
        );
        Self {
            context,
            scene,
            session,
            renderer,
            input: InputProcessor::with_key_bindings(options.keybindings.clone()),
        }
    }

    /// Read-only view of the scene.
    #[must_use]
    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Mutable access to the scene, e.g. for live render settings.
    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    /// Apply stream events and finished fetches. Never blocks.
    pub fn update(&mut self) {
        self.session.poll(&mut self.scene);
    }

    /// Draw and present one tick.
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] if the swapchain frame cannot be
    /// acquired.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.renderer.render(&self.context, &self.scene)
    }

    /// Resize the surface, the camera projection and every size-dependent
    /// target.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.context.resize(width, height) {
            self.scene.camera.resize(width, height);
            self.renderer.resize(&self.context);
        }
    }

    /// Re-apply the surface configuration after it was lost or outdated.
    pub fn reconfigure(&self) {
        self.context.reconfigure();
    }

    /// Window title for the current state.
    #[must_use]
    pub fn title(&self) -> String {
        self.scene.status_line()
    }
}
