//! Standalone viewer window backed by winit.
//!
//! ```no_run
//! # use cellview::Viewer;
//! Viewer::builder("2f6c1a3e-sim")
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    error::ViewerError, gpu::render_context::RenderContext, options::Options,
    InputEvent, MouseButton, ViewerEngine,
};

/// Pixels per wheel notch reported by precision touchpads.
const PIXELS_PER_NOTCH: f32 = 100.0;

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    uuid: String,
    options: Options,
    title: String,
}

impl ViewerBuilder {
    fn new(uuid: String) -> Self {
        Self {
            uuid,
            options: Options::default(),
            title: "cellview".into(),
        }
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Set the initial window title; it is replaced by the status line
    /// once the simulation header arrives.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            uuid: self.uuid,
            options: self.options,
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A standalone window following one simulation.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
pub struct Viewer {
    uuid: String,
    options: Options,
    title: String,
}

impl Viewer {
    /// Start a new builder for simulation `uuid`.
    #[must_use]
    pub fn builder(uuid: impl Into<String>) -> ViewerBuilder {
        ViewerBuilder::new(uuid.into())
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Viewer`] if the event loop cannot be created
    /// or exits abnormally.
    pub fn run(self) -> Result<(), ViewerError> {
        let event_loop =
            EventLoop::new().map_err(|e| ViewerError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            engine: None,
            uuid: self.uuid,
            options: self.options,
            title: self.title,
            shown_log: None,
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| ViewerError::Viewer(e.to_string()))
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

struct ViewerApp {
    window: Option<Arc<Window>>,
    engine: Option<ViewerEngine>,
    uuid: String,
    options: Options,
    title: String,
    /// Message log contents last written to the log output.
    shown_log: Option<(String, String)>,
}

/// Surface size for a window's inner size.
fn viewport_size(inner: winit::dpi::PhysicalSize<u32>) -> (u32, u32) {
    (inner.width.max(1), inner.height.max(1))
}

impl ViewerApp {
    /// Mirror the status line into the title bar and newly opened message
    /// log contents into the log output.
    fn sync_window(&mut self) {
        let (Some(window), Some(engine)) = (&self.window, &self.engine) else {
            return;
        };
        let title = engine.title();
        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }

        let log = &engine.scene().message_log;
        let current = log.open.then(|| (log.title.clone(), log.text.clone()));
        if current != self.shown_log {
            if let Some((title, text)) = &current {
                log::warn!("[{title}]\n{text}");
            }
            self.shown_log = current;
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());
        let attrs = if let Some(mon) = &monitor {
            let mon_size = mon.size();
            let scale = mon.scale_factor();
            let logical_w = (mon_size.width as f64 / scale * 0.75) as u32;
            let logical_h = (mon_size.height as f64 / scale * 0.75) as u32;
            Window::default_attributes()
                .with_title(&self.title)
                .with_inner_size(winit::dpi::LogicalSize::new(
                    logical_w, logical_h,
                ))
        } else {
            Window::default_attributes().with_title(&self.title)
        };

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let size = viewport_size(window.inner_size());
        let context =
            match pollster::block_on(RenderContext::new(window.clone(), size)) {
                Ok(context) => context,
                Err(e) => {
                    log::error!("Failed to initialize GPU: {e}");
                    event_loop.exit();
                    return;
                }
            };

        let engine = match ViewerEngine::new(context, &self.options, &self.uuid)
        {
            Ok(e) => e,
            Err(e) => {
                log::error!("Failed to initialize engine: {e}");
                event_loop.exit();
                return;
            }
        };

        window.request_redraw();
        self.window = Some(window);
        self.engine = Some(engine);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
            return;
        }

        // Guard: both window and engine must be initialised.
        if self.window.is_none() || self.engine.is_none() {
            return;
        }

        match event {
            WindowEvent::Resized(event_size) => {
                let (vp_w, vp_h) = viewport_size(event_size);
                if let Some(engine) = &mut self.engine {
                    engine.resize(vp_w, vp_h);
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let inner = self.window.as_ref().map(|w| w.inner_size());
                if let (Some(engine), Some(inner)) = (&mut self.engine, inner) {
                    let (vp_w, vp_h) = viewport_size(inner);
                    engine.resize(vp_w, vp_h);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(engine) = &mut self.engine {
                    engine.update();
                    match engine.render() {
                        Ok(()) => {}
                        Err(
                            wgpu::SurfaceError::Outdated
                            | wgpu::SurfaceError::Lost,
                        ) => engine.reconfigure(),
                        Err(e) => {
                            log::error!("render error: {e:?}");
                        }
                    }
                }
                self.sync_window();
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                if let Some(engine) = &mut self.engine {
                    engine.handle_input(InputEvent::MouseButton {
                        button: MouseButton::from(button),
                        pressed,
                    });
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if let Some(engine) = &mut self.engine {
                    engine.handle_input(InputEvent::CursorMoved {
                        x: position.x as f32,
                        y: position.y as f32,
                    });
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => {
                        pos.y as f32 / PIXELS_PER_NOTCH
                    }
                };
                if let Some(engine) = &mut self.engine {
                    engine.handle_input(InputEvent::Scroll { delta: notches });
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                use winit::keyboard::PhysicalKey;
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let key_str = format!("{code:?}");
                if let Some(engine) = &mut self.engine {
                    if !engine.handle_key(&key_str) {
                        log::debug!("unbound key {key_str}");
                    }
                }
            }

            _ => (),
        }
    }
}
