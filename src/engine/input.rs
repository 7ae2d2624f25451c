//! Command dispatch for [`ViewerEngine`].

use glam::Vec2;

use super::command::ViewerCommand;
use super::ViewerEngine;
use crate::input::InputEvent;
use crate::picking;
use crate::scene::SceneState;
use crate::session::FrameSession;

impl ViewerEngine {
    /// Feed a raw input event through the input processor and execute the
    /// resulting command, if any.
    pub fn handle_input(&mut self, event: InputEvent) {
        if let Some(cmd) = self.input.handle_event(event) {
            self.execute(cmd);
        }
    }

    /// Execute the command bound to a physical key string, if any.
    ///
    /// Returns `true` if the key was bound.
    pub fn handle_key(&mut self, key: &str) -> bool {
        match self.input.handle_key_press(key) {
            Some(cmd) => {
                self.execute(cmd);
                true
            }
            None => false,
        }
    }

    /// Execute one user-level command.
    pub fn execute(&mut self, cmd: ViewerCommand) {
        let (w, h) = self.context.size();
        let viewport = Vec2::new(w as f32, h as f32);
        apply_command(&mut self.scene, &mut self.session, viewport, cmd);
    }
}

/// Apply `cmd` to the scene, issuing whatever fetches it implies.
pub(crate) fn apply_command(
    scene: &mut SceneState,
    session: &mut FrameSession,
    viewport: Vec2,
    cmd: ViewerCommand,
) {
    match cmd {
        ViewerCommand::RotateCamera { .. }
        | ViewerCommand::PanCamera { .. }
        | ViewerCommand::Zoom { .. }
            if !scene.camera_input_enabled() => {}
        ViewerCommand::RotateCamera { delta } => scene.camera.rotate(delta),
        ViewerCommand::PanCamera { delta } => scene.camera.pan(delta),
        ViewerCommand::Zoom { delta } => scene.camera.zoom(delta),

        ViewerCommand::Pick { position } => {
            let hit = picking::pick(&scene.camera, position, viewport, &scene.frame);
            scene.selection.select(hit, &scene.frame);
            match hit {
                Some(id) => {
                    log::info!("selected cell {id}");
                    session.request_cell_info(scene);
                }
                None => log::debug!("pick at {position} hit nothing"),
            }
        }
        ViewerCommand::ClearSelection => scene.selection.clear(),

        ViewerCommand::PreviousFrame => {
            let target = scene.requested_frame.saturating_sub(1);
            step_timeline(scene, session, target);
        }
        ViewerCommand::NextFrame => {
            let target = scene.requested_frame.saturating_add(1);
            step_timeline(scene, session, target);
        }
        ViewerCommand::FirstFrame => step_timeline(scene, session, 0),
        ViewerCommand::LastFrame => step_timeline(scene, session, u32::MAX),
        ViewerCommand::ToggleAlwaysLatest => {
            scene.always_show_latest = !scene.always_show_latest;
            if scene.always_show_latest {
                step_timeline(scene, session, u32::MAX);
            }
        }

        ViewerCommand::Reload => session.reload(scene),
        ViewerCommand::StopSimulation => session.stop(scene),

        ViewerCommand::ToggleThinOutlines => {
            scene.render.thin_outlines = !scene.render.thin_outlines;
        }
        ViewerCommand::ToggleField => {
            scene.render.field_enabled = !scene.render.field_enabled;
        }
        ViewerCommand::ToggleDepthPeeling => {
            scene.render.depth_peeling = !scene.render.depth_peeling;
        }
        ViewerCommand::MoreLayers => scene.render.adjust_layers(1),
        ViewerCommand::FewerLayers => scene.render.adjust_layers(-1),

        ViewerCommand::CloseMessageLog => scene.message_log.close(false),
    }
}

/// Request `target`, clamped to the produced frames. No-op before the
/// first frame exists or when the timeline would not move.
fn step_timeline(scene: &mut SceneState, session: &mut FrameSession, target: u32) {
    let Some(last) = scene.last_frame() else {
        return;
    };
    let index = target.min(last);
    if scene.frame_index == Some(index) && scene.requested_frame == index {
        return;
    }
    session.request_frame(index, scene);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{Map, Value};

    use super::*;
    use crate::error::ViewerError;
    use crate::frame::ShapeOverlay;
    use crate::options::Options;
    use crate::session::FrameSource;

    /// Records frame requests; every fetch fails.
    #[derive(Default)]
    struct RecordingSource {
        frames: Mutex<Vec<u32>>,
    }

    impl FrameSource for RecordingSource {
        fn fetch_frame(&self, _uuid: &str, index: u32) -> Result<Vec<u8>, ViewerError> {
            if let Ok(mut frames) = self.frames.lock() {
                frames.push(index);
            }
            Err(ViewerError::Network("offline".into()))
        }

        fn fetch_shapes(&self, _uuid: &str) -> Result<Vec<ShapeOverlay>, ViewerError> {
            Err(ViewerError::Network("offline".into()))
        }

        fn fetch_cell_info(
            &self,
            _uuid: &str,
            _cell_id: u64,
            _frame_index: u32,
        ) -> Result<Map<String, Value>, ViewerError> {
            Err(ViewerError::Network("offline".into()))
        }

        fn stop_simulation(&self, _uuid: &str) -> Result<(), ViewerError> {
            Ok(())
        }
    }

    fn setup(frame_count: u32) -> (SceneState, FrameSession) {
        let mut scene = SceneState::new(&Options::default(), 1.0);
        scene.sim.uuid = Some("sim-1".into());
        scene.sim.frame_count = frame_count;
        let session =
            FrameSession::with_parts(Arc::new(RecordingSource::default()), None, "sim-1");
        (scene, session)
    }

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn timeline_steps_are_clamped() {
        let (mut scene, mut session) = setup(3);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::PreviousFrame);
        assert_eq!(scene.requested_frame, 0);

        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::NextFrame);
        assert_eq!(scene.requested_frame, 1);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::LastFrame);
        assert_eq!(scene.requested_frame, 2);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::NextFrame);
        assert_eq!(scene.requested_frame, 2);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::FirstFrame);
        assert_eq!(scene.requested_frame, 0);
    }

    #[test]
    fn timeline_is_inert_without_frames() {
        let (mut scene, mut session) = setup(0);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::NextFrame);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::LastFrame);
        assert_eq!(scene.requested_frame, 0);
    }

    #[test]
    fn following_latest_jumps_to_the_end() {
        let (mut scene, mut session) = setup(8);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::ToggleAlwaysLatest);
        assert!(scene.always_show_latest);
        assert_eq!(scene.requested_frame, 7);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::ToggleAlwaysLatest);
        assert!(!scene.always_show_latest);
    }

    #[test]
    fn camera_is_frozen_while_the_log_is_open() {
        let (mut scene, mut session) = setup(1);
        scene.message_log.open_with("Error Log", "boom");
        let radius = scene.camera.orbit_radius;
        let yaw = scene.camera.yaw;
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::Zoom { delta: 1.0 });
        apply_command(
            &mut scene,
            &mut session,
            VIEWPORT,
            ViewerCommand::RotateCamera {
                delta: Vec2::new(10.0, 0.0),
            },
        );
        assert_eq!(scene.camera.orbit_radius, radius);
        assert_eq!(scene.camera.yaw, yaw);

        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::CloseMessageLog);
        assert!(!scene.message_log.open);
        assert_eq!(scene.message_log.text, "boom");
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::Zoom { delta: 1.0 });
        assert!(scene.camera.orbit_radius < radius);
    }

    #[test]
    fn render_toggles_and_layer_bounds() {
        let (mut scene, mut session) = setup(1);
        let thin = scene.render.thin_outlines;
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::ToggleThinOutlines);
        assert_eq!(scene.render.thin_outlines, !thin);

        scene.render.layer_count = 64;
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::MoreLayers);
        assert_eq!(scene.render.layer_count, 64);
        scene.render.layer_count = 1;
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::FewerLayers);
        assert_eq!(scene.render.layer_count, 1);
        apply_command(&mut scene, &mut session, VIEWPORT, ViewerCommand::MoreLayers);
        assert_eq!(scene.render.layer_count, 2);
    }

    #[test]
    fn picking_empty_space_clears_the_selection() {
        let (mut scene, mut session) = setup(1);
        scene.selection.identifier = Some(42);
        apply_command(
            &mut scene,
            &mut session,
            VIEWPORT,
            ViewerCommand::Pick {
                position: VIEWPORT * 0.5,
            },
        );
        assert_eq!(scene.selection.identifier, None);
    }
}
