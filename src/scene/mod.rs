//! The single mutable store behind every displayed tick.
//!
//! [`SceneState`] is written by the session (frames, shapes, status, log)
//! and by user commands (camera, selection, render toggles), and read by
//! the renderer and the picker. The version counters let the renderer
//! upload only what changed.

mod selection;
mod status;

pub use selection::{format_property, SelectionState};
pub use status::{ConnectionStatus, MessageLog, SimInfo};

use crate::camera::OrbitCamera;
use crate::frame::{Frame, ShapeOverlay};
use crate::options::{Options, RenderOptions};

/// Everything the viewer currently knows.
pub struct SceneState {
    /// Most recently applied frame.
    pub frame: Frame,
    /// Bumped whenever `frame` is replaced.
    pub frame_version: u64,
    /// Index of the applied frame, `None` before the first one.
    pub frame_index: Option<u32>,
    /// Timeline position: the index most recently requested.
    pub requested_frame: u32,
    /// Static overlays.
    pub shapes: Vec<ShapeOverlay>,
    /// Bumped whenever `shapes` is replaced.
    pub shapes_version: u64,
    /// Selected cell.
    pub selection: SelectionState,
    /// Simulation header.
    pub sim: SimInfo,
    /// Connection / simulation status.
    pub status: ConnectionStatus,
    /// Server diagnostics panel.
    pub message_log: MessageLog,
    /// Orbit camera.
    pub camera: OrbitCamera,
    /// Live render settings.
    pub render: RenderOptions,
    /// Follow the newest frame as it is produced.
    pub always_show_latest: bool,
}

impl SceneState {
    /// Empty scene configured from `options`.
    #[must_use]
    pub fn new(options: &Options, aspect: f32) -> Self {
        Self {
            frame: Frame::default(),
            frame_version: 0,
            frame_index: None,
            requested_frame: 0,
            shapes: Vec::new(),
            shapes_version: 0,
            selection: SelectionState::default(),
            sim: SimInfo::default(),
            status: ConnectionStatus::default(),
            message_log: MessageLog::default(),
            camera: OrbitCamera::new(&options.camera, aspect),
            render: options.render.clone(),
            always_show_latest: options.connection.always_show_latest,
        }
    }

    /// Replace the displayed frame and re-resolve the selection against
    /// it.
    pub fn apply_frame(&mut self, frame: Frame, index: u32) {
        self.frame = frame;
        self.frame_index = Some(index);
        self.frame_version += 1;
        self.selection.resolve(&self.frame);
    }

    /// Replace the overlay list.
    pub fn set_shapes(&mut self, shapes: Vec<ShapeOverlay>) {
        self.shapes = shapes;
        self.shapes_version += 1;
    }

    /// Last valid timeline index, `None` with no frames.
    #[must_use]
    pub fn last_frame(&self) -> Option<u32> {
        self.sim.frame_count.checked_sub(1)
    }

    /// Whether pointer input should move the camera.
    #[must_use]
    pub fn camera_input_enabled(&self) -> bool {
        !self.message_log.open
    }

    /// One-line summary for a window title.
    #[must_use]
    pub fn status_line(&self) -> String {
        let name = if self.sim.name.is_empty() {
            "cellview"
        } else {
            self.sim.name.as_str()
        };
        let mut line = format!(
            "{name} | frame {} / {} | {} cells | {}",
            self.frame_index.map_or(0, |i| i + 1),
            self.sim.frame_count,
            self.frame.cell_count(),
            self.status
        );
        if let Some(id) = self.selection.identifier {
            line.push_str(&format!(" | cell {id}"));
        }
        if self.always_show_latest {
            line.push_str(" | following latest");
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CellInstance;

    fn frame(ids: &[u64]) -> Frame {
        Frame {
            cells: vec![CellInstance::default(); ids.len()],
            cell_ids: ids.to_vec(),
            field: None,
        }
    }

    #[test]
    fn apply_frame_bumps_version_and_resolves_selection() {
        let mut scene = SceneState::new(&Options::default(), 1.0);
        scene.selection.identifier = Some(5);
        scene.apply_frame(frame(&[3, 4, 5]), 7);
        assert_eq!(scene.frame_version, 1);
        assert_eq!(scene.frame_index, Some(7));
        assert_eq!(scene.selection.index, Some(2));
    }

    #[test]
    fn status_line_reports_frame_and_selection() {
        let mut scene = SceneState::new(&Options::default(), 1.0);
        scene.sim.name = "colony".into();
        scene.sim.frame_count = 10;
        scene.status = ConnectionStatus::Running;
        scene.apply_frame(frame(&[1, 2]), 3);
        scene.selection.identifier = Some(2);
        assert_eq!(
            scene.status_line(),
            "colony | frame 4 / 10 | 2 cells | Running | cell 2"
        );
    }

    #[test]
    fn message_log_blocks_camera_input() {
        let mut scene = SceneState::new(&Options::default(), 1.0);
        assert!(scene.camera_input_enabled());
        scene.message_log.open_with("Error Log", "boom");
        assert!(!scene.camera_input_enabled());
        scene.message_log.close(false);
        assert!(scene.camera_input_enabled());
        assert_eq!(scene.message_log.text, "boom");
    }
}
