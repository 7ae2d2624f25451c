//! The viewer's complete interactive vocabulary.
//!
//! Every user-facing operation, whether triggered by a key press, a mouse
//! gesture or a programmatic call, is represented as a `ViewerCommand`.
//! Consumers construct commands and pass them to
//! [`ViewerEngine::execute`](super::ViewerEngine::execute).

use glam::Vec2;

/// A single user-level operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerCommand {
    // ── Camera ──
    /// Orbit by a pointer delta in pixels.
    RotateCamera {
        /// Pointer movement since the last event.
        delta: Vec2,
    },
    /// Pan the orbit center by a pointer delta in pixels.
    PanCamera {
        /// Pointer movement since the last event.
        delta: Vec2,
    },
    /// Zoom by wheel notches (positive = closer).
    Zoom {
        /// Wheel notches.
        delta: f32,
    },

    // ── Selection ──
    /// Pick the cell under a pixel and select it (or clear on a miss).
    Pick {
        /// Pixel position, origin top-left.
        position: Vec2,
    },
    /// Drop the current selection.
    ClearSelection,

    // ── Timeline ──
    /// Request the previous frame.
    PreviousFrame,
    /// Request the next frame.
    NextFrame,
    /// Request frame 0.
    FirstFrame,
    /// Request the newest frame.
    LastFrame,
    /// Toggle following the newest frame.
    ToggleAlwaysLatest,

    // ── Simulation control ──
    /// Ask the server to reload the simulation.
    Reload,
    /// Ask the server to stop the simulation.
    StopSimulation,

    // ── Rendering ──
    /// Switch between thin and regular outlines.
    ToggleThinOutlines,
    /// Show or hide the volumetric field.
    ToggleField,
    /// Enable or disable the transparency pass.
    ToggleDepthPeeling,
    /// One more peel layer.
    MoreLayers,
    /// One fewer peel layer.
    FewerLayers,

    // ── Message log ──
    /// Hide the message log without clearing it.
    CloseMessageLog,
}
