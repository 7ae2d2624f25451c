//! Converts raw platform events into engine commands.
//!
//! The `InputProcessor` owns all transient input state (cursor position,
//! held buttons, click-vs-drag detection) and the key-binding map. It is
//! the only thing that sits between raw window events and the engine's
//! [`execute`](crate::ViewerEngine::execute) method.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::event::{InputEvent, MouseButton};
use crate::engine::command::ViewerCommand;

/// Maximum cursor travel (pixels) between press and release that still
/// counts as a click.
const CLICK_SLOP: f32 = 3.0;

/// Maps physical key strings to [`ViewerCommand`] variants.
///
/// Key strings use the `winit::keyboard::KeyCode` debug format:
/// `"KeyR"`, `"ArrowLeft"`, `"Escape"`, etc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeyBindings {
    /// Forward map: key string → command tag.
    bindings: HashMap<String, KeyCommandTag>,
}

/// Serializable tag for the subset of [`ViewerCommand`] that can be
/// key-bound (discrete, parameterless actions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCommandTag {
    /// Step back one frame.
    PreviousFrame,
    /// Step forward one frame.
    NextFrame,
    /// Jump to the first frame.
    FirstFrame,
    /// Jump to the newest frame.
    LastFrame,
    /// Toggle following the newest frame.
    ToggleAlwaysLatest,
    /// Reload the simulation.
    Reload,
    /// Stop the simulation.
    StopSimulation,
    /// Thin / regular outlines.
    ToggleThinOutlines,
    /// Show / hide the volumetric field.
    ToggleField,
    /// Enable / disable transparency peeling.
    ToggleDepthPeeling,
    /// One more peel layer.
    MoreLayers,
    /// One fewer peel layer.
    FewerLayers,
    /// Hide the message log.
    CloseMessageLog,
    /// Drop the selection.
    ClearSelection,
}

impl KeyCommandTag {
    /// Convert to the corresponding parameterless [`ViewerCommand`].
    fn to_command(self) -> ViewerCommand {
        match self {
            Self::PreviousFrame => ViewerCommand::PreviousFrame,
            Self::NextFrame => ViewerCommand::NextFrame,
            Self::FirstFrame => ViewerCommand::FirstFrame,
            Self::LastFrame => ViewerCommand::LastFrame,
            Self::ToggleAlwaysLatest => ViewerCommand::ToggleAlwaysLatest,
            Self::Reload => ViewerCommand::Reload,
            Self::StopSimulation => ViewerCommand::StopSimulation,
            Self::ToggleThinOutlines => ViewerCommand::ToggleThinOutlines,
            Self::ToggleField => ViewerCommand::ToggleField,
            Self::ToggleDepthPeeling => ViewerCommand::ToggleDepthPeeling,
            Self::MoreLayers => ViewerCommand::MoreLayers,
            Self::FewerLayers => ViewerCommand::FewerLayers,
            Self::CloseMessageLog => ViewerCommand::CloseMessageLog,
            Self::ClearSelection => ViewerCommand::ClearSelection,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let bindings = HashMap::from([
            ("ArrowLeft".into(), KeyCommandTag::PreviousFrame),
            ("ArrowRight".into(), KeyCommandTag::NextFrame),
            ("Home".into(), KeyCommandTag::FirstFrame),
            ("End".into(), KeyCommandTag::LastFrame),
            ("KeyL".into(), KeyCommandTag::ToggleAlwaysLatest),
            ("KeyR".into(), KeyCommandTag::Reload),
            ("KeyS".into(), KeyCommandTag::StopSimulation),
            ("KeyT".into(), KeyCommandTag::ToggleThinOutlines),
            ("KeyV".into(), KeyCommandTag::ToggleField),
            ("KeyP".into(), KeyCommandTag::ToggleDepthPeeling),
            ("Equal".into(), KeyCommandTag::MoreLayers),
            ("Minus".into(), KeyCommandTag::FewerLayers),
            ("Escape".into(), KeyCommandTag::CloseMessageLog),
            ("Backspace".into(), KeyCommandTag::ClearSelection),
        ]);
        Self { bindings }
    }
}

impl KeyBindings {
    /// Look up the command for a physical key string.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<ViewerCommand> {
        self.bindings.get(key).copied().map(KeyCommandTag::to_command)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InputProcessor
// ─────────────────────────────────────────────────────────────────────────────

/// Converts raw window events into [`ViewerCommand`]s.
///
/// Left click (press and release without dragging) picks, right drag
/// orbits, middle drag pans, the wheel zooms.
///
/// # Usage
///
/// ```ignore
/// if let Some(cmd) = input_processor.handle_event(event) {
///     engine.execute(cmd);
/// }
///
/// if let Some(cmd) = input_processor.handle_key_press("KeyR") {
///     engine.execute(cmd);
/// }
/// ```
pub struct InputProcessor {
    mouse_pos: Vec2,
    left_down_at: Option<Vec2>,
    right_held: bool,
    middle_held: bool,
    key_bindings: KeyBindings,
}

impl InputProcessor {
    /// Create a new processor with default key bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_key_bindings(KeyBindings::default())
    }

    /// Create a processor with custom key bindings.
    #[must_use]
    pub fn with_key_bindings(key_bindings: KeyBindings) -> Self {
        Self {
            mouse_pos: Vec2::ZERO,
            left_down_at: None,
            right_held: false,
            middle_held: false,
            key_bindings,
        }
    }

    /// Current cursor position in physical pixels.
    #[must_use]
    pub fn mouse_pos(&self) -> Vec2 {
        self.mouse_pos
    }

    /// Read-only access to the key bindings.
    #[must_use]
    pub fn key_bindings(&self) -> &KeyBindings {
        &self.key_bindings
    }

    /// Replace the key bindings.
    pub fn set_key_bindings(&mut self, key_bindings: KeyBindings) {
        self.key_bindings = key_bindings;
    }

    /// Look up a key press and return the corresponding command, if bound.
    #[must_use]
    pub fn handle_key_press(&self, key: &str) -> Option<ViewerCommand> {
        self.key_bindings.lookup(key)
    }

    /// Process a raw input event and return zero or one commands.
    pub fn handle_event(&mut self, event: InputEvent) -> Option<ViewerCommand> {
        match event {
            InputEvent::CursorMoved { x, y } => self.handle_cursor_moved(x, y),
            InputEvent::MouseButton { button, pressed } => {
                self.handle_mouse_button(button, pressed)
            }
            InputEvent::Scroll { delta } => Some(ViewerCommand::Zoom { delta }),
        }
    }

    fn handle_cursor_moved(&mut self, x: f32, y: f32) -> Option<ViewerCommand> {
        let pos = Vec2::new(x, y);
        let delta = pos - self.mouse_pos;
        self.mouse_pos = pos;

        if self.right_held {
            Some(ViewerCommand::RotateCamera { delta })
        } else if self.middle_held {
            Some(ViewerCommand::PanCamera { delta })
        } else {
            None
        }
    }

    fn handle_mouse_button(
        &mut self,
        button: MouseButton,
        pressed: bool,
    ) -> Option<ViewerCommand> {
        match button {
            MouseButton::Right => {
                self.right_held = pressed;
                None
            }
            MouseButton::Middle => {
                self.middle_held = pressed;
                None
            }
            MouseButton::Left if pressed => {
                self.left_down_at = Some(self.mouse_pos);
                None
            }
            MouseButton::Left => {
                let down = self.left_down_at.take()?;
                (down.distance(self.mouse_pos) <= CLICK_SLOP).then_some(
                    ViewerCommand::Pick {
                        position: self.mouse_pos,
                    },
                )
            }
        }
    }
}

impl Default for InputProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(p: &mut InputProcessor, x: f32, y: f32) -> Option<ViewerCommand> {
        p.handle_event(InputEvent::CursorMoved { x, y })
    }

    fn button(
        p: &mut InputProcessor,
        button: MouseButton,
        pressed: bool,
    ) -> Option<ViewerCommand> {
        p.handle_event(InputEvent::MouseButton { button, pressed })
    }

    #[test]
    fn left_click_picks_at_cursor() {
        let mut p = InputProcessor::new();
        let _ = moved(&mut p, 100.0, 50.0);
        assert_eq!(button(&mut p, MouseButton::Left, true), None);
        assert_eq!(
            button(&mut p, MouseButton::Left, false),
            Some(ViewerCommand::Pick {
                position: Vec2::new(100.0, 50.0)
            })
        );
    }

    #[test]
    fn left_drag_is_not_a_click() {
        let mut p = InputProcessor::new();
        let _ = button(&mut p, MouseButton::Left, true);
        assert_eq!(moved(&mut p, 40.0, 0.0), None);
        assert_eq!(button(&mut p, MouseButton::Left, false), None);
    }

    #[test]
    fn right_drag_orbits_and_middle_drag_pans() {
        let mut p = InputProcessor::new();
        let _ = moved(&mut p, 10.0, 10.0);
        let _ = button(&mut p, MouseButton::Right, true);
        assert_eq!(
            moved(&mut p, 15.0, 8.0),
            Some(ViewerCommand::RotateCamera {
                delta: Vec2::new(5.0, -2.0)
            })
        );
        let _ = button(&mut p, MouseButton::Right, false);
        let _ = button(&mut p, MouseButton::Middle, true);
        assert_eq!(
            moved(&mut p, 16.0, 8.0),
            Some(ViewerCommand::PanCamera {
                delta: Vec2::new(1.0, 0.0)
            })
        );
        let _ = button(&mut p, MouseButton::Middle, false);
        assert_eq!(moved(&mut p, 20.0, 8.0), None);
    }

    #[test]
    fn scroll_zooms() {
        let mut p = InputProcessor::new();
        assert_eq!(
            p.handle_event(InputEvent::Scroll { delta: 1.5 }),
            Some(ViewerCommand::Zoom { delta: 1.5 })
        );
    }
}
