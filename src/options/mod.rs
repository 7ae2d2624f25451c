//! Centralized viewer options with TOML file support.
//!
//! Rendering, camera, connection, model and key-binding settings are
//! consolidated here. All sub-structs use `#[serde(default)]` so a partial
//! TOML file (e.g. only `[render]`) fills everything else with defaults.

mod camera;
mod connection;
mod models;
mod render;

use std::path::Path;

pub use camera::CameraOptions;
pub use connection::ConnectionOptions;
pub use models::ModelOptions;
pub use render::{RenderOptions, MAX_PEEL_LAYERS, MIN_PEEL_LAYERS};
use serde::{Deserialize, Serialize};

use crate::error::ViewerError;
use crate::input::KeyBindings;

/// Top-level options container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Options {
    /// Transparency, field and styling parameters.
    pub render: RenderOptions,
    /// Camera pose and control parameters.
    pub camera: CameraOptions,
    /// Server endpoints and session behavior.
    pub connection: ConnectionOptions,
    /// Mesh sources.
    pub models: ModelOptions,
    /// Keyboard binding options.
    pub keybindings: KeyBindings,
}

impl Options {
    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Io`] if the file cannot be read and
    /// [`ViewerError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let content = std::fs::read_to_string(path).map_err(ViewerError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::OptionsParse`] on invalid TOML.
    pub fn from_toml(content: &str) -> Result<Self, ViewerError> {
        toml::from_str(content)
            .map_err(|e| ViewerError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ViewerError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ViewerError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ViewerError::Io)?;
        }
        std::fs::write(path, content).map_err(ViewerError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command::ViewerCommand;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[render]
layer_count = 8
thin_outlines = true
";
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.render.layer_count, 8);
        assert!(opts.render.thin_outlines);
        // Everything else should be default
        assert_eq!(opts.render.depth_compare_bias, 1e-6);
        assert_eq!(opts.camera.orbit_radius, 50.0);
        assert_eq!(opts.connection.stream_path, "/ws/usercomms/");
    }

    #[test]
    fn layer_count_is_clamped_on_use() {
        let mut opts = Options::from_toml("[render]\nlayer_count = 500\n")
            .unwrap();
        assert_eq!(opts.render.peel_layers(), MAX_PEEL_LAYERS);
        opts.render.layer_count = 0;
        assert_eq!(opts.render.peel_layers(), MIN_PEEL_LAYERS);
        opts.render.adjust_layers(-3);
        assert_eq!(opts.render.layer_count, 1);
        opts.render.adjust_layers(4);
        assert_eq!(opts.render.layer_count, 5);
    }

    #[test]
    fn invalid_toml_is_an_options_error() {
        let err = Options::from_toml("[render\nlayer_count = ").unwrap_err();
        assert!(matches!(err, ViewerError::OptionsParse(_)));
    }

    #[test]
    fn keybinding_lookup() {
        let opts = Options::default();
        assert_eq!(
            opts.keybindings.lookup("ArrowRight"),
            Some(ViewerCommand::NextFrame)
        );
        assert_eq!(
            opts.keybindings.lookup("KeyV"),
            Some(ViewerCommand::ToggleField)
        );
        assert_eq!(opts.keybindings.lookup("KeyZ"), None);
    }

    #[test]
    fn save_then_load_preserves_overrides() {
        let dir = std::env::temp_dir()
            .join(format!("cellview-options-{}", std::process::id()));
        let path = dir.join("viewer.toml");
        let mut opts = Options::default();
        opts.connection.server_url = "http://sim-host:9000".into();
        opts.render.field_density = 2.5;
        opts.save(&path).unwrap();
        let loaded = Options::load(&path).unwrap();
        assert_eq!(loaded, opts);
        let _ = std::fs::remove_dir_all(dir);
    }
}
