//! Crate-level error types.

use std::fmt;

use crate::frame::codec::FrameError;
use crate::gpu::render_context::RenderContextError;

/// Errors produced by the cellview crate.
#[derive(Debug)]
pub enum ViewerError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// A frame payload failed validation.
    MalformedFrame(FrameError),
    /// A shader failed to compose or validate.
    ShaderBuild {
        /// Pipeline stage label.
        label: String,
        /// Composer / validator diagnostic.
        message: String,
    },
    /// An HTTP fetch failed (transport error or non-2xx status).
    Network(String),
    /// The event stream closed or could not be opened.
    StreamClosed(String),
    /// A mesh model could not be loaded.
    Model(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::MalformedFrame(e) => write!(f, "malformed frame: {e}"),
            Self::ShaderBuild { label, message } => {
                write!(f, "shader build failed for '{label}': {message}")
            }
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::StreamClosed(msg) => {
                write!(f, "event stream closed: {msg}")
            }
            Self::Model(msg) => write!(f, "model load error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::MalformedFrame(e) => Some(e),
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for ViewerError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<FrameError> for ViewerError {
    fn from(e: FrameError) -> Self {
        Self::MalformedFrame(e)
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ureq::Error> for ViewerError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(e.to_string())
    }
}
