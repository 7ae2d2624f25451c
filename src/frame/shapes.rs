//! Static shape overlays served alongside the frames.

use glam::Vec3;
use serde::Deserialize;

use crate::error::ViewerError;

/// Fallback overlay color when the server omits one.
pub const DEFAULT_SHAPE_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 0.8];

/// Overlay geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Sphere of the overlay's radius.
    Sphere,
    /// A type this viewer does not draw.
    Unknown,
}

/// One translucent overlay shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeOverlay {
    /// Geometry kind.
    pub kind: ShapeKind,
    /// Center in world space.
    pub position: Vec3,
    /// Radius.
    pub radius: f32,
    /// Straight (non-premultiplied) RGBA color.
    pub color: [f32; 4],
}

#[derive(Deserialize)]
struct RawShape {
    #[serde(rename = "type")]
    kind: String,
    pos: [f32; 3],
    #[serde(default)]
    radius: f32,
    #[serde(default)]
    color: Option<[f32; 4]>,
}

impl From<RawShape> for ShapeOverlay {
    fn from(raw: RawShape) -> Self {
        let kind = match raw.kind.as_str() {
            "sphere" => ShapeKind::Sphere,
            other => {
                log::debug!("ignoring overlay of unknown type '{other}'");
                ShapeKind::Unknown
            }
        };
        Self {
            kind,
            position: Vec3::from_array(raw.pos),
            radius: raw.radius,
            color: raw.color.unwrap_or(DEFAULT_SHAPE_COLOR),
        }
    }
}

/// Parse the JSON array returned by the shape-list endpoint.
///
/// # Errors
///
/// Returns [`ViewerError::Network`] if the body is not a shape array.
pub fn parse_shape_list(body: &str) -> Result<Vec<ShapeOverlay>, ViewerError> {
    let raw: Vec<RawShape> = serde_json::from_str(body)
        .map_err(|e| ViewerError::Network(format!("bad shape list: {e}")))?;
    Ok(raw.into_iter().map(ShapeOverlay::from).collect())
}
