//! Minimal glTF 2.0 reader: the first primitive of the first mesh, with
//! `POSITION`, `NORMAL`, optional `TEXCOORD_0` and an index accessor, from
//! a `.gltf` JSON file whose buffers are external files next to it.

use std::path::Path;

use serde::Deserialize;

use super::{Mesh, MeshVertex};
use crate::error::ViewerError;

const FLOAT: u32 = 5126;
const UNSIGNED_BYTE: u32 = 5121;
const UNSIGNED_SHORT: u32 = 5123;
const UNSIGNED_INT: u32 = 5125;

#[derive(Deserialize)]
struct Document {
    meshes: Vec<MeshDef>,
    accessors: Vec<Accessor>,
    #[serde(rename = "bufferViews")]
    buffer_views: Vec<BufferView>,
    buffers: Vec<BufferDef>,
}

#[derive(Deserialize)]
struct MeshDef {
    primitives: Vec<Primitive>,
}

#[derive(Deserialize)]
struct Primitive {
    attributes: Attributes,
    indices: Option<usize>,
}

#[derive(Deserialize)]
struct Attributes {
    #[serde(rename = "POSITION")]
    position: usize,
    #[serde(rename = "NORMAL")]
    normal: usize,
    #[serde(rename = "TEXCOORD_0")]
    texcoord: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: usize,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    #[serde(default)]
    byte_offset: usize,
    byte_length: usize,
    byte_stride: Option<usize>,
}

#[derive(Deserialize)]
struct BufferDef {
    uri: Option<String>,
}

fn model_error(msg: impl Into<String>) -> ViewerError {
    ViewerError::Model(msg.into())
}

/// Read the mesh at `path`.
///
/// # Errors
///
/// [`ViewerError::Model`] for unreadable files, embedded or missing
/// buffers, unsupported accessor types, or out-of-bounds accessors.
pub fn load(path: &Path) -> Result<Mesh, ViewerError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| model_error(format!("{}: {e}", path.display())))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse(&text, |uri| {
        if uri.starts_with("data:") {
            return Err(model_error("embedded data URIs are not supported"));
        }
        let file = dir.join(uri);
        std::fs::read(&file)
            .map_err(|e| model_error(format!("{}: {e}", file.display())))
    })
}

/// Parse a glTF document, resolving buffer URIs through `read_buffer`.
///
/// # Errors
///
/// See [`load`].
pub fn parse(
    text: &str,
    mut read_buffer: impl FnMut(&str) -> Result<Vec<u8>, ViewerError>,
) -> Result<Mesh, ViewerError> {
    let doc: Document = serde_json::from_str(text)
        .map_err(|e| model_error(format!("invalid glTF: {e}")))?;
    let primitive = doc
        .meshes
        .first()
        .and_then(|m| m.primitives.first())
        .ok_or_else(|| model_error("glTF has no mesh primitive"))?;
    let index_accessor = primitive
        .indices
        .ok_or_else(|| model_error("glTF primitive has no indices"))?;

    let buffers = doc
        .buffers
        .iter()
        .map(|b| match &b.uri {
            Some(uri) => read_buffer(uri),
            None => Err(model_error("buffer without uri (binary glTF)")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let reader = Reader {
        doc: &doc,
        buffers: &buffers,
    };
    let positions = reader.floats(primitive.attributes.position, "VEC3", 3)?;
    let normals = reader.floats(primitive.attributes.normal, "VEC3", 3)?;
    let uvs = match primitive.attributes.texcoord {
        Some(a) => Some(reader.floats(a, "VEC2", 2)?),
        None => None,
    };
    let indices = reader.indices(index_accessor)?;

    let count = positions.len() / 3;
    if normals.len() / 3 != count || uvs.as_ref().is_some_and(|t| t.len() / 2 != count) {
        return Err(model_error("attribute counts differ"));
    }
    let vertices = (0..count)
        .map(|i| MeshVertex {
            position: [positions[3 * i], positions[3 * i + 1], positions[3 * i + 2]],
            normal: [normals[3 * i], normals[3 * i + 1], normals[3 * i + 2]],
            uv: uvs.as_ref().map_or([0.0; 2], |t| [t[2 * i], t[2 * i + 1]]),
        })
        .collect();
    Ok(Mesh { vertices, indices })
}

struct Reader<'a> {
    doc: &'a Document,
    buffers: &'a [Vec<u8>],
}

impl Reader<'_> {
    /// Byte slices of each element of `accessor`, honouring the view stride.
    fn elements(
        &self,
        accessor: usize,
        element_size: usize,
    ) -> Result<Vec<&[u8]>, ViewerError> {
        let acc = self
            .doc
            .accessors
            .get(accessor)
            .ok_or_else(|| model_error(format!("no accessor {accessor}")))?;
        let view = self
            .doc
            .buffer_views
            .get(acc.buffer_view)
            .ok_or_else(|| model_error(format!("no buffer view {}", acc.buffer_view)))?;
        let buffer = self
            .buffers
            .get(view.buffer)
            .ok_or_else(|| model_error(format!("no buffer {}", view.buffer)))?;
        let stride = view.byte_stride.unwrap_or(element_size);
        let view_end = view
            .byte_offset
            .checked_add(view.byte_length)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| model_error("buffer view exceeds its buffer"))?;
        (0..acc.count)
            .map(|i| {
                let range = i
                    .checked_mul(stride)
                    .and_then(|off| off.checked_add(acc.byte_offset))
                    .and_then(|off| off.checked_add(view.byte_offset))
                    .and_then(|start| Some(start..start.checked_add(element_size)?))
                    .filter(|range| range.end <= view_end);
                range.map(|range| &buffer[range]).ok_or_else(|| {
                    model_error(format!("accessor {accessor} exceeds its buffer view"))
                })
            })
            .collect()
    }

    fn floats(
        &self,
        accessor: usize,
        kind: &str,
        width: usize,
    ) -> Result<Vec<f32>, ViewerError> {
        let acc = self
            .doc
            .accessors
            .get(accessor)
            .ok_or_else(|| model_error(format!("no accessor {accessor}")))?;
        if acc.component_type != FLOAT || acc.kind != kind {
            return Err(model_error(format!(
                "accessor {accessor} is not a float {kind}"
            )));
        }
        Ok(self
            .elements(accessor, 4 * width)?
            .into_iter()
            .flat_map(|e| {
                e.chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            })
            .collect())
    }

    fn indices(&self, accessor: usize) -> Result<Vec<u32>, ViewerError> {
        let acc = self
            .doc
            .accessors
            .get(accessor)
            .ok_or_else(|| model_error(format!("no accessor {accessor}")))?;
        if acc.kind != "SCALAR" {
            return Err(model_error("index accessor is not SCALAR"));
        }
        let (size, read): (usize, fn(&[u8]) -> u32) = match acc.component_type {
            UNSIGNED_BYTE => (1, |b| u32::from(b[0])),
            UNSIGNED_SHORT => (2, |b| u32::from(u16::from_le_bytes([b[0], b[1]]))),
            UNSIGNED_INT => (4, |b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            other => {
                return Err(model_error(format!(
                    "unsupported index component type {other}"
                )))
            }
        };
        Ok(self.elements(accessor, size)?.into_iter().map(read).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One triangle: positions, normals and u16 indices in one buffer.
    fn triangle() -> (String, Vec<u8>) {
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for _ in 0..3 {
            for c in [0.0f32, 0.0, 1.0] {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        let json = format!(
            r#"{{
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0, "NORMAL": 1}}, "indices": 2}}]}}],
            "accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}},
                {{"bufferView": 0, "byteOffset": 36, "componentType": 5126, "count": 3, "type": "VEC3"}},
                {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
            ],
            "bufferViews": [
                {{"buffer": 0, "byteOffset": 0, "byteLength": 72}},
                {{"buffer": 0, "byteOffset": 72, "byteLength": 6}}
            ],
            "buffers": [{{"uri": "tri.bin", "byteLength": {}}}]
        }}"#,
            bin.len()
        );
        (json, bin)
    }

    #[test]
    fn parses_single_primitive() {
        let (json, bin) = triangle();
        let mesh = parse(&json, |uri| {
            assert_eq!(uri, "tri.bin");
            Ok(bin.clone())
        })
        .unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices[0].uv, [0.0, 0.0]);
    }

    #[test]
    fn loads_from_disk_with_external_buffer() {
        let (json, bin) = triangle();
        let dir = std::env::temp_dir().join(format!("cellview-gltf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tri.bin"), &bin).unwrap();
        std::fs::write(dir.join("tri.gltf"), json).unwrap();
        let mesh = load(&dir.join("tri.gltf")).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn short_buffer_is_rejected() {
        let (json, bin) = triangle();
        let result = parse(&json, |_| Ok(bin[..40].to_vec()));
        assert!(matches!(result, Err(ViewerError::Model(_))));
    }

    #[test]
    fn overflowing_offsets_are_rejected() {
        let (json, bin) = triangle();
        let huge_view = json.replace(
            r#""byteOffset": 72, "byteLength": 6"#,
            &format!(r#""byteOffset": {}, "byteLength": 6"#, usize::MAX),
        );
        let result = parse(&huge_view, |_| Ok(bin.clone()));
        assert!(matches!(result, Err(ViewerError::Model(_))));

        let huge_accessor = json.replace(
            r#""byteOffset": 36"#,
            &format!(r#""byteOffset": {}"#, usize::MAX - 4),
        );
        let result = parse(&huge_accessor, |_| Ok(bin.clone()));
        assert!(matches!(result, Err(ViewerError::Model(_))));

        let huge_stride = json.replace(
            r#""byteOffset": 0, "byteLength": 72"#,
            &format!(r#""byteOffset": 0, "byteLength": 72, "byteStride": {}"#, usize::MAX / 2),
        );
        let result = parse(&huge_stride, |_| Ok(bin.clone()));
        assert!(matches!(result, Err(ViewerError::Model(_))));
    }

    #[test]
    fn data_uri_and_missing_primitive_are_rejected() {
        let (json, _) = triangle();
        let embedded = json.replace("tri.bin", "data:application/octet-stream;base64,AAAA");
        assert!(load_from_str(&embedded).is_err());
        assert!(parse(
            r#"{"meshes": [], "accessors": [], "bufferViews": [], "buffers": []}"#,
            |_| Ok(Vec::new())
        )
        .is_err());
    }

    fn load_from_str(json: &str) -> Result<Mesh, ViewerError> {
        let dir = std::env::temp_dir().join(format!("cellview-gltf-uri-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("embedded.gltf");
        std::fs::write(&path, json).unwrap();
        let result = load(&path);
        std::fs::remove_dir_all(&dir).unwrap();
        result
    }
}
