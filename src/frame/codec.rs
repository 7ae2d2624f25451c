//! Binary frame payload: decoding, validation and the inverse encoding.
//!
//! Layout (little-endian):
//!
//! ```text
//! u32                 cell count N
//! N × 36 bytes        CellInstance records
//! N × u64             cell identifiers
//! u8                  has-field flag (0 / 1)
//! if has-field:
//!   3 × f32           origin
//!   3 × f32           cell size
//!   3 × i32           grid count
//!   x·y·z × RGBA8     voxels
//! ```

use std::fmt;

use glam::{IVec3, Vec3};

use super::{CellInstance, Frame, VolumetricField};

const HEADER_SIZE: usize = 4;
const ID_SIZE: usize = 8;
const FIELD_HEADER_SIZE: usize = 36;

/// Why a frame payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The buffer ended before the section named by `section`.
    Truncated {
        /// Section being read when the buffer ran out.
        section: &'static str,
        /// Bytes the section needed.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
    /// The declared cell count cannot describe a buffer of this size.
    ImpossibleCellCount(u32),
    /// The has-field flag was neither 0 nor 1.
    InvalidFieldFlag(u8),
    /// A grid dimension was negative or the voxel count overflowed.
    InvalidGridCount([i32; 3]),
    /// The voxel section length differs from `4·x·y·z`.
    VoxelLengthMismatch {
        /// Bytes implied by the grid count.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },
    /// The cells-only payload carried extra bytes after the flag.
    TrailingBytes(usize),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated {
                section,
                needed,
                available,
            } => write!(
                f,
                "truncated {section}: need {needed} bytes, {available} left"
            ),
            Self::ImpossibleCellCount(n) => {
                write!(f, "cell count {n} does not fit the buffer")
            }
            Self::InvalidFieldFlag(v) => {
                write!(f, "field flag must be 0 or 1, got {v}")
            }
            Self::InvalidGridCount([x, y, z]) => {
                write!(f, "invalid grid count {x}x{y}x{z}")
            }
            Self::VoxelLengthMismatch { expected, actual } => write!(
                f,
                "voxel section is {actual} bytes, grid implies {expected}"
            ),
            Self::TrailingBytes(n) => {
                write!(f, "{n} unexpected trailing bytes")
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Byte offset of cell record `i`.
#[must_use]
pub const fn cell_vertex_offset(i: usize) -> usize {
    HEADER_SIZE + CellInstance::SIZE * i
}

/// Byte offset of identifier `i` in a frame of `cell_count` cells.
#[must_use]
pub const fn cell_id_offset(cell_count: usize, i: usize) -> usize {
    HEADER_SIZE + CellInstance::SIZE * cell_count + ID_SIZE * i
}

/// Little-endian cursor over a borrowed payload.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(
        &mut self,
        len: usize,
        section: &'static str,
    ) -> Result<&'a [u8], FrameError> {
        if len > self.remaining() {
            return Err(FrameError::Truncated {
                section,
                needed: len,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn array<const N: usize>(
        &mut self,
        section: &'static str,
    ) -> Result<[u8; N], FrameError> {
        let bytes = self.take(N, section)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self, section: &'static str) -> Result<u8, FrameError> {
        Ok(self.array::<1>(section)?[0])
    }

    fn u32(&mut self, section: &'static str) -> Result<u32, FrameError> {
        self.array(section).map(u32::from_le_bytes)
    }

    fn i32(&mut self, section: &'static str) -> Result<i32, FrameError> {
        self.array(section).map(i32::from_le_bytes)
    }

    fn f32(&mut self, section: &'static str) -> Result<f32, FrameError> {
        self.array(section).map(f32::from_le_bytes)
    }

    fn u64(&mut self, section: &'static str) -> Result<u64, FrameError> {
        self.array(section).map(u64::from_le_bytes)
    }

    fn vec3(&mut self, section: &'static str) -> Result<[f32; 3], FrameError> {
        Ok([self.f32(section)?, self.f32(section)?, self.f32(section)?])
    }
}

/// Parse and validate one frame payload.
///
/// # Errors
///
/// Returns [`FrameError`] when the buffer length is inconsistent with the
/// declared cell count or field dimensions.
pub fn decode(buffer: &[u8]) -> Result<Frame, FrameError> {
    let mut r = ByteReader::new(buffer);
    let declared = r.u32("cell count")?;
    let count = declared as usize;

    // Records, ids and the flag byte must all fit before anything is read.
    let per_cell = CellInstance::SIZE + ID_SIZE;
    let needed = count
        .checked_mul(per_cell)
        .and_then(|n| n.checked_add(1))
        .ok_or(FrameError::ImpossibleCellCount(declared))?;
    if needed > r.remaining() {
        return Err(FrameError::ImpossibleCellCount(declared));
    }

    let mut cells = Vec::with_capacity(count);
    for _ in 0..count {
        let position = r.vec3("cell position")?;
        let axis_direction = r.vec3("cell axis")?;
        let length = r.f32("cell length")?;
        let radius = r.f32("cell radius")?;
        let color_rgba = r.array::<4>("cell color")?;
        cells.push(CellInstance {
            position,
            axis_direction,
            length,
            radius,
            color_rgba,
        });
    }

    let cell_ids = (0..count)
        .map(|_| r.u64("cell id"))
        .collect::<Result<Vec<_>, _>>()?;

    let field = match r.u8("field flag")? {
        0 => {
            if r.remaining() > 0 {
                return Err(FrameError::TrailingBytes(r.remaining()));
            }
            None
        }
        1 => Some(decode_field(&mut r)?),
        other => return Err(FrameError::InvalidFieldFlag(other)),
    };

    Ok(Frame {
        cells,
        cell_ids,
        field,
    })
}

fn decode_field(r: &mut ByteReader<'_>) -> Result<VolumetricField, FrameError> {
    if r.remaining() < FIELD_HEADER_SIZE {
        return Err(FrameError::Truncated {
            section: "field header",
            needed: FIELD_HEADER_SIZE,
            available: r.remaining(),
        });
    }
    let origin = Vec3::from_array(r.vec3("field origin")?);
    let cell_size = Vec3::from_array(r.vec3("field cell size")?);
    let dims = [
        r.i32("field grid count")?,
        r.i32("field grid count")?,
        r.i32("field grid count")?,
    ];

    let expected = dims
        .iter()
        .try_fold(4usize, |acc, &d| {
            usize::try_from(d).ok().and_then(|d| acc.checked_mul(d))
        })
        .ok_or(FrameError::InvalidGridCount(dims))?;
    if expected != r.remaining() {
        return Err(FrameError::VoxelLengthMismatch {
            expected,
            actual: r.remaining(),
        });
    }
    let voxels = r.take(expected, "field voxels")?.to_vec();

    Ok(VolumetricField {
        origin,
        cell_size,
        cell_count: IVec3::from_array(dims),
        voxels,
    })
}

/// Serialize a frame into the wire layout read by [`decode`].
#[must_use]
pub fn encode(frame: &Frame) -> Vec<u8> {
    let count = frame.cells.len();
    let field_len = frame
        .field
        .as_ref()
        .map_or(0, |f| FIELD_HEADER_SIZE + f.voxels.len());
    let mut out = Vec::with_capacity(cell_id_offset(count, count) + 1 + field_len);

    out.extend_from_slice(&(count as u32).to_le_bytes());
    for cell in &frame.cells {
        let floats = cell
            .position
            .into_iter()
            .chain(cell.axis_direction)
            .chain([cell.length, cell.radius]);
        for v in floats {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&cell.color_rgba);
    }
    for id in &frame.cell_ids {
        out.extend_from_slice(&id.to_le_bytes());
    }

    match &frame.field {
        None => out.push(0),
        Some(field) => {
            out.push(1);
            for v in field
                .origin
                .to_array()
                .into_iter()
                .chain(field.cell_size.to_array())
            {
                out.extend_from_slice(&v.to_le_bytes());
            }
            for d in field.cell_count.to_array() {
                out.extend_from_slice(&d.to_le_bytes());
            }
            out.extend_from_slice(&field.voxels);
        }
    }
    out
}
