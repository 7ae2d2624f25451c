//! Generated UV sphere and capsule.
//!
//! Rings run from the +Y pole down to the -Y pole; each ring repeats its
//! first vertex at the seam so texture coordinates stay continuous.

use std::f32::consts::{PI, TAU};

use super::{Mesh, MeshVertex};

/// Unit sphere at the origin.
#[must_use]
pub fn uv_sphere(stacks: u32, slices: u32) -> Mesh {
    let rings: Vec<(f32, f32)> = (0..=stacks)
        .map(|i| (PI * i as f32 / stacks as f32, 0.0))
        .collect();
    build(&rings, slices)
}

/// Unit-radius capsule along +Y: the upper hemisphere is centred at
/// `y = +1`, the lower at `y = -1`, joined by a cylinder band between two
/// copies of the equator ring. `stacks` is rounded up to an even count.
#[must_use]
pub fn capsule(stacks: u32, slices: u32) -> Mesh {
    let half = stacks.div_ceil(2);
    let stacks = half * 2;
    let polar = |i: u32| PI * i as f32 / stacks as f32;
    let rings: Vec<(f32, f32)> = (0..=half)
        .map(|i| (polar(i), 1.0))
        .chain((half..=stacks).map(|i| (polar(i), -1.0)))
        .collect();
    build(&rings, slices)
}

/// Sweep `(polar angle, y offset)` rings around Y and stitch neighbours.
fn build(rings: &[(f32, f32)], slices: u32) -> Mesh {
    let row = slices + 1;
    let mut vertices = Vec::with_capacity(rings.len() * row as usize);
    for (r, &(theta, offset)) in rings.iter().enumerate() {
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..=slices {
            let phi = TAU * j as f32 / slices as f32;
            let (sin_p, cos_p) = phi.sin_cos();
            let normal = [sin_t * sin_p, cos_t, sin_t * cos_p];
            vertices.push(MeshVertex {
                position: [normal[0], normal[1] + offset, normal[2]],
                normal,
                uv: [
                    j as f32 / slices as f32,
                    r as f32 / (rings.len() - 1) as f32,
                ],
            });
        }
    }

    let mut indices = Vec::with_capacity((rings.len() - 1) * slices as usize * 6);
    for r in 0..rings.len() as u32 - 1 {
        for j in 0..slices {
            let a = r * row + j;
            let b = (r + 1) * row + j;
            let c = (r + 1) * row + j + 1;
            let d = r * row + j + 1;
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    Mesh { vertices, indices }
}
