//! Closed-form ray/capsule intersection.

use glam::Vec3;

/// A world-space ray with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Point at parameter `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

const PARALLEL_EPSILON: f32 = 1e-8;

/// Distance along `ray` to the nearest hit on the capsule whose cap
/// centers are `a` and `b`, or `None` for a miss or a hit behind the
/// origin.
///
/// The body is solved as an infinite cylinder clipped to the segment; a
/// body root outside the segment falls through to the cap sphere on that
/// side.
#[must_use]
pub fn intersect_capsule(ray: &Ray, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
    let ro = ray.origin;
    let rd = ray.direction;
    let ba = b - a;
    let oa = ro - a;
    let baba = ba.dot(ba);
    let bard = ba.dot(rd);
    let baoa = ba.dot(oa);
    let rdoa = rd.dot(oa);
    let oaoa = oa.dot(oa);

    let qa = baba - bard * bard;
    if qa.abs() <= PARALLEL_EPSILON * baba.max(1.0) {
        // Ray parallel to the axis (or a degenerate segment): only the caps
        // can be hit first.
        return nearest_positive([
            intersect_sphere(ray, a, radius),
            intersect_sphere(ray, b, radius),
        ]);
    }

    let qb = baba * rdoa - baoa * bard;
    let qc = baba * oaoa - baoa * baoa - radius * radius * baba;
    let h = qb * qb - qa * qc;
    if h < 0.0 {
        return None;
    }

    let t = (-qb - h.sqrt()) / qa;
    let y = baoa + t * bard;
    if y > 0.0 && y < baba {
        return (t > 0.0).then_some(t);
    }

    let cap = if y <= 0.0 { a } else { b };
    intersect_sphere(ray, cap, radius)
}

/// Near-root ray/sphere intersection, positive hits only.
#[must_use]
pub fn intersect_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = ray.direction.dot(oc);
    let c = oc.dot(oc) - radius * radius;
    let h = b * b - c;
    if h <= 0.0 {
        return None;
    }
    let t = -b - h.sqrt();
    (t > 0.0).then_some(t)
}

fn nearest_positive<const N: usize>(hits: [Option<f32>; N]) -> Option<f32> {
    hits.into_iter().flatten().reduce(f32::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray(origin: Vec3, direction: Vec3) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    #[test]
    fn body_hit_distance_matches_geometry() {
        // Capsule along X through the origin, radius 1.
        let r = ray(Vec3::new(0.5, 0.0, 10.0), Vec3::NEG_Z);
        let a = Vec3::new(-2.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 0.0, 0.0);
        let t = intersect_capsule(&r, a, b, 1.0).unwrap();
        assert!((t - 9.0).abs() < 1e-4);
        let hit = r.at(t);
        assert!(((r.origin - hit).length() - t).abs() < 1e-4);
        assert!((hit - Vec3::new(0.5, 0.0, 1.0)).length() < 1e-4);
    }

    #[test]
    fn axial_ray_hits_the_near_cap() {
        let r = ray(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let a = Vec3::new(0.0, 0.0, -2.0);
        let b = Vec3::new(0.0, 0.0, 2.0);
        let t = intersect_capsule(&r, a, b, 1.0).unwrap();
        assert!((t - 7.0).abs() < 1e-4);
    }

    #[test]
    fn oblique_ray_hits_a_cap_past_the_body() {
        // Passes beyond the +X end: only the cap sphere is in reach.
        let r = ray(Vec3::new(2.5, 0.0, 10.0), Vec3::NEG_Z);
        let a = Vec3::new(-2.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 0.0, 0.0);
        let t = intersect_capsule(&r, a, b, 1.0).unwrap();
        let expected = 10.0 - (1.0f32 - 0.25).sqrt();
        assert!((t - expected).abs() < 1e-4);
    }

    #[test]
    fn misses_and_hits_behind_are_rejected() {
        let a = Vec3::new(-2.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 0.0, 0.0);
        let miss = ray(Vec3::new(0.0, 5.0, 10.0), Vec3::NEG_Z);
        assert_eq!(intersect_capsule(&miss, a, b, 1.0), None);
        let past_end = ray(Vec3::new(3.5, 0.0, 10.0), Vec3::NEG_Z);
        assert_eq!(intersect_capsule(&past_end, a, b, 1.0), None);
        let behind = ray(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert_eq!(intersect_capsule(&behind, a, b, 1.0), None);
    }

    #[test]
    fn zero_length_capsule_is_a_sphere() {
        let r = ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let t = intersect_capsule(&r, Vec3::ZERO, Vec3::ZERO, 2.0).unwrap();
        assert!((t - 3.0).abs() < 1e-4);
    }
}
