// SPDX-License-Identifier: GPL-3.0-only

//! Stateless geometry helpers
//!
//! Planes, rays, homogeneous transforms and the pinhole device model. Nothing
//! in here holds shared state, so every function is safe to call from the
//! capture thread and from consumers at the same time.

mod projective;

pub use projective::ProjectiveDevice;

use crate::constants::PARALLEL_EPSILON;
use nalgebra::{Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point or direction in millimeters
pub type Vec3 = Vector3<f32>;

/// Apply a 4x4 transform to a point, dividing by w when it is not 1
///
/// Points sent to infinity (w close to 0) come back as NaN.
pub fn transform_point(matrix: &Matrix4<f32>, point: &Vec3) -> Vec3 {
    let h = matrix * Vector4::new(point.x, point.y, point.z, 1.0);
    if h.w == 1.0 {
        Vec3::new(h.x, h.y, h.z)
    } else if h.w.abs() < f32::EPSILON {
        Vec3::repeat(f32::NAN)
    } else {
        Vec3::new(h.x / h.w, h.y / h.w, h.z / h.w)
    }
}

/// Half-line starting at `origin`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    pub origin: Vec3,
    /// Unit length, or zero for a degenerate ray
    pub direction: Vec3,
}

impl Ray3 {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vec3::zeros),
        }
    }

    /// Ray from `origin` passing through `point`
    pub fn through(origin: Vec3, point: Vec3) -> Self {
        Self::new(origin, point - origin)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Infinite plane given by a point on it and its normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Vec3,
    /// Unit normal, pointing to the side counted as "above"
    pub normal: Vec3,
}

impl Plane {
    /// Create a plane, normalizing `normal`
    ///
    /// A zero normal is kept as-is; `is_valid` reports it.
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        Self {
            origin,
            normal: normal.try_normalize(f32::EPSILON).unwrap_or(normal),
        }
    }

    pub fn is_valid(&self) -> bool {
        let len = self.normal.norm();
        len.is_finite() && (len - 1.0).abs() < 1e-3 && self.origin.iter().all(|v| v.is_finite())
    }

    /// Signed distance from the plane, positive on the normal side
    pub fn distance_to(&self, point: &Vec3) -> f32 {
        (point - self.origin).dot(&self.normal)
    }

    /// Orthogonal projection of `point` onto the plane
    pub fn project(&self, point: &Vec3) -> Vec3 {
        point - self.normal * self.distance_to(point)
    }

    /// Intersection of `ray` with the plane
    ///
    /// Returns `None` for rays parallel to the plane (including degenerate
    /// rays) and for hits behind the ray origin.
    pub fn intersect_ray(&self, ray: &Ray3) -> Option<Vec3> {
        let denom = ray.direction.dot(&self.normal);
        if !denom.is_finite() || denom.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = (self.origin - ray.origin).dot(&self.normal) / denom;
        if !t.is_finite() || t < 0.0 {
            return None;
        }

        let hit = ray.at(t);
        hit.iter().all(|v| v.is_finite()).then_some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Plane {
        Plane::new(Vec3::new(0.0, 0.0, 1000.0), Vec3::new(0.0, 0.0, -2.0))
    }

    #[test]
    fn test_plane_normalizes_normal() {
        let plane = table();
        assert!((plane.normal.norm() - 1.0).abs() < 1e-6);
        assert!(plane.is_valid());
        assert!(!Plane::new(Vec3::zeros(), Vec3::zeros()).is_valid());
    }

    #[test]
    fn test_signed_distance() {
        let plane = table();
        // Normal points back at the sensor, so points closer to it are above
        assert!((plane.distance_to(&Vec3::new(5.0, 5.0, 990.0)) - 10.0).abs() < 1e-4);
        assert!((plane.distance_to(&Vec3::new(0.0, 0.0, 1010.0)) + 10.0).abs() < 1e-4);
        let projected = plane.project(&Vec3::new(3.0, 4.0, 900.0));
        assert!((projected.z - 1000.0).abs() < 1e-4);
    }

    #[test]
    fn test_ray_hits_plane() {
        let ray = Ray3::new(Vec3::zeros(), Vec3::new(0.1, 0.0, 1.0));
        let hit = table().intersect_ray(&ray).unwrap();
        assert!((hit.z - 1000.0).abs() < 1e-2);
        assert!((hit.x - 100.0).abs() < 1e-2);
    }

    #[test]
    fn test_parallel_ray_never_intersects() {
        let ray = Ray3::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(table().intersect_ray(&ray), None);

        let degenerate = Ray3::new(Vec3::zeros(), Vec3::zeros());
        assert_eq!(table().intersect_ray(&degenerate), None);
    }

    #[test]
    fn test_plane_behind_ray() {
        let ray = Ray3::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(table().intersect_ray(&ray), None);
    }

    #[test]
    fn test_transform_point_divides_by_w() {
        let mut m = Matrix4::identity();
        m[(3, 3)] = 2.0;
        let p = transform_point(&m, &Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(p, Vec3::new(1.0, 2.0, 3.0));

        let t = Matrix4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(transform_point(&t, &Vec3::zeros()), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_transform_point_at_infinity() {
        let mut m = Matrix4::identity();
        m[(3, 3)] = 0.0;
        let p = transform_point(&m, &Vec3::new(2.0, 4.0, 6.0));
        assert!(p.iter().all(|v| v.is_nan()));
    }
}
