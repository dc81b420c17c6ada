//! Analytic ray intersection tests
//!
//! Both functions report every boundary crossing in front of the ray origin,
//! nearest first. A ray starting inside the shape reports only its exit.

use crate::bounds::Aabb;
use crate::ray::Ray;
use crate::vector::Vec3;

/// Ray-sphere crossings within `max_distance`
///
/// Solved around the point of closest approach so that rays starting far
/// from a small sphere keep their precision.
pub fn ray_sphere_crossings(ray: &Ray, center: Vec3, radius: f32, max_distance: f32) -> Vec<f32> {
    let oc = ray.origin - center;
    let t_closest = -oc.dot(ray.direction);
    let closest = oc + ray.direction * t_closest;
    let h_squared = radius * radius - closest.length_squared();

    if h_squared < 0.0 {
        return Vec::new();
    }

    let h = h_squared.sqrt();
    [t_closest - h, t_closest + h]
        .into_iter()
        .filter(|t| *t >= 0.0 && *t <= max_distance)
        .collect()
}

/// Ray-box crossings within `max_distance` (slab method)
pub fn ray_aabb_crossings(ray: &Ray, aabb: &Aabb, max_distance: f32) -> Vec<f32> {
    let inv_dir = ray.inverse_direction();

    let t1 = (aabb.min.x - ray.origin.x) * inv_dir.x;
    let t2 = (aabb.max.x - ray.origin.x) * inv_dir.x;
    let t3 = (aabb.min.y - ray.origin.y) * inv_dir.y;
    let t4 = (aabb.max.y - ray.origin.y) * inv_dir.y;
    let t5 = (aabb.min.z - ray.origin.z) * inv_dir.z;
    let t6 = (aabb.max.z - ray.origin.z) * inv_dir.z;

    let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
    let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

    if tmax < 0.0 || tmin > tmax {
        return Vec::new();
    }

    [tmin, tmax]
        .into_iter()
        .filter(|t| *t >= 0.0 && *t <= max_distance)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_sphere_from_outside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::Z);
        let hits = ray_sphere_crossings(&ray, Vec3::ZERO, 5.0, 100.0);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0], 5.0, epsilon = 1e-5);
        assert_relative_eq!(hits[1], 15.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_sphere_from_inside() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hits = ray_sphere_crossings(&ray, Vec3::ZERO, 5.0, 100.0);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0], 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_sphere_respects_max_distance() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::Z);
        assert!(ray_sphere_crossings(&ray, Vec3::ZERO, 5.0, 4.0).is_empty());
    }

    #[test]
    fn test_ray_sphere_from_far_away() {
        let dir = Vec3::new(0.3, -0.5, 0.8).normalize_or_zero();
        let ray = Ray::new(dir * 10_000.0, -dir);
        let hits = ray_sphere_crossings(&ray, Vec3::ZERO, 5.0, 10_000.0);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(ray.at(hits[0]).length(), 5.0, epsilon = 1e-2);
    }

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 7.0));
        let hits = ray_aabb_crossings(&ray, &aabb, 100.0);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0], 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_aabb_miss() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 7.0));
        assert!(ray_aabb_crossings(&ray, &aabb, 100.0).is_empty());
    }
}
