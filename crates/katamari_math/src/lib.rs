//! # katamari_math
//!
//! Small math layer shared by the scene graph, the cluster core and the test
//! hosts: vectors, rotations, rigid transforms, rays and the two analytic
//! intersection tests the mock physics host needs.

pub mod bounds;
pub mod intersect;
pub mod quaternion;
pub mod ray;
pub mod transform;
pub mod vector;

pub use bounds::Aabb;
pub use intersect::{ray_aabb_crossings, ray_sphere_crossings};
pub use quaternion::Quat;
pub use ray::Ray;
pub use transform::Transform;
pub use vector::Vec3;

/// Common math constants
pub mod consts {
    pub const PI: f32 = core::f32::consts::PI;
    pub const TAU: f32 = PI * 2.0;
    pub const DEG_TO_RAD: f32 = PI / 180.0;
    pub const EPSILON: f32 = 1e-6;
}

/// Convert degrees to radians
#[inline]
pub fn radians(degrees: f32) -> f32 {
    degrees * consts::DEG_TO_RAD
}

pub mod prelude {
    pub use crate::bounds::Aabb;
    pub use crate::quaternion::Quat;
    pub use crate::ray::Ray;
    pub use crate::transform::Transform;
    pub use crate::vector::Vec3;
    pub use crate::radians;
}
