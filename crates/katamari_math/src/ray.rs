//! 3D ray for intersection testing

use crate::vector::Vec3;

/// Ray with a normalized direction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Ray direction (normalized on construction)
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at parameter `t`; a distance when the direction is unit length
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Inverse direction, for slab tests
    #[inline]
    pub fn inverse_direction(&self) -> Vec3 {
        Vec3::new(
            1.0 / self.direction.x,
            1.0 / self.direction.y,
            1.0 / self.direction.z,
        )
    }
}
