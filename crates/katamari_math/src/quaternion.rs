//! Unit quaternions

use crate::vector::Vec3;
use core::ops::Mul;

/// Unit quaternion representing a rotation
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    /// No rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around `axis` (normalized here)
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (sin, cos) = (angle * 0.5).sin_cos();
        let axis = axis.normalize_or_zero();
        Self::new(axis.x * sin, axis.y * sin, axis.z * sin, cos)
    }

    /// Rotation about the world up axis
    pub fn from_rotation_y(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::Y, angle)
    }

    #[inline]
    pub fn from_array(q: [f32; 4]) -> Self {
        Self::new(q[0], q[1], q[2], q[3])
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    pub fn normalize(self) -> Self {
        let len = self.length_squared().sqrt();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
        } else {
            Self::IDENTITY
        }
    }

    /// Inverse rotation
    #[inline]
    pub fn inverse(self) -> Self {
        let len_sq = self.length_squared();
        if len_sq > 0.0 {
            let inv = 1.0 / len_sq;
            Self::new(-self.x * inv, -self.y * inv, -self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// Same as `self * v`
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let qv = Vec3::new(self.x, self.y, self.z);
        let uv = qv.cross(v);
        let uuv = qv.cross(uv);
        v + (uv * self.w + uuv) * 2.0
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<Vec3> for Quat {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 {
        self.rotate(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_y_quarter_turn() {
        let q = Quat::from_rotation_y(core::f32::consts::FRAC_PI_2);
        let v = q * Vec3::X;
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_undoes_rotation() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 2.0, 3.0), 0.7);
        let v = Vec3::new(4.0, -1.0, 2.5);
        let back = q.inverse() * (q * v);
        assert_relative_eq!(back.x, v.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, v.z, epsilon = 1e-5);
    }
}
