//! Rigid transforms (position + orientation)
//!
//! Scene nodes never carry scale: the cluster's origin frame must stay free
//! of scaling so that sampled boundary points map back without distortion.

use crate::quaternion::Quat;
use crate::vector::Vec3;

/// Position and rotation of a node
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    /// Origin, no rotation
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    #[inline]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Map a point from this frame into the parent frame
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// Map a point from the parent frame into this frame
    #[inline]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }

    #[inline]
    pub fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.rotation * direction
    }

    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: inv_rotation * -self.position,
            rotation: inv_rotation,
        }
    }

    /// Compose: `self` is the parent frame, `child` is expressed in it
    pub fn combine(&self, child: &Transform) -> Self {
        Self {
            position: self.transform_point(child.position),
            rotation: (self.rotation * child.rotation).normalize(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
