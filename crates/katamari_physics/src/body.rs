//! Rigid bodies

use crate::convert;
use katamari_math::{Quat, Vec3};
use rapier3d::prelude as rapier;
use serde::{Deserialize, Serialize};

/// Opaque body handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub(crate) rapier::RigidBodyHandle);

/// How a body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RigidBodyType {
    /// Never moves (floors, walls)
    Static,
    /// Integrated from forces and contacts
    #[default]
    Dynamic,
    /// Teleported to a target pose every step; pushes dynamic bodies
    /// without being pushed back
    KinematicPositionBased,
}

impl RigidBodyType {
    pub fn is_kinematic(&self) -> bool {
        matches!(self, Self::KinematicPositionBased)
    }
}

impl From<RigidBodyType> for rapier::RigidBodyType {
    fn from(t: RigidBodyType) -> Self {
        match t {
            RigidBodyType::Static => rapier::RigidBodyType::Fixed,
            RigidBodyType::Dynamic => rapier::RigidBodyType::Dynamic,
            RigidBodyType::KinematicPositionBased => rapier::RigidBodyType::KinematicPositionBased,
        }
    }
}

impl From<rapier::RigidBodyType> for RigidBodyType {
    fn from(t: rapier::RigidBodyType) -> Self {
        match t {
            rapier::RigidBodyType::Fixed => RigidBodyType::Static,
            rapier::RigidBodyType::Dynamic => RigidBodyType::Dynamic,
            rapier::RigidBodyType::KinematicPositionBased
            | rapier::RigidBodyType::KinematicVelocityBased => RigidBodyType::KinematicPositionBased,
        }
    }
}

/// Initial state of a body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBodyDesc {
    pub body_type: RigidBodyType,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            body_type: RigidBodyType::Dynamic,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

impl RigidBodyDesc {
    pub fn fixed() -> Self {
        Self {
            body_type: RigidBodyType::Static,
            ..Default::default()
        }
    }

    pub fn dynamic() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Linear and angular velocity damping
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub(crate) fn to_rapier_builder(&self, can_sleep: bool) -> rapier::RigidBodyBuilder {
        rapier::RigidBodyBuilder::new(self.body_type.into())
            .position(rapier::Isometry::from_parts(
                rapier::Translation::new(self.position.x, self.position.y, self.position.z),
                convert::rotation(self.rotation),
            ))
            .linear_damping(self.linear_damping)
            .angular_damping(self.angular_damping)
            .can_sleep(can_sleep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_type_round_trip_through_rapier() {
        for t in [
            RigidBodyType::Static,
            RigidBodyType::Dynamic,
            RigidBodyType::KinematicPositionBased,
        ] {
            assert_eq!(RigidBodyType::from(rapier::RigidBodyType::from(t)), t);
        }
        assert_eq!(
            RigidBodyType::from(rapier::RigidBodyType::KinematicVelocityBased),
            RigidBodyType::KinematicPositionBased
        );
    }
}
