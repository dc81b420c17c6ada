//! Orbiting follow camera

use crate::config::CameraConfig;
use katamari_math::{radians, Quat, Vec3};

/// Look input for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LookInput {
    /// Horizontal look axis, orbits around the cluster
    pub x: f32,
    /// Vertical look axis, raises and pulls back the offset
    pub y: f32,
}

/// Where the camera ended up, plus the basis movement is applied in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    /// Unit vector from the camera to the target
    pub forward: Vec3,
    /// Unit vector to the camera's right, horizontal
    pub right: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
        }
    }
}

/// Camera state carried across frames
#[derive(Debug, Clone)]
pub struct CameraRig {
    config: CameraConfig,
    offset: Vec3,
    /// Orbit angle in degrees, [0, 360)
    rotation: f32,
    pose: CameraPose,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            offset: config.offset,
            config,
            rotation: 0.0,
            pose: CameraPose::default(),
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Pose computed by the last [`CameraRig::update`]
    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    /// Advance the rig and aim it at `target`.
    ///
    /// The vertical look axis drives both the offset's height and its
    /// horizontal distance, each clamped to the look limits.
    pub fn update(&mut self, target: Vec3, look: LookInput, boundary_radius: f32) -> CameraPose {
        self.rotation = (self.rotation + look.x * self.config.rotation_speed).rem_euclid(360.0);

        let (low, high) = self.config.look_limits;
        let delta = look.y * self.config.look_speed;
        self.offset.y = (self.offset.y + delta).clamp(low, high);
        self.offset.x = (self.offset.x + delta).clamp(low, high);

        let zoom = 1.0 + self.config.radius_zoom * boundary_radius.max(0.0);
        let orbit = Quat::from_rotation_y(radians(self.rotation));
        let position = target + orbit * (self.offset * zoom);

        let forward = (target - position).normalize_or_zero();
        let mut right = forward.cross(Vec3::Y).normalize_or_zero();
        if right == Vec3::ZERO {
            // Looking straight down: keep the orbit's own x axis
            right = orbit * Vec3::X;
        }

        self.pose = CameraPose {
            position,
            target,
            forward,
            right,
        };
        self.pose
    }
}
