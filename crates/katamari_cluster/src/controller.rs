//! Rolling movement and jumping

use crate::camera::CameraPose;
use crate::config::MovementConfig;
use crate::error::Result;
use crate::host::ClusterHost;
use katamari_math::Vec3;
use katamari_scene::{CollisionLayer, NodeHandle};

/// Movement input for one physics step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementInput {
    /// Strafe axis in [-1, 1]
    pub horizontal: f32,
    /// Forward axis in [-1, 1]
    pub vertical: f32,
    pub jump: bool,
    /// Step length in seconds
    pub dt: f32,
}

/// What movement did this step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementReport {
    pub torque: Vec3,
    pub jumped: bool,
}

/// Torque that rolls the body relative to the camera.
///
/// Rolling forward means spinning around the camera's right axis, so the
/// forward axis feeds the right vector and vice versa. Signs are for a
/// right-handed, Y-up world: spin around `-right` carries a ball along
/// `forward`, spin around `forward` carries it along `right`.
pub fn rolling_torque(config: &MovementConfig, camera: &CameraPose, input: &MovementInput) -> Vec3 {
    let h = input.horizontal * config.movement_speed * input.dt;
    let v = input.vertical * config.movement_speed * input.dt;

    camera.forward.flatten_y() * h - camera.right.flatten_y() * v
}

/// Apply rolling torque and, when grounded, the jump force to `root`.
///
/// The floor probe runs straight down from the origin for
/// `boundary_radius + floor_distance`, ignoring the cluster's own layer.
pub fn apply_movement<H: ClusterHost + ?Sized>(
    host: &mut H,
    root: NodeHandle,
    cluster_layer: CollisionLayer,
    boundary_radius: f32,
    config: &MovementConfig,
    camera: &CameraPose,
    input: &MovementInput,
) -> Result<MovementReport> {
    let torque = rolling_torque(config, camera, input);
    if torque != Vec3::ZERO {
        host.add_torque(root, torque)?;
    }

    let mut jumped = false;
    if input.jump {
        let origin = host.world_transform_of(root)?.position;
        let probe = boundary_radius + config.floor_distance;
        let grounded = !host
            .cast_ray(origin, Vec3::NEG_Y, probe, cluster_layer.inverse_mask())
            .is_empty();

        if grounded {
            host.add_force(root, Vec3::Y * config.jump_force)?;
            jumped = true;
        } else {
            log::trace!("Jump ignored: no floor within {:.2}", probe);
        }
    }

    Ok(MovementReport { torque, jumped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_torque_follows_camera_basis() {
        let camera = CameraPose {
            forward: Vec3::new(0.0, -0.6, -0.8),
            right: Vec3::X,
            ..Default::default()
        };
        let config = MovementConfig::default();
        let input = MovementInput {
            vertical: 1.0,
            dt: 0.5,
            ..Default::default()
        };

        let torque = rolling_torque(&config, &camera, &input);
        assert_relative_eq!(torque.x, -50.0);
        assert_relative_eq!(torque.y, 0.0);
        assert_relative_eq!(torque.z, 0.0);

        let strafe = MovementInput {
            horizontal: 1.0,
            dt: 0.5,
            ..Default::default()
        };
        let torque = rolling_torque(&config, &camera, &strafe);
        assert_relative_eq!(torque.y, 0.0);
        assert_relative_eq!(torque.z, -40.0, epsilon = 1e-4);
    }

    #[test]
    fn test_no_input_no_torque() {
        let torque = rolling_torque(
            &MovementConfig::default(),
            &CameraPose::default(),
            &MovementInput {
                dt: 1.0 / 60.0,
                ..Default::default()
            },
        );
        assert_eq!(torque, Vec3::ZERO);
    }
}
