//! Simulation settings

use crate::error::{PhysicsError, Result};
use serde::{Deserialize, Serialize};

/// Simulation settings, loadable from the runtime config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: [f32; 3],

    /// Seconds per rapier step
    pub timestep: f32,

    /// Cap on rapier steps per `PhysicsWorld::step` call
    pub max_substeps: u32,

    pub velocity_iterations: usize,

    /// Let resting bodies sleep
    pub sleeping_enabled: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            timestep: 1.0 / 60.0,
            max_substeps: 4,
            velocity_iterations: 4,
            sleeping_enabled: true,
        }
    }
}

impl PhysicsConfig {
    pub fn with_gravity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.gravity = [x, y, z];
        self
    }

    pub fn with_timestep(mut self, timestep: f32) -> Self {
        self.timestep = timestep;
        self
    }

    /// Reject values the solver cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.timestep > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidConfig("max_substeps must be at least 1".into()));
        }
        if self.velocity_iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "velocity_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
