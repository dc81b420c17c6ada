//! Surface materials

use serde::{Deserialize, Serialize};

/// Friction, bounce and density of a collider surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    pub friction: f32,
    pub restitution: f32,
    /// Mass per unit volume. Bodies whose mass is set explicitly use 0 here
    /// so their colliders add nothing on top.
    pub density: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
            density: 1.0,
        }
    }
}

impl PhysicsMaterial {
    /// High grip so torque turns into rolling instead of spinning in place
    pub fn rubber() -> Self {
        Self {
            friction: 0.9,
            restitution: 0.2,
            density: 1.1,
        }
    }

    /// Floors and walls
    pub fn stone() -> Self {
        Self {
            friction: 0.7,
            restitution: 0.1,
            density: 2.5,
        }
    }

    /// Negative densities are clamped to zero (massless)
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density.max(0.0);
        self
    }
}
