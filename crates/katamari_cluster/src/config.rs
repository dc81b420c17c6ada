//! Cluster tuning parameters

use crate::error::{ClusterError, Result};
use katamari_math::Vec3;
use katamari_scene::CollisionLayer;
use serde::{Deserialize, Serialize};

/// How boundary rays are cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RayStrategy {
    /// From far outside back toward the origin, nearest hit
    #[default]
    InwardNearest,
    /// From the origin outward, farthest hit
    OutwardFarthest,
}

/// Rolling and jumping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Torque per unit of input per second
    pub movement_speed: f32,
    /// Upward force applied while jump is held over the floor
    pub jump_force: f32,
    /// Floor probe length beyond the cluster's boundary radius
    pub floor_distance: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            movement_speed: 100.0,
            jump_force: 50.0,
            floor_distance: 1.0,
        }
    }
}

/// Follow camera
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera offset from the cluster before orbiting
    pub offset: Vec3,
    /// Degrees of orbit per unit of horizontal look input
    pub rotation_speed: f32,
    /// Offset change per unit of vertical look input
    pub look_speed: f32,
    /// Clamp range for the offset's x and y components
    pub look_limits: (f32, f32),
    /// Extra zoom per unit of boundary radius (0 keeps a fixed distance)
    pub radius_zoom: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            offset: Vec3::new(2.0, 7.0, 0.0),
            rotation_speed: 1.0,
            look_speed: 1.0,
            look_limits: (0.0, 10.0),
            radius_zoom: 0.0,
        }
    }
}

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Samples per axis of the latitude/longitude grid (R); R² rays per regeneration
    pub grid_resolution: usize,
    /// Divisor applied to an absorbed object's offset from the origin
    pub settle_factor: f32,
    /// Length of the sampling rays
    pub ray_max_distance: f32,
    pub ray_strategy: RayStrategy,
    /// Connect the samples into triangles; otherwise install a point cloud
    pub triangulate: bool,
    /// Also hand the envelope to the host as the visible mesh
    pub install_visual_mesh: bool,
    /// Tag marking nodes eligible for absorption
    pub mergeable_tag: String,
    /// Layer the cluster and everything it absorbs live on
    pub cluster_layer: CollisionLayer,
    /// Reject objects heavier than this multiple of the cluster's mass
    pub max_mass_ratio: Option<f32>,
    pub movement: MovementConfig,
    pub camera: CameraConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 12,
            settle_factor: 5.0,
            ray_max_distance: 10_000.0,
            ray_strategy: RayStrategy::InwardNearest,
            triangulate: true,
            install_visual_mesh: true,
            mergeable_tag: "Mergeable".to_string(),
            cluster_layer: CollisionLayer::PLAYER,
            max_mass_ratio: None,
            movement: MovementConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl ClusterConfig {
    /// Set grid resolution
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.grid_resolution = resolution;
        self
    }

    /// Set ray strategy
    pub fn with_strategy(mut self, strategy: RayStrategy) -> Self {
        self.ray_strategy = strategy;
        self
    }

    /// Set the maximum ray distance
    pub fn with_ray_max_distance(mut self, distance: f32) -> Self {
        self.ray_max_distance = distance;
        self
    }

    /// Enable the mass-ratio rejection policy
    pub fn with_max_mass_ratio(mut self, ratio: f32) -> Self {
        self.max_mass_ratio = Some(ratio);
        self
    }

    /// Check parameters before any sampling happens
    pub fn validate(&self) -> Result<()> {
        if self.grid_resolution < 2 {
            return Err(ClusterError::InvalidConfig(format!(
                "grid_resolution must be at least 2, got {}",
                self.grid_resolution
            )));
        }
        if !(self.settle_factor > 0.0) {
            return Err(ClusterError::InvalidConfig(format!(
                "settle_factor must be positive, got {}",
                self.settle_factor
            )));
        }
        if !(self.ray_max_distance > 0.0) || !self.ray_max_distance.is_finite() {
            return Err(ClusterError::InvalidConfig(format!(
                "ray_max_distance must be positive and finite, got {}",
                self.ray_max_distance
            )));
        }
        if self.movement.floor_distance < 0.0 {
            return Err(ClusterError::InvalidConfig("floor_distance must not be negative".into()));
        }
        if let Some(ratio) = self.max_mass_ratio {
            if !(ratio > 0.0) {
                return Err(ClusterError::InvalidConfig(format!(
                    "max_mass_ratio must be positive, got {ratio}"
                )));
            }
        }
        let (low, high) = self.camera.look_limits;
        if !low.is_finite() || !high.is_finite() {
            return Err(ClusterError::InvalidConfig(format!(
                "look_limits must be finite, got ({low}, {high})"
            )));
        }
        if low > high {
            return Err(ClusterError::InvalidConfig(format!(
                "look_limits are inverted: ({low}, {high})"
            )));
        }
        Ok(())
    }
}
