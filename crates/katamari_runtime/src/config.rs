//! Runtime Configuration
//!
//! Everything the headless driver needs: physics and cluster settings, the
//! arena layout and a scripted input pattern.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `KATAMARI_STEPS`, `KATAMARI_RESOLUTION`,
//!    `KATAMARI_STRATEGY`, `KATAMARI_SETTLE_FACTOR`, `KATAMARI_MAX_MASS_RATIO`
//! 2. Config file: `$KATAMARI_CONFIG`, else `katamari.toml` in the working
//!    directory when it exists
//! 3. Built-in defaults (a row of props ahead of the player)
//!
//! # Example Config File
//!
//! ```toml
//! steps = 900
//!
//! [cluster]
//! grid_resolution = 16
//! ray_strategy = "outward_farthest"
//! max_mass_ratio = 0.5
//!
//! [player]
//! position = { x = 0.0, y = 1.0, z = 0.0 }
//! mass = 10.0
//!
//! [[props]]
//! name = "apple"
//! position = { x = 3.0, y = 0.5, z = 0.0 }
//! radius = 0.5
//! mass = 1.0
//!
//! [input]
//! vertical = 1.0
//! jump_interval = 120
//! ```

use crate::error::{Result, RuntimeError};
use katamari_cluster::{ClusterConfig, LookInput, MovementInput, RayStrategy};
use katamari_math::Vec3;
use katamari_physics::PhysicsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "katamari.toml";

/// The player cluster at spawn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub position: Vec3,
    pub mass: f32,
    /// Radius of the core sphere the envelope starts from
    pub core_radius: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            mass: 10.0,
            core_radius: 1.0,
        }
    }
}

/// A loose ball in the arena
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropConfig {
    pub name: String,
    pub position: Vec3,
    pub radius: f32,
    pub mass: f32,
    /// Tag the prop so the cluster can pick it up
    pub mergeable: bool,
}

impl Default for PropConfig {
    fn default() -> Self {
        Self {
            name: "prop".to_string(),
            position: Vec3::ZERO,
            radius: 0.5,
            mass: 1.0,
            mergeable: true,
        }
    }
}

/// Input replayed every step by the headless driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputScript {
    pub horizontal: f32,
    pub vertical: f32,
    /// Jump every N steps, 0 never jumps
    pub jump_interval: u32,
    pub look_x: f32,
    pub look_y: f32,
}

impl Default for InputScript {
    fn default() -> Self {
        Self {
            horizontal: 0.0,
            vertical: 1.0,
            jump_interval: 0,
            look_x: 0.0,
            look_y: 0.0,
        }
    }
}

impl InputScript {
    /// Input for step `step` (0-based)
    pub fn input_at(&self, step: u32, dt: f32) -> (MovementInput, LookInput) {
        let jump = self.jump_interval > 0 && step > 0 && step % self.jump_interval == 0;
        (
            MovementInput {
                horizontal: self.horizontal,
                vertical: self.vertical,
                jump,
                dt,
            },
            LookInput {
                x: self.look_x,
                y: self.look_y,
            },
        )
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of fixed steps the driver runs
    pub steps: u32,
    /// Half extent of the square floor
    pub floor_half_extent: f32,
    pub physics: PhysicsConfig,
    pub cluster: ClusterConfig,
    pub player: PlayerConfig,
    pub props: Vec<PropConfig>,
    pub input: InputScript,
    /// Config file path (for diagnostics)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            steps: 600,
            floor_half_extent: 50.0,
            physics: PhysicsConfig::default(),
            cluster: ClusterConfig::default(),
            player: PlayerConfig::default(),
            props: default_props(),
            input: InputScript::default(),
            config_path: None,
        }
    }
}

/// A row of mergeable balls ahead of the player, growing in size, plus one
/// untagged post
fn default_props() -> Vec<PropConfig> {
    let mut props: Vec<PropConfig> = (0..8)
        .map(|i| {
            let radius = 0.3 + 0.05 * i as f32;
            PropConfig {
                name: format!("ball_{i}"),
                position: Vec3::new(-3.0 - 2.0 * i as f32, radius, 0.0),
                radius,
                mass: 0.5 + 0.25 * i as f32,
                mergeable: true,
            }
        })
        .collect();

    props.push(PropConfig {
        name: "post".to_string(),
        position: Vec3::new(0.0, 0.5, 6.0),
        radius: 0.5,
        mass: 50.0,
        mergeable: false,
    });
    props
}

impl RuntimeConfig {
    /// Load configuration from all sources
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("KATAMARI_CONFIG")
            .map(PathBuf::from)
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let mut config = match path {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                log::info!("Loaded config from {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RuntimeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml(&content).map_err(|source| RuntimeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `KATAMARI_*` overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("KATAMARI_STEPS") {
            self.steps = parse_override("KATAMARI_STEPS", &value)?;
        }

        if let Some(value) = lookup("KATAMARI_RESOLUTION") {
            self.cluster.grid_resolution = parse_override("KATAMARI_RESOLUTION", &value)?;
        }

        if let Some(value) = lookup("KATAMARI_STRATEGY") {
            self.cluster.ray_strategy = match value.to_lowercase().as_str() {
                "inward" | "inward_nearest" => RayStrategy::InwardNearest,
                "outward" | "outward_farthest" => RayStrategy::OutwardFarthest,
                _ => {
                    return Err(RuntimeError::InvalidOverride {
                        key: "KATAMARI_STRATEGY".to_string(),
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup("KATAMARI_SETTLE_FACTOR") {
            self.cluster.settle_factor = parse_override("KATAMARI_SETTLE_FACTOR", &value)?;
        }

        if let Some(value) = lookup("KATAMARI_MAX_MASS_RATIO") {
            self.cluster.max_mass_ratio = match value.as_str() {
                "" | "off" | "none" => None,
                _ => Some(parse_override("KATAMARI_MAX_MASS_RATIO", &value)?),
            };
        }

        Ok(())
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.physics.validate()?;
        self.cluster.validate()?;
        if !(self.player.mass > 0.0) || !(self.player.core_radius > 0.0) {
            return Err(RuntimeError::InvalidOverride {
                key: "player".to_string(),
                value: format!("mass {} / core_radius {}", self.player.mass, self.player.core_radius),
            });
        }
        Ok(())
    }

    /// Log a summary of the configuration
    pub fn log_summary(&self) {
        log::info!("=== Katamari Configuration ===");
        if let Some(path) = &self.config_path {
            log::info!("  Source:      {}", path.display());
        }
        log::info!("  Steps:       {} @ {:.4}s", self.steps, self.physics.timestep);
        log::info!(
            "  Envelope:    R={} {:?} max {:.0}",
            self.cluster.grid_resolution,
            self.cluster.ray_strategy,
            self.cluster.ray_max_distance
        );
        log::info!("  Settle:      /{}", self.cluster.settle_factor);
        log::info!("  Mass ratio:  {:?}", self.cluster.max_mass_ratio);
        log::info!("  Props:       {}", self.props.len());
        log::info!("==============================");
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| RuntimeError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.props.iter().filter(|p| p.mergeable).count(), 8);
    }

    #[test]
    fn test_partial_toml() {
        let config = RuntimeConfig::from_toml(
            r#"
            steps = 42

            [cluster]
            grid_resolution = 3
            ray_strategy = "outward_farthest"

            [[props]]
            name = "apple"
            position = { x = 2.0, y = 0.5, z = 0.0 }
            "#,
        )
        .unwrap();

        assert_eq!(config.steps, 42);
        assert_eq!(config.cluster.grid_resolution, 3);
        assert_eq!(config.cluster.ray_strategy, RayStrategy::OutwardFarthest);
        assert_eq!(config.cluster.settle_factor, 5.0);
        assert_eq!(config.props.len(), 1);
        assert_eq!(config.props[0].radius, 0.5);
        assert!(config.props[0].mergeable);
        assert_eq!(config.player.mass, 10.0);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("KATAMARI_STEPS", "10"),
            ("KATAMARI_RESOLUTION", "4"),
            ("KATAMARI_STRATEGY", "outward"),
            ("KATAMARI_MAX_MASS_RATIO", "0.75"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.steps, 10);
        assert_eq!(config.cluster.grid_resolution, 4);
        assert_eq!(config.cluster.ray_strategy, RayStrategy::OutwardFarthest);
        assert_eq!(config.cluster.max_mass_ratio, Some(0.75));
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut config = RuntimeConfig::default();
        let result = config.apply_overrides(|key| (key == "KATAMARI_STRATEGY").then(|| "sideways".to_string()));
        assert!(matches!(result, Err(RuntimeError::InvalidOverride { .. })));

        let result = config.apply_overrides(|key| (key == "KATAMARI_STEPS").then(|| "many".to_string()));
        assert!(matches!(result, Err(RuntimeError::InvalidOverride { .. })));
    }

    #[test]
    fn test_input_script() {
        let script = InputScript {
            jump_interval: 3,
            ..Default::default()
        };
        let jumps: Vec<bool> = (0..7).map(|s| script.input_at(s, 0.1).0.jump).collect();
        assert_eq!(jumps, [false, false, false, true, false, false, true]);
        assert_eq!(script.input_at(0, 0.1).0.vertical, 1.0);
    }
}
