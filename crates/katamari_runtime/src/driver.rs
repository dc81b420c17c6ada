//! Headless driver loop
//!
//! Builds the arena from a [`RuntimeConfig`] and runs the cluster's
//! lifecycle phases in fixed steps: simulate, roll and absorb, then move
//! the camera.

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::world::GameWorld;
use katamari_cluster::{CameraPose, Cluster, StepReport};
use katamari_math::Vec3;
use katamari_physics::ColliderShape;
use katamari_scene::{CollisionLayer, NodeDesc, NodeHandle, SceneGraph};

/// Outcome of one driver step
#[derive(Debug, Clone)]
pub struct TickReport {
    pub step: u32,
    pub cluster: StepReport,
    pub camera: CameraPose,
    pub position: Vec3,
}

/// Totals after a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u32,
    pub merges: u32,
    pub jumps: u32,
    pub mass: f32,
    pub max_radius: f32,
    pub final_position: Vec3,
}

/// Owns the world and the cluster and advances both
pub struct Driver {
    config: RuntimeConfig,
    world: GameWorld,
    cluster: Cluster,
    props: Vec<NodeHandle>,
    step: u32,
    jumps: u32,
}

impl Driver {
    /// Build the arena, spawn the player and generate its first envelope
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let mut world = GameWorld::new(config.physics.clone());

        let extent = config.floor_half_extent;
        world.spawn_static(
            NodeDesc::new("floor")
                .with_position(Vec3::new(0.0, -0.5, 0.0))
                .with_layer(CollisionLayer::ENVIRONMENT),
            ColliderShape::cuboid(extent, 0.5, extent),
        )?;

        let mut props = Vec::with_capacity(config.props.len());
        for prop in &config.props {
            let mut desc = NodeDesc::new(prop.name.clone())
                .with_position(prop.position)
                .with_layer(CollisionLayer::PROPS);
            if prop.mergeable {
                desc = desc.with_tag(config.cluster.mergeable_tag.clone());
            }
            props.push(world.spawn_dynamic(desc, ColliderShape::sphere(prop.radius), prop.mass)?);
        }

        let (root, core) = world.spawn_player(
            NodeDesc::new("player")
                .with_position(config.player.position)
                .with_layer(config.cluster.cluster_layer),
            config.player.core_radius,
            config.player.mass,
        )?;

        let mut cluster = Cluster::new(root, config.cluster.clone())?.with_core(core);
        cluster.on_spawn(&mut world)?;

        log::info!(
            "Arena ready: {} props, player at {:?}",
            props.len(),
            config.player.position
        );

        Ok(Self {
            config,
            world,
            cluster,
            props,
            step: 0,
            jumps: 0,
        })
    }

    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut GameWorld {
        &mut self.world
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// Prop nodes in config order
    pub fn props(&self) -> &[NodeHandle] {
        &self.props
    }

    /// Run one fixed step with the scripted input
    pub fn tick(&mut self) -> Result<TickReport> {
        let dt = self.config.physics.timestep;
        let (input, look) = self.config.input.input_at(self.step, dt);

        let contacts = self.world.step(dt, self.cluster.root())?;
        let report = self.cluster.on_physics_step(&mut self.world, &input, &contacts)?;
        let camera = self.cluster.on_late_step(&self.world, look)?;

        if report.movement.jumped {
            self.jumps += 1;
        }
        for outcome in &report.merges {
            log::debug!("Step {}: {:?}", self.step, outcome);
        }

        let position = self.world.world_transform_of(self.cluster.root())?.position;
        let tick = TickReport {
            step: self.step,
            cluster: report,
            camera,
            position,
        };
        self.step += 1;
        Ok(tick)
    }

    /// Run the configured number of steps
    pub fn run(&mut self) -> Result<RunSummary> {
        for _ in 0..self.config.steps {
            let tick = self.tick()?;
            if tick.cluster.absorbed() > 0 {
                log::info!(
                    "Step {}: absorbed {} ({} total), mass {:.2}, radius {:.2}",
                    tick.step,
                    tick.cluster.absorbed(),
                    self.cluster.merge_count(),
                    self.cluster.mass(),
                    self.cluster.max_radius()
                );
            }
        }
        self.summary()
    }

    pub fn summary(&self) -> Result<RunSummary> {
        Ok(RunSummary {
            steps: self.step,
            merges: self.cluster.merge_count(),
            jumps: self.jumps,
            mass: self.cluster.mass(),
            max_radius: self.cluster.max_radius(),
            final_position: self.world.world_transform_of(self.cluster.root())?.position,
        })
    }
}
