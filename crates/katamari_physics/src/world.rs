//! Physics world - main simulation container

use crate::body::{RigidBodyDesc, RigidBodyHandle, RigidBodyType};
use crate::collider::{ColliderDesc, ColliderHandle, ColliderShape};
use crate::config::PhysicsConfig;
use crate::convert;
use crate::error::{PhysicsError, Result};
use crate::events::{CollisionEvent, CollisionEventType, EventCollector};
use crate::groups::CollisionGroups;
use crate::query::PhysicsQuery;
use katamari_math::{Aabb, Transform, Vec3};
use rapier3d::prelude as rapier;
use std::num::NonZeroUsize;

/// Rapier simulation state behind handle-based accessors
pub struct PhysicsWorld {
    config: PhysicsConfig,
    pipeline: rapier::PhysicsPipeline,
    gravity: rapier::Vector<f32>,
    integration_params: rapier::IntegrationParameters,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    query_pipeline: rapier::QueryPipeline,
    /// Set whenever colliders move, toggle or change shape outside a step
    query_stale: bool,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,
    events: EventCollector,
    /// Unsimulated time carried to the next `step`
    accumulated_time: f32,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        let gravity = rapier::Vector::new(config.gravity[0], config.gravity[1], config.gravity[2]);

        let mut integration_params = rapier::IntegrationParameters::default();
        integration_params.dt = config.timestep;
        integration_params.num_solver_iterations =
            NonZeroUsize::new(config.velocity_iterations).unwrap_or(NonZeroUsize::MIN);

        Self {
            config,
            pipeline: rapier::PhysicsPipeline::new(),
            gravity,
            integration_params,
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            query_pipeline: rapier::QueryPipeline::new(),
            query_stale: false,
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            events: EventCollector::new(),
            accumulated_time: 0.0,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    // ==================== Rigid Bodies ====================

    /// Insert a body; its mass starts out as whatever its colliders give
    pub fn create_rigid_body(&mut self, desc: RigidBodyDesc) -> RigidBodyHandle {
        let builder = desc.to_rapier_builder(self.config.sleeping_enabled);
        let handle = self.bodies.insert(builder);
        self.refresh_mass(handle);
        RigidBodyHandle(handle)
    }

    fn body(&self, handle: RigidBodyHandle) -> Result<&rapier::RigidBody> {
        self.bodies.get(handle.0).ok_or(PhysicsError::BodyNotFound(handle))
    }

    fn body_mut(&mut self, handle: RigidBodyHandle) -> Result<&mut rapier::RigidBody> {
        self.bodies.get_mut(handle.0).ok_or(PhysicsError::BodyNotFound(handle))
    }

    /// Mass properties are otherwise only refreshed on the next step
    fn refresh_mass(&mut self, handle: rapier::RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.recompute_mass_properties_from_colliders(&self.colliders);
        }
    }

    /// World pose of a body
    pub fn body_transform(&self, handle: RigidBodyHandle) -> Result<Transform> {
        self.body(handle).map(|b| convert::from_isometry(b.position()))
    }

    /// Teleport a body and its colliders.
    ///
    /// Collider world poses are written immediately so that queries issued
    /// before the next step see the body where it now is.
    pub fn set_body_transform(&mut self, handle: RigidBodyHandle, transform: &Transform) -> Result<()> {
        let iso = convert::isometry(transform);

        let body = self.bodies.get_mut(handle.0).ok_or(PhysicsError::BodyNotFound(handle))?;
        body.set_position(iso, true);
        if body.is_kinematic() {
            body.set_next_kinematic_position(iso);
        }

        for collider_handle in body.colliders() {
            if let Some(collider) = self.colliders.get_mut(*collider_handle) {
                if let Some(relative) = collider.position_wrt_parent().copied() {
                    collider.set_position(iso * relative);
                }
            }
        }

        self.query_stale = true;
        Ok(())
    }

    pub fn body_type(&self, handle: RigidBodyHandle) -> Result<RigidBodyType> {
        self.body(handle).map(|b| b.body_type().into())
    }

    /// Switch the body type, waking it up
    pub fn set_body_type(&mut self, handle: RigidBodyHandle, body_type: RigidBodyType) -> Result<()> {
        self.body_mut(handle)?.set_body_type(body_type.into(), true);
        Ok(())
    }

    /// Total mass of the body
    pub fn body_mass(&self, handle: RigidBodyHandle) -> Result<f32> {
        self.body(handle).map(|b| b.mass())
    }

    /// Override the body's mass as a solid ball of the given radius.
    ///
    /// Collider densities still contribute; bodies driven this way should
    /// carry massless colliders.
    pub fn set_body_mass(&mut self, handle: RigidBodyHandle, mass: f32, radius: f32) -> Result<()> {
        if !(mass > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!("body mass must be positive, got {mass}")));
        }

        let radius = radius.max(0.1);
        let inertia = 0.4 * mass * radius * radius;
        let props = rapier::MassProperties::new(
            rapier::Point::origin(),
            mass,
            rapier::Vector::new(inertia, inertia, inertia),
        );

        let body = self.bodies.get_mut(handle.0).ok_or(PhysicsError::BodyNotFound(handle))?;
        body.set_additional_mass_properties(props, true);
        body.recompute_mass_properties_from_colliders(&self.colliders);
        Ok(())
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Result<Vec3> {
        self.body(handle).map(|b| convert::from_vector(b.linvel()))
    }

    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) -> Result<()> {
        self.body_mut(handle)?.set_linvel(convert::vector(velocity), true);
        Ok(())
    }

    /// Force accumulated until the next step, waking the body
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vec3) -> Result<()> {
        self.body_mut(handle)?.add_force(convert::vector(force), true);
        Ok(())
    }

    pub fn apply_torque(&mut self, handle: RigidBodyHandle, torque: Vec3) -> Result<()> {
        self.body_mut(handle)?.add_torque(convert::vector(torque), true);
        Ok(())
    }

    // ==================== Colliders ====================

    /// Create a collider, optionally attached to a rigid body
    pub fn create_collider(
        &mut self,
        desc: ColliderDesc,
        parent: Option<RigidBodyHandle>,
    ) -> Result<ColliderHandle> {
        let builder = desc.to_rapier_builder()?;
        let handle = match parent {
            Some(body) => {
                self.body(body)?;
                let handle = self.colliders.insert_with_parent(builder, body.0, &mut self.bodies);
                self.refresh_mass(body.0);
                handle
            }
            None => self.colliders.insert(builder),
        };
        self.query_stale = true;
        Ok(ColliderHandle(handle))
    }

    /// Remove a collider
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.colliders.remove(handle.0, &mut self.islands, &mut self.bodies, true);
        self.query_stale = true;
    }

    fn collider_mut(&mut self, handle: ColliderHandle) -> Result<&mut rapier::Collider> {
        self.colliders
            .get_mut(handle.0)
            .ok_or(PhysicsError::ColliderNotFound(handle))
    }

    /// Colliders attached to a body
    pub fn body_colliders(&self, handle: RigidBodyHandle) -> Result<Vec<ColliderHandle>> {
        self.body(handle)
            .map(|b| b.colliders().iter().copied().map(ColliderHandle).collect())
    }

    /// Whether the collider takes part in contacts and queries
    pub fn collider_enabled(&self, handle: ColliderHandle) -> Result<bool> {
        self.colliders
            .get(handle.0)
            .map(|c| c.is_enabled())
            .ok_or(PhysicsError::ColliderNotFound(handle))
    }

    /// Enable or disable a collider
    pub fn set_collider_enabled(&mut self, handle: ColliderHandle, enabled: bool) -> Result<()> {
        self.collider_mut(handle)?.set_enabled(enabled);
        self.query_stale = true;
        Ok(())
    }

    /// Replace a collider's shape in place
    pub fn set_collider_shape(&mut self, handle: ColliderHandle, shape: &ColliderShape) -> Result<()> {
        let shape = shape.to_rapier()?;
        self.collider_mut(handle)?.set_shape(shape);
        self.query_stale = true;
        Ok(())
    }

    /// Change collision groups of a collider
    pub fn set_collider_groups(&mut self, handle: ColliderHandle, groups: CollisionGroups) -> Result<()> {
        self.collider_mut(handle)?.set_collision_groups(groups.to_rapier());
        Ok(())
    }

    /// World-space bounds of a collider at its current pose
    pub fn collider_aabb(&self, handle: ColliderHandle) -> Result<Aabb> {
        let aabb = self
            .colliders
            .get(handle.0)
            .ok_or(PhysicsError::ColliderNotFound(handle))?
            .compute_aabb();
        Ok(Aabb::new(convert::from_point(&aabb.mins), convert::from_point(&aabb.maxs)))
    }

    /// User data stored on a collider
    pub fn collider_user_data(&self, handle: ColliderHandle) -> Result<u128> {
        self.colliders
            .get(handle.0)
            .map(|c| c.user_data)
            .ok_or(PhysicsError::ColliderNotFound(handle))
    }

    // ==================== Simulation ====================

    /// Step the physics simulation with fixed timestep
    ///
    /// Collision events from every substep of this call are kept until the
    /// next call.
    pub fn step(&mut self, delta_time: f32) {
        self.events.clear();
        self.accumulated_time += delta_time;

        let mut steps = 0;
        while self.accumulated_time >= self.config.timestep && steps < self.config.max_substeps {
            self.step_internal();
            self.accumulated_time -= self.config.timestep;
            steps += 1;
        }

            self.sync_query_pipeline();
    }

    /// Rebuild the query pipeline from the current collider poses.
    pub fn sync_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.colliders);
        self.query_stale = false;
    }

    /// Whether colliders changed since the query pipeline was last rebuilt
    pub fn query_is_stale(&self) -> bool {
        self.query_stale
    }

    /// One fixed-size rapier step, recording its collision events
    fn step_internal(&mut self) {
        let (collision_send, collision_recv) = crossbeam_channel::unbounded();
        let (contact_force_send, _contact_force_recv) = crossbeam_channel::unbounded();
        let event_handler = rapier::ChannelEventCollector::new(collision_send, contact_force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        while let Ok(event) = collision_recv.try_recv() {
            let (h1, h2, started) = match event {
                rapier::CollisionEvent::Started(h1, h2, _) => (h1, h2, true),
                rapier::CollisionEvent::Stopped(h1, h2, _) => (h1, h2, false),
            };

            let c1 = self.colliders.get(h1);
            let c2 = self.colliders.get(h2);

            let is_sensor = c1.map(|c| c.is_sensor()).unwrap_or(false)
                || c2.map(|c| c.is_sensor()).unwrap_or(false);

            self.events.collision_events.push(CollisionEvent {
                collider1: ColliderHandle(h1),
                collider2: ColliderHandle(h2),
                event_type: if started {
                    CollisionEventType::Started
                } else {
                    CollisionEventType::Stopped
                },
                is_sensor,
                user_data1: c1.map(|c| c.user_data).unwrap_or(0),
                user_data2: c2.map(|c| c.user_data).unwrap_or(0),
            });
        }
    }

    // ==================== Queries ====================

    /// Ray queries against the last synced collider poses.
    ///
    /// Call [`PhysicsWorld::sync_query_pipeline`] first when
    /// [`PhysicsWorld::query_is_stale`] reports changes made since the last step.
    pub fn query(&self) -> PhysicsQuery<'_> {
        PhysicsQuery {
            query_pipeline: &self.query_pipeline,
            colliders: &self.colliders,
            bodies: &self.bodies,
        }
    }

    // ==================== Events ====================

    /// Every event from the last `step` call
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.events.collision_events
    }

    pub fn collision_started(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events.started_collisions()
    }

    // ==================== Debug ====================

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}
