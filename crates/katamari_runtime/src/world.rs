//! Game world: scene graph plus rapier simulation
//!
//! Every scene node owns at most one rigid body and at most one collider.
//! A collider on a node without its own body hangs off the nearest ancestor
//! that has one. Colliders carry their node's handle bits as user data so
//! ray hits and collision events map straight back to nodes.
//!
//! The scene is authoritative for kinematic bodies (absorbed members are
//! carried by the hierarchy); the simulation is authoritative for dynamic
//! ones, whose poses are written back to the scene after every step.

use katamari_cluster::{ClusterError, Envelope, EnvelopeShape, PhysicsHost, RayHit};
use katamari_math::{Aabb, Transform, Vec3};
use katamari_physics::prelude::*;
use katamari_scene::{CollisionLayer, CollisionMatrix, NodeDesc, NodeHandle, Scene, SceneGraph};
use std::collections::HashMap;

/// Radius used for inertia when a shape gives no better estimate
const DEFAULT_INERTIA_RADIUS: f32 = 0.5;

/// Render-side copy of an installed envelope
#[derive(Debug, Clone, Default)]
pub struct EnvelopeMesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Empty for point-cloud envelopes
    pub indices: Vec<u32>,
}

/// Scene and physics kept in step, exposed to the cluster as its host
pub struct GameWorld {
    scene: Scene,
    physics: PhysicsWorld,
    layers: CollisionMatrix,
    /// Node to body mapping
    bodies: HashMap<NodeHandle, RigidBodyHandle>,
    /// Node to collider mapping
    colliders: HashMap<NodeHandle, ColliderHandle>,
    /// Ball radius used for each body's inertia
    inertia_radius: HashMap<NodeHandle, f32>,
    visual_meshes: HashMap<NodeHandle, EnvelopeMesh>,
}

impl GameWorld {
    /// Create an empty world
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            scene: Scene::new(),
            physics: PhysicsWorld::new(config),
            layers: CollisionMatrix::default(),
            bodies: HashMap::new(),
            colliders: HashMap::new(),
            inertia_radius: HashMap::new(),
            visual_meshes: HashMap::new(),
        }
    }

    /// Replace the layer rules used for collider groups
    pub fn with_layers(mut self, layers: CollisionMatrix) -> Self {
        self.layers = layers;
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn layers(&self) -> &CollisionMatrix {
        &self.layers
    }

    pub fn body_of(&self, node: NodeHandle) -> Option<RigidBodyHandle> {
        self.bodies.get(&node).copied()
    }

    pub fn collider_of(&self, node: NodeHandle) -> Option<ColliderHandle> {
        self.colliders.get(&node).copied()
    }

    /// Mesh installed by the last visual envelope update
    pub fn visual_mesh(&self, node: NodeHandle) -> Option<&EnvelopeMesh> {
        self.visual_meshes.get(&node)
    }

    /// Collision groups for a node on `layer`
    pub fn groups_for(&self, layer: CollisionLayer) -> CollisionGroups {
        CollisionGroups::new(layer.as_mask(), self.layers.filter_mask(layer))
    }

    /// Node a collider belongs to
    pub fn node_of_collider(&self, collider: ColliderHandle) -> Option<NodeHandle> {
        let bits = self.physics.collider_user_data(collider).ok()?;
        let node = NodeHandle::from_bits(bits as u64);
        self.scene.contains(node).then_some(node)
    }

    // ==================== Spawning ====================

    /// Spawn a node with a fixed body (floor, walls)
    pub fn spawn_static(&mut self, desc: NodeDesc, shape: ColliderShape) -> Result<NodeHandle> {
        let node = self.scene.spawn(desc);
        self.create_body(node, RigidBodyDesc::fixed())?;
        self.add_collider(node, ColliderDesc::new(shape).with_material(PhysicsMaterial::stone()))?;
        Ok(node)
    }

    /// Spawn a node with a dynamic body of the given mass.
    ///
    /// The collider is massless; mass and inertia come from `mass` and the
    /// shape's bounding radius.
    pub fn spawn_dynamic(&mut self, desc: NodeDesc, shape: ColliderShape, mass: f32) -> Result<NodeHandle> {
        let node = self.scene.spawn(desc);
        let body = self.create_body(node, RigidBodyDesc::dynamic())?;

        let radius = inertia_radius(&shape);
        self.add_collider(
            node,
            ColliderDesc::new(shape).with_material(PhysicsMaterial::default().with_density(0.0)),
        )?;

        self.physics.set_body_mass(body, mass, radius)?;
        self.inertia_radius.insert(node, radius);
        Ok(node)
    }

    /// Spawn the player: a dynamic root carrying the envelope collider, and
    /// a core child whose sphere seeds the first envelope.
    ///
    /// Returns `(root, core)`.
    pub fn spawn_player(&mut self, desc: NodeDesc, core_radius: f32, mass: f32) -> Result<(NodeHandle, NodeHandle)> {
        let root = self.scene.spawn(desc);
        let body = self.create_body(root, RigidBodyDesc::dynamic().with_damping(0.05, 0.2))?;

        let massless = PhysicsMaterial::rubber().with_density(0.0);
        self.add_collider(
            root,
            ColliderDesc::new(ColliderShape::sphere(core_radius))
                .with_material(massless)
                .with_collision_events(true),
        )?;

        let layer = self.scene.layer_of(root)?;
        let core = self.scene.spawn(NodeDesc::new("core").with_parent(root).with_layer(layer));
        self.add_collider(
            core,
            ColliderDesc::new(ColliderShape::sphere(core_radius)).with_material(massless),
        )?;

        self.physics.set_body_mass(body, mass, core_radius)?;
        self.inertia_radius.insert(root, core_radius);
        Ok((root, core))
    }

    fn create_body(&mut self, node: NodeHandle, desc: RigidBodyDesc) -> Result<RigidBodyHandle> {
        let world = self.scene.world_transform(node)?;
        let body = self
            .physics
            .create_rigid_body(desc.with_position(world.position).with_rotation(world.rotation));
        self.bodies.insert(node, body);
        Ok(body)
    }

    /// Attach a collider to `node`, hung off the nearest body at or above it.
    ///
    /// Groups come from the node's layer and user data from its handle; both
    /// override whatever `desc` carries.
    pub fn add_collider(&mut self, node: NodeHandle, desc: ColliderDesc) -> Result<ColliderHandle> {
        let (owner, body) = self.owning_body(node)?;

        let mut desc = desc;
        desc.offset = self
            .scene
            .world_transform(owner)?
            .inverse()
            .combine(&self.scene.world_transform(node)?);
        desc.collision_groups = self.groups_for(self.scene.layer_of(node)?);
        desc.user_data = node.to_bits() as u128;

        let collider = self.physics.create_collider(desc, body)?;
        if let Some(previous) = self.colliders.insert(node, collider) {
            log::warn!("Node {:?} already had a collider; replacing it", node);
            self.physics.remove_collider(previous);
        }
        Ok(collider)
    }

    /// Nearest node at or above `node` that owns a body, with that body.
    /// Nodes with no body anywhere above them get a free collider.
    fn owning_body(&self, node: NodeHandle) -> Result<(NodeHandle, Option<RigidBodyHandle>)> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(&body) = self.bodies.get(&n) {
                return Ok((n, Some(body)));
            }
            current = self.scene.parent_of(n)?;
        }
        Ok((node, None))
    }

    // ==================== Simulation ====================

    /// Advance the simulation and return every node that started touching
    /// `watch` during the step, in event order.
    pub fn step(&mut self, dt: f32, watch: NodeHandle) -> Result<Vec<NodeHandle>> {
        self.push_kinematic_poses()?;
        self.physics.step(dt);
        self.pull_dynamic_poses()?;
        self.push_kinematic_poses()?;

        let watched = watch.to_bits() as u128;
        let mut contacts = Vec::new();
        for event in self.physics.collision_started() {
            if event.is_sensor {
                continue;
            }
            let Some(bits) = event.other(watched) else {
                continue;
            };
            let other = NodeHandle::from_bits(bits as u64);
            if self.scene.contains(other) && !contacts.contains(&other) {
                contacts.push(other);
            }
        }
        Ok(contacts)
    }

    /// Teleport kinematic bodies to their scene poses
    fn push_kinematic_poses(&mut self) -> Result<()> {
        for (&node, &body) in &self.bodies {
            if self.physics.body_type(body)?.is_kinematic() {
                let world = self.scene.world_transform(node)?;
                self.physics.set_body_transform(body, &world)?;
            }
        }
        Ok(())
    }

    /// Copy dynamic body poses into the scene
    fn pull_dynamic_poses(&mut self) -> Result<()> {
        for (&node, &body) in &self.bodies {
            if self.physics.body_type(body)? == RigidBodyType::Dynamic {
                let pose = self.physics.body_transform(body)?;
                self.scene.set_world_transform(node, pose)?;
            }
        }
        Ok(())
    }

    /// Teleport every body in a subtree (root included) to its scene pose
    fn push_subtree_poses(&mut self, root: NodeHandle) -> katamari_scene::Result<()> {
        for node in self.scene.descendants(root)? {
            let Some(&body) = self.bodies.get(&node) else {
                continue;
            };
            let world = self.scene.world_transform(node)?;
            if let Err(e) = self.physics.set_body_transform(body, &world) {
                log::warn!("Failed to move body of {:?}: {}", node, e);
            }
        }
        Ok(())
    }

    fn body_handle(&self, node: NodeHandle) -> katamari_cluster::Result<RigidBodyHandle> {
        self.body_of(node).ok_or(ClusterError::MissingBody(node))
    }

    fn collider_handle(&self, node: NodeHandle) -> katamari_cluster::Result<ColliderHandle> {
        self.collider_of(node)
            .ok_or_else(|| ClusterError::Host(format!("node {:?} has no collider", node)))
    }
}

type Result<T> = crate::error::Result<T>;

fn host_error(e: PhysicsError) -> ClusterError {
    ClusterError::Host(e.to_string())
}

fn inertia_radius(shape: &ColliderShape) -> f32 {
    match shape {
        ColliderShape::Sphere { radius } => *radius,
        ColliderShape::Box { half_extents } => Vec3::from_array(*half_extents).length(),
        _ => DEFAULT_INERTIA_RADIUS,
    }
}

impl SceneGraph for GameWorld {
    fn contains_node(&self, node: NodeHandle) -> bool {
        self.scene.contains_node(node)
    }

    fn parent_of(&self, node: NodeHandle) -> katamari_scene::Result<Option<NodeHandle>> {
        self.scene.parent_of(node)
    }

    fn children_of(&self, node: NodeHandle) -> katamari_scene::Result<Vec<NodeHandle>> {
        self.scene.children_of(node)
    }

    fn world_transform_of(&self, node: NodeHandle) -> katamari_scene::Result<Transform> {
        self.scene.world_transform_of(node)
    }

    fn move_to(&mut self, node: NodeHandle, position: Vec3) -> katamari_scene::Result<()> {
        self.scene.move_to(node, position)?;
        self.push_subtree_poses(node)
    }

    fn attach_to(&mut self, node: NodeHandle, parent: Option<NodeHandle>) -> katamari_scene::Result<()> {
        self.scene.attach_to(node, parent)?;
        self.push_subtree_poses(node)
    }

    fn create_child(&mut self, parent: NodeHandle, name: &str) -> katamari_scene::Result<NodeHandle> {
        self.scene.create_child(parent, name)
    }

    fn node_has_tag(&self, node: NodeHandle, tag: &str) -> bool {
        self.scene.node_has_tag(node, tag)
    }

    fn layer_of(&self, node: NodeHandle) -> katamari_scene::Result<CollisionLayer> {
        self.scene.layer_of(node)
    }

    fn assign_layer(&mut self, node: NodeHandle, layer: CollisionLayer) -> katamari_scene::Result<()> {
        self.scene.assign_layer(node, layer)?;
        if let Some(collider) = self.collider_of(node) {
            let groups = self.groups_for(layer);
            if let Err(e) = self.physics.set_collider_groups(collider, groups) {
                log::warn!("Failed to update collision groups of {:?}: {}", node, e);
            }
        }
        Ok(())
    }
}

impl PhysicsHost for GameWorld {
    fn cast_ray(&mut self, origin: Vec3, direction: Vec3, max_distance: f32, layer_mask: u32) -> Vec<RayHit> {
        if self.physics.query_is_stale() {
            self.physics.sync_query_pipeline();
        }

        // Hollow: a ray starting inside a collider reports where it leaves
        let options = RaycastOptions::default()
            .with_max_distance(max_distance)
            .with_layer_mask(layer_mask)
            .with_solid(false);

        self.physics
            .query()
            .raycast_all(origin, direction, &options)
            .into_iter()
            .map(|hit| RayHit {
                point: hit.point,
                distance: hit.distance,
                node: self.node_of_collider(hit.collider),
            })
            .collect()
    }

    fn body_mass(&self, node: NodeHandle) -> Option<f32> {
        self.physics.body_mass(self.body_of(node)?).ok()
    }

    fn is_kinematic(&self, node: NodeHandle) -> bool {
        self.body_of(node)
            .and_then(|body| self.physics.body_type(body).ok())
            .is_some_and(|t| t.is_kinematic())
    }

    fn set_kinematic(&mut self, node: NodeHandle, kinematic: bool) -> katamari_cluster::Result<()> {
        let body = self.body_handle(node)?;
        let body_type = if kinematic {
            RigidBodyType::KinematicPositionBased
        } else {
            RigidBodyType::Dynamic
        };
        self.physics.set_body_type(body, body_type).map_err(host_error)
    }

    fn set_body_mass(&mut self, node: NodeHandle, mass: f32) -> katamari_cluster::Result<()> {
        let body = self.body_handle(node)?;
        let radius = self
            .inertia_radius
            .get(&node)
            .copied()
            .unwrap_or(DEFAULT_INERTIA_RADIUS);
        self.physics.set_body_mass(body, mass, radius).map_err(host_error)
    }

    fn linear_velocity(&self, node: NodeHandle) -> katamari_cluster::Result<Vec3> {
        let body = self.body_handle(node)?;
        self.physics.linear_velocity(body).map_err(host_error)
    }

    fn set_linear_velocity(&mut self, node: NodeHandle, velocity: Vec3) -> katamari_cluster::Result<()> {
        let body = self.body_handle(node)?;
        self.physics.set_linear_velocity(body, velocity).map_err(host_error)
    }

    fn add_force(&mut self, node: NodeHandle, force: Vec3) -> katamari_cluster::Result<()> {
        let body = self.body_handle(node)?;
        self.physics.apply_force(body, force).map_err(host_error)
    }

    fn add_torque(&mut self, node: NodeHandle, torque: Vec3) -> katamari_cluster::Result<()> {
        let body = self.body_handle(node)?;
        self.physics.apply_torque(body, torque).map_err(host_error)
    }

    fn has_collider(&self, node: NodeHandle) -> bool {
        self.colliders.contains_key(&node)
    }

    fn collider_bounds(&self, node: NodeHandle) -> Option<Aabb> {
        self.physics.collider_aabb(self.collider_of(node)?).ok()
    }

    fn collider_enabled(&self, node: NodeHandle) -> katamari_cluster::Result<bool> {
        let collider = self.collider_handle(node)?;
        self.physics.collider_enabled(collider).map_err(host_error)
    }

    fn set_collider_enabled(&mut self, node: NodeHandle, enabled: bool) -> katamari_cluster::Result<()> {
        let collider = self.collider_handle(node)?;
        self.physics.set_collider_enabled(collider, enabled).map_err(host_error)
    }

    fn install_envelope(&mut self, node: NodeHandle, envelope: &Envelope, visual: bool) -> katamari_cluster::Result<()> {
        let collider = self.collider_handle(node)?;

        let shape = match &envelope.shape {
            EnvelopeShape::TriMesh { indices } => ColliderShape::trimesh(&envelope.vertices, indices),
            EnvelopeShape::PointCloud => ColliderShape::convex_hull(&envelope.vertices),
        };
        self.physics.set_collider_shape(collider, &shape).map_err(host_error)?;

        // Inertia follows the new size; the mass itself is unchanged
        if let Some(body) = self.body_of(node) {
            let radius = envelope.max_radius.max(DEFAULT_INERTIA_RADIUS);
            let mass = self.physics.body_mass(body).map_err(host_error)?;
            if mass > 0.0 {
                self.physics.set_body_mass(body, mass, radius).map_err(host_error)?;
            }
            self.inertia_radius.insert(node, radius);
        }

        if visual {
            self.visual_meshes.insert(
                node,
                EnvelopeMesh {
                    vertices: envelope.vertices.clone(),
                    normals: envelope.normals.clone(),
                    indices: envelope.indices().map(<[u32]>::to_vec).unwrap_or_default(),
                },
            );
        }

        log::debug!(
            "Installed envelope on {:?}: {} vertices, {} triangles",
            node,
            envelope.vertices.len(),
            envelope.triangle_count()
        );
        Ok(())
    }
}
