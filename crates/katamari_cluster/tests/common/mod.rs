//! In-memory host: a real scene arena plus analytic colliders

#![allow(dead_code)]

use katamari_cluster::prelude::*;
use katamari_math::{ray_aabb_crossings, ray_sphere_crossings, Aabb, Ray, Transform, Vec3};
use katamari_scene::{CollisionLayer, NodeDesc, NodeHandle, Scene, SceneGraph};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub enum MockShape {
    Sphere(f32),
    Cuboid(Vec3),
}

#[derive(Debug, Clone)]
pub struct MockCollider {
    pub shape: MockShape,
    pub enabled: bool,
    /// Installed envelope, hit as its bounding sphere
    pub envelope: Option<Envelope>,
}

#[derive(Debug, Clone, Default)]
pub struct MockBody {
    pub mass: f32,
    pub kinematic: bool,
    pub velocity: Vec3,
    pub force: Vec3,
    pub torque: Vec3,
}

#[derive(Default)]
pub struct MockHost {
    pub scene: Scene,
    pub bodies: HashMap<NodeHandle, MockBody>,
    pub colliders: HashMap<NodeHandle, MockCollider>,
    /// Every collider toggle, in order
    pub toggles: Vec<(NodeHandle, bool)>,
    pub installs: Vec<(NodeHandle, bool)>,
    /// Colliders that were enabled when each ray was cast
    pub enabled_during_rays: Vec<Vec<NodeHandle>>,
    /// Make the nth `set_collider_enabled` call fail
    pub fail_toggle_at: Option<usize>,
    pub fail_install: bool,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, desc: NodeDesc) -> NodeHandle {
        self.scene.spawn(desc)
    }

    pub fn add_body(&mut self, node: NodeHandle, mass: f32) {
        self.bodies.insert(
            node,
            MockBody {
                mass,
                ..Default::default()
            },
        );
    }

    pub fn add_collider(&mut self, node: NodeHandle, shape: MockShape) {
        self.colliders.insert(
            node,
            MockCollider {
                shape,
                enabled: true,
                envelope: None,
            },
        );
    }

    pub fn body(&self, node: NodeHandle) -> &MockBody {
        &self.bodies[&node]
    }

    pub fn collider(&self, node: NodeHandle) -> &MockCollider {
        &self.colliders[&node]
    }

    /// Cluster root with a body and an (initially sphere) envelope collider
    /// on the player layer, plus a core sphere child
    pub fn spawn_cluster(&mut self, position: Vec3, mass: f32, core_radius: f32) -> (NodeHandle, NodeHandle) {
        let root = self.spawn(
            NodeDesc::new("player")
                .with_position(position)
                .with_layer(CollisionLayer::PLAYER),
        );
        self.add_body(root, mass);
        self.add_collider(root, MockShape::Sphere(core_radius));

        let core = self.spawn(
            NodeDesc::new("core")
                .with_parent(root)
                .with_layer(CollisionLayer::PLAYER),
        );
        self.add_collider(core, MockShape::Sphere(core_radius));
        (root, core)
    }

    /// Loose mergeable ball with a body
    pub fn spawn_prop(&mut self, name: &str, position: Vec3, radius: f32, mass: f32) -> NodeHandle {
        let node = self.spawn(
            NodeDesc::new(name)
                .with_position(position)
                .with_layer(CollisionLayer::PROPS)
                .with_tag("Mergeable"),
        );
        self.add_body(node, mass);
        self.add_collider(node, MockShape::Sphere(radius));
        node
    }

    fn crossings(&self, node: NodeHandle, collider: &MockCollider, ray: &Ray, max: f32) -> Vec<f32> {
        let Ok(world) = self.scene.world_transform(node) else {
            return Vec::new();
        };

        if let Some(envelope) = &collider.envelope {
            return ray_sphere_crossings(ray, world.position, envelope.max_radius, max);
        }

        match collider.shape {
            MockShape::Sphere(radius) => ray_sphere_crossings(ray, world.position, radius, max),
            MockShape::Cuboid(half) => {
                let local = Ray::new(
                    world.inverse_transform_point(ray.origin),
                    world.rotation.inverse().rotate(ray.direction),
                );
                ray_aabb_crossings(&local, &Aabb::from_center_half_extents(Vec3::ZERO, half), max)
            }
        }
    }
}

fn missing(what: &str, node: NodeHandle) -> ClusterError {
    ClusterError::Host(format!("{what} missing on {node:?}"))
}

impl SceneGraph for MockHost {
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
        self.scene.move_to(node, position)
    }

    fn attach_to(&mut self, node: NodeHandle, parent: Option<NodeHandle>) -> katamari_scene::Result<()> {
        self.scene.attach_to(node, parent)
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
        self.scene.assign_layer(node, layer)
    }
}

impl PhysicsHost for MockHost {
    fn cast_ray(&mut self, origin: Vec3, direction: Vec3, max_distance: f32, layer_mask: u32) -> Vec<RayHit> {
        let ray = Ray::new(origin, direction);

        let mut enabled = Vec::new();
        let mut hits = Vec::new();
        for (&node, collider) in &self.colliders {
            if !collider.enabled {
                continue;
            }
            enabled.push(node);

            let Ok(layer) = self.scene.layer_of(node) else {
                continue;
            };
            if layer.as_mask() & layer_mask == 0 {
                continue;
            }

            // One crossing per collider: the entry, or the exit from inside
            if let Some(t) = self.crossings(node, collider, &ray, max_distance).first().copied() {
                hits.push(RayHit {
                    point: ray.at(t),
                    distance: t,
                    node: Some(node),
                });
            }
        }
        self.enabled_during_rays.push(enabled);

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn body_mass(&self, node: NodeHandle) -> Option<f32> {
        self.bodies.get(&node).map(|b| b.mass)
    }

    fn is_kinematic(&self, node: NodeHandle) -> bool {
        self.bodies.get(&node).is_some_and(|b| b.kinematic)
    }

    fn set_kinematic(&mut self, node: NodeHandle, kinematic: bool) -> katamari_cluster::Result<()> {
        let body = self.bodies.get_mut(&node).ok_or_else(|| missing("body", node))?;
        body.kinematic = kinematic;
        Ok(())
    }

    fn set_body_mass(&mut self, node: NodeHandle, mass: f32) -> katamari_cluster::Result<()> {
        let body = self.bodies.get_mut(&node).ok_or_else(|| missing("body", node))?;
        body.mass = mass;
        Ok(())
    }

    fn linear_velocity(&self, node: NodeHandle) -> katamari_cluster::Result<Vec3> {
        self.bodies
            .get(&node)
            .map(|b| b.velocity)
            .ok_or_else(|| missing("body", node))
    }

    fn set_linear_velocity(&mut self, node: NodeHandle, velocity: Vec3) -> katamari_cluster::Result<()> {
        let body = self.bodies.get_mut(&node).ok_or_else(|| missing("body", node))?;
        body.velocity = velocity;
        Ok(())
    }

    fn add_force(&mut self, node: NodeHandle, force: Vec3) -> katamari_cluster::Result<()> {
        let body = self.bodies.get_mut(&node).ok_or_else(|| missing("body", node))?;
        body.force += force;
        Ok(())
    }

    fn add_torque(&mut self, node: NodeHandle, torque: Vec3) -> katamari_cluster::Result<()> {
        let body = self.bodies.get_mut(&node).ok_or_else(|| missing("body", node))?;
        body.torque += torque;
        Ok(())
    }

    fn has_collider(&self, node: NodeHandle) -> bool {
        self.colliders.contains_key(&node)
    }

    fn collider_bounds(&self, node: NodeHandle) -> Option<Aabb> {
        let collider = self.colliders.get(&node)?;
        let world = self.scene.world_transform(node).ok()?;

        let radius = match (&collider.envelope, collider.shape) {
            (Some(envelope), _) => envelope.max_radius,
            (None, MockShape::Sphere(radius)) => radius,
            (None, MockShape::Cuboid(half)) => {
                let corners = Aabb::from_center_half_extents(Vec3::ZERO, half).corners();
                let world_corners: Vec<Vec3> = corners.iter().map(|&c| world.transform_point(c)).collect();
                return Some(Aabb::from_points(&world_corners));
            }
        };
        Some(Aabb::from_center_half_extents(world.position, Vec3::splat(radius)))
    }

    fn collider_enabled(&self, node: NodeHandle) -> katamari_cluster::Result<bool> {
        self.colliders
            .get(&node)
            .map(|c| c.enabled)
            .ok_or_else(|| missing("collider", node))
    }

    fn set_collider_enabled(&mut self, node: NodeHandle, enabled: bool) -> katamari_cluster::Result<()> {
        if self.fail_toggle_at == Some(self.toggles.len()) {
            self.fail_toggle_at = None;
            return Err(ClusterError::Host("injected toggle failure".into()));
        }
        let collider = self.colliders.get_mut(&node).ok_or_else(|| missing("collider", node))?;
        collider.enabled = enabled;
        self.toggles.push((node, enabled));
        Ok(())
    }

    fn install_envelope(&mut self, node: NodeHandle, envelope: &Envelope, visual: bool) -> katamari_cluster::Result<()> {
        if self.fail_install {
            return Err(ClusterError::Host("injected install failure".into()));
        }
        let collider = self.colliders.get_mut(&node).ok_or_else(|| missing("collider", node))?;
        collider.envelope = Some(envelope.clone());
        self.installs.push((node, visual));

        // Shape replacement in real engines tends to reset motion
        if let Some(body) = self.bodies.get_mut(&node) {
            body.velocity = Vec3::ZERO;
        }
        Ok(())
    }
}
