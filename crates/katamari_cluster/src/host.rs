//! Physics capabilities the cluster consumes from its host engine

use crate::envelope::Envelope;
use crate::error::Result;
use katamari_math::{Aabb, Vec3};
use katamari_scene::{NodeHandle, SceneGraph};

/// A single ray intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space hit point
    pub point: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
    /// Node owning the collider that was hit, when the host knows it
    pub node: Option<NodeHandle>,
}

/// Rigid body and collider access, keyed by scene node.
///
/// Every node has at most one rigid body and one collider as far as the
/// cluster is concerned. Methods taking a node without a body or collider
/// return [`crate::ClusterError::Host`] unless documented otherwise.
pub trait PhysicsHost {
    /// All hits along the ray, nearest first, restricted to colliders whose
    /// layer is in `layer_mask`.
    ///
    /// Each collider is reported once: where the ray enters it, or where the
    /// ray leaves it when the origin is inside.
    fn cast_ray(&mut self, origin: Vec3, direction: Vec3, max_distance: f32, layer_mask: u32) -> Vec<RayHit>;

    /// Mass of the node's body, `None` when the node has no body
    fn body_mass(&self, node: NodeHandle) -> Option<f32>;

    /// False for nodes without a body
    fn is_kinematic(&self, node: NodeHandle) -> bool;

    fn set_kinematic(&mut self, node: NodeHandle, kinematic: bool) -> Result<()>;

    fn set_body_mass(&mut self, node: NodeHandle, mass: f32) -> Result<()>;

    fn linear_velocity(&self, node: NodeHandle) -> Result<Vec3>;

    fn set_linear_velocity(&mut self, node: NodeHandle, velocity: Vec3) -> Result<()>;

    fn add_force(&mut self, node: NodeHandle, force: Vec3) -> Result<()>;

    fn add_torque(&mut self, node: NodeHandle, torque: Vec3) -> Result<()>;

    fn has_collider(&self, node: NodeHandle) -> bool;

    /// World-space bounds of the node's collider, `None` without one
    fn collider_bounds(&self, node: NodeHandle) -> Option<Aabb>;

    fn collider_enabled(&self, node: NodeHandle) -> Result<bool>;

    fn set_collider_enabled(&mut self, node: NodeHandle, enabled: bool) -> Result<()>;

    /// Replace the node's collision shape with the envelope, wholesale.
    /// `visual` also swaps the rendered mesh where the host has one.
    fn install_envelope(&mut self, node: NodeHandle, envelope: &Envelope, visual: bool) -> Result<()>;
}

/// Everything the cluster needs: hierarchy plus physics
pub trait ClusterHost: SceneGraph + PhysicsHost {}

impl<T: SceneGraph + PhysicsHost + ?Sized> ClusterHost for T {}
