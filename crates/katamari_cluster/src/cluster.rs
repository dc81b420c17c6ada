//! The rolling cluster and its lifecycle phases

use crate::camera::{CameraPose, CameraRig, LookInput};
use crate::config::ClusterConfig;
use crate::controller::{self, MovementInput, MovementReport};
use crate::envelope::{Envelope, EnvelopeGenerator, EnvelopeReport};
use crate::error::{ClusterError, Result};
use crate::host::ClusterHost;
use crate::merge::{MergeCoordinator, MergeOutcome};
use katamari_scene::{NodeHandle, SceneGraph};
use std::collections::HashSet;

/// Name of the container node absorbed members are parented under
pub const MEMBERS_NODE: &str = "members";

/// Everything that happened during one physics step
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    pub movement: MovementReport,
    /// One outcome per contact, in contact order
    pub merges: Vec<MergeOutcome>,
}

impl StepReport {
    pub fn absorbed(&self) -> usize {
        self.merges.iter().filter(|m| m.is_absorbed()).count()
    }
}

/// The player-controlled aggregate body.
///
/// Holds handles only; the scene and physics state live in the host.
#[derive(Debug)]
pub struct Cluster {
    config: ClusterConfig,
    root: NodeHandle,
    core: Option<NodeHandle>,
    members_node: Option<NodeHandle>,
    members: Vec<NodeHandle>,
    attached: HashSet<NodeHandle>,
    mass: f32,
    merge_count: u32,
    max_radius: f32,
    envelope: Option<Envelope>,
    camera: CameraRig,
}

impl Cluster {
    /// Wrap an existing root node. The root must carry the cluster's rigid
    /// body and envelope collider by the time [`Cluster::on_spawn`] runs.
    pub fn new(root: NodeHandle, config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            camera: CameraRig::new(config.camera.clone()),
            config,
            root,
            core: None,
            members_node: None,
            members: Vec::new(),
            attached: HashSet::new(),
            mass: 0.0,
            merge_count: 0,
            max_radius: 0.0,
            envelope: None,
        })
    }

    /// Initial geometry sampled alongside absorbed members
    pub fn with_core(mut self, core: NodeHandle) -> Self {
        self.core = Some(core);
        self
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn core(&self) -> Option<NodeHandle> {
        self.core
    }

    /// Container node created at spawn
    pub fn members_node(&self) -> Option<NodeHandle> {
        self.members_node
    }

    /// Absorbed members in absorption order
    pub fn members(&self) -> &[NodeHandle] {
        &self.members
    }

    pub fn is_attached(&self, node: NodeHandle) -> bool {
        self.attached.contains(&node)
    }

    /// Accumulated mass: the root body's initial mass plus every absorbed body
    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn merge_count(&self) -> u32 {
        self.merge_count
    }

    /// Largest vertex distance of the current envelope
    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn is_spawned(&self) -> bool {
        self.members_node.is_some()
    }

    pub(crate) fn record_absorption(&mut self, node: NodeHandle, mass: Option<f32>) {
        if let Some(mass) = mass {
            self.mass += mass;
        }
        self.members.push(node);
        self.attached.insert(node);
        self.merge_count += 1;
    }

    pub(crate) fn set_envelope(&mut self, envelope: Envelope) {
        self.max_radius = envelope.max_radius;
        self.envelope = Some(envelope);
    }

    /// Nodes whose colliders make up the sampled geometry: the core plus
    /// every collider in every absorbed subtree
    pub(crate) fn sampled_colliders<H: ClusterHost + ?Sized>(&self, host: &H) -> Result<Vec<NodeHandle>> {
        let mut out = Vec::new();

        if let Some(core) = self.core {
            if core != self.root && host.has_collider(core) {
                out.push(core);
            }
        }

        for &member in &self.members {
            out.extend(
                subtree(host, member)?
                    .into_iter()
                    .filter(|&n| host.has_collider(n)),
            );
        }

        Ok(out)
    }

    // ==================== Lifecycle ====================

    /// Read the initial mass, create the members container, disable the
    /// core's own collider and generate the first envelope.
    pub fn on_spawn<H: ClusterHost + ?Sized>(&mut self, host: &mut H) -> Result<EnvelopeReport> {
        if self.is_spawned() {
            return Err(ClusterError::AlreadySpawned);
        }

        self.mass = host
            .body_mass(self.root)
            .ok_or(ClusterError::MissingBody(self.root))?;
        self.members_node = Some(host.create_child(self.root, MEMBERS_NODE)?);

        if let Some(core) = self.core {
            katamari_scene::set_layer_recursive(host, core, self.config.cluster_layer)?;
            if core != self.root && host.has_collider(core) {
                host.set_collider_enabled(core, false)?;
            }
        }
        katamari_scene::set_layer_recursive(host, self.root, self.config.cluster_layer)?;

        log::info!(
            "Cluster {:?} spawned with mass {:.3}",
            self.root,
            self.mass
        );

        EnvelopeGenerator::regenerate(self, host)
    }

    /// Roll and jump, then absorb whatever the step's contacts delivered
    pub fn on_physics_step<H: ClusterHost + ?Sized>(
        &mut self,
        host: &mut H,
        input: &MovementInput,
        contacts: &[NodeHandle],
    ) -> Result<StepReport> {
        if !self.is_spawned() {
            return Err(ClusterError::NotSpawned);
        }

        let movement = controller::apply_movement(
            host,
            self.root,
            self.config.cluster_layer,
            self.max_radius,
            &self.config.movement,
            self.camera.pose(),
            input,
        )?;

        let merges = MergeCoordinator::handle_contacts(self, host, contacts)?;

        Ok(StepReport { movement, merges })
    }

    /// Move the follow camera
    pub fn on_late_step<S: SceneGraph + ?Sized>(&mut self, scene: &S, look: LookInput) -> Result<CameraPose> {
        if !self.is_spawned() {
            return Err(ClusterError::NotSpawned);
        }

        let target = scene.world_transform_of(self.root)?.position;
        Ok(self.camera.update(target, look, self.max_radius))
    }
}

/// Every node under `root`, root included; iterative depth-first
pub(crate) fn subtree<S: SceneGraph + ?Sized>(scene: &S, root: NodeHandle) -> Result<Vec<NodeHandle>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(scene.children_of(node)?);
    }
    Ok(out)
}
