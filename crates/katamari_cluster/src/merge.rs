//! Absorbing mergeable objects into the cluster

use crate::cluster::{subtree, Cluster};
use crate::envelope::{EnvelopeGenerator, EnvelopeReport};
use crate::error::{ClusterError, Result};
use crate::host::ClusterHost;
use katamari_scene::{set_layer_recursive, NodeHandle};

/// Why a contact did not lead to absorption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Missing the mergeable tag
    NotMergeable,
    /// Body is already kinematic
    Kinematic,
    /// Root, core or members container of the cluster itself
    OwnGeometry,
    /// Rejected by the mass-ratio policy
    TooHeavy,
    /// Handle no longer refers to a scene node
    Stale,
}

/// Result of handling one contact
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The node is now a member; `mass` is what it contributed
    Absorbed {
        node: NodeHandle,
        mass: Option<f32>,
        envelope: EnvelopeReport,
    },
    /// The node (or an ancestor) was absorbed earlier; nothing changed
    AlreadyAttached,
    /// Nothing changed
    Ignored(IgnoreReason),
}

impl MergeOutcome {
    pub fn is_absorbed(&self) -> bool {
        matches!(self, Self::Absorbed { .. })
    }
}

/// Decides eligibility and performs absorption
pub struct MergeCoordinator;

impl MergeCoordinator {
    /// Handle a contact between the cluster and `other`
    pub fn handle_contact<H: ClusterHost + ?Sized>(
        cluster: &mut Cluster,
        host: &mut H,
        other: NodeHandle,
    ) -> Result<MergeOutcome> {
        if !cluster.is_spawned() {
            return Err(ClusterError::NotSpawned);
        }

        if let Some(outcome) = Self::check_eligibility(cluster, &*host, other)? {
            log::trace!("Contact with {:?}: {:?}", other, outcome);
            return Ok(outcome);
        }

        Self::absorb(cluster, host, other)
    }

    /// Handle contacts in order; later contacts see earlier absorptions
    pub fn handle_contacts<H: ClusterHost + ?Sized>(
        cluster: &mut Cluster,
        host: &mut H,
        contacts: &[NodeHandle],
    ) -> Result<Vec<MergeOutcome>> {
        contacts
            .iter()
            .map(|&other| Self::handle_contact(cluster, host, other))
            .collect()
    }

    /// `None` when `other` may be absorbed
    fn check_eligibility<H: ClusterHost + ?Sized>(
        cluster: &Cluster,
        host: &H,
        other: NodeHandle,
    ) -> Result<Option<MergeOutcome>> {
        if !host.contains_node(other) {
            return Ok(Some(MergeOutcome::Ignored(IgnoreReason::Stale)));
        }

        // Walk up: an attached ancestor means the contact is with absorbed
        // geometry, reaching the root means it is the cluster itself
        let mut current = Some(other);
        while let Some(node) = current {
            if cluster.is_attached(node) {
                return Ok(Some(MergeOutcome::AlreadyAttached));
            }
            if node == cluster.root() {
                return Ok(Some(MergeOutcome::Ignored(IgnoreReason::OwnGeometry)));
            }
            current = host.parent_of(node)?;
        }
        if cluster.core() == Some(other) {
            return Ok(Some(MergeOutcome::Ignored(IgnoreReason::OwnGeometry)));
        }

        if !host.node_has_tag(other, &cluster.config().mergeable_tag) {
            return Ok(Some(MergeOutcome::Ignored(IgnoreReason::NotMergeable)));
        }

        if host.is_kinematic(other) {
            return Ok(Some(MergeOutcome::Ignored(IgnoreReason::Kinematic)));
        }

        if let (Some(ratio), Some(mass)) = (cluster.config().max_mass_ratio, host.body_mass(other)) {
            if mass > ratio * cluster.mass() {
                log::debug!(
                    "Rejecting {:?}: mass {:.3} exceeds {:.2} x {:.3}",
                    other,
                    mass,
                    ratio,
                    cluster.mass()
                );
                return Ok(Some(MergeOutcome::Ignored(IgnoreReason::TooHeavy)));
            }
        }

        Ok(None)
    }

    fn absorb<H: ClusterHost + ?Sized>(
        cluster: &mut Cluster,
        host: &mut H,
        other: NodeHandle,
    ) -> Result<MergeOutcome> {
        let root = cluster.root();
        let members_node = cluster.members_node().ok_or(ClusterError::NotSpawned)?;

        // Freeze the body and take its mass
        let mass = host.body_mass(other);
        if let Some(mass) = mass {
            host.set_kinematic(other, true)?;
            host.set_body_mass(root, cluster.mass() + mass)?;
        }

        // Carry it with the cluster, pulled partway toward the origin
        host.attach_to(other, Some(members_node))?;
        let origin = host.world_transform_of(root)?.position;
        let old = host.world_transform_of(other)?.position;
        let settled = origin + (old - origin) / cluster.config().settle_factor;
        host.move_to(other, settled)?;

        // Only the envelope collides from now on
        for node in subtree(&*host, other)? {
            if host.has_collider(node) {
                host.set_collider_enabled(node, false)?;
            }
        }

        let relabelled = set_layer_recursive(host, other, cluster.config().cluster_layer)?;

        cluster.record_absorption(other, mass);
        log::info!(
            "Absorbed {:?} ({} node(s), mass {:?}): total mass {:.3}, merges {}",
            other,
            relabelled,
            mass,
            cluster.mass(),
            cluster.merge_count()
        );

        let envelope = EnvelopeGenerator::regenerate(cluster, host)?;

        Ok(MergeOutcome::Absorbed {
            node: other,
            mass,
            envelope,
        })
    }
}
