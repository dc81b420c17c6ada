//! Error types for the cluster core

use katamari_scene::{NodeHandle, SceneError};
use thiserror::Error;

/// Cluster errors
///
/// Degraded sampling outcomes (missed rays, degenerate triangulation,
/// ineligible contacts) are not errors; they show up in reports instead.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Configuration rejected by [`crate::ClusterConfig::validate`]
    #[error("Invalid cluster configuration: {0}")]
    InvalidConfig(String),

    /// A lifecycle phase ran before `on_spawn`
    #[error("Cluster has not been spawned")]
    NotSpawned,

    /// `on_spawn` ran twice
    #[error("Cluster was already spawned")]
    AlreadySpawned,

    /// The cluster root must carry a rigid body
    #[error("Node {0:?} has no rigid body")]
    MissingBody(NodeHandle),

    /// Hierarchy failure
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Failure reported by the physics host
    #[error("Physics host error: {0}")]
    Host(String),
}

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;
