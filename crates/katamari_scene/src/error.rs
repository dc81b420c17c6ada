//! Error types for the scene graph

use crate::arena::NodeHandle;
use thiserror::Error;

/// Scene graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// Handle does not refer to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeHandle),

    /// The requested parent would make a node its own ancestor
    #[error("Reparenting {node:?} under {parent:?} would create a cycle")]
    CycleDetected { node: NodeHandle, parent: NodeHandle },

    /// Parent handle is stale
    #[error("Invalid parent {parent:?} for {node:?}")]
    InvalidParent { node: NodeHandle, parent: NodeHandle },

    /// Unknown named layer
    #[error("Unknown collision layer: {0}")]
    UnknownLayer(String),
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;
