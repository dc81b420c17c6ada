//! Katamari Cluster - merge coordinator and adaptive collision envelope
//!
//! A player-controlled rigid body rolls through the scene and absorbs objects
//! tagged as mergeable. Every absorption freezes the object, adds its mass,
//! reparents it under the cluster and rebuilds the cluster's single collision
//! shape (the *envelope*) by raycasting its combined silhouette.
//!
//! The core owns no engine state. It talks to the host through two traits:
//! [`katamari_scene::SceneGraph`] for the hierarchy and [`PhysicsHost`] for
//! bodies, colliders and ray queries. The driver loop calls the lifecycle
//! phases explicitly:
//!
//! ```ignore
//! let mut cluster = Cluster::new(root, ClusterConfig::default())?.with_core(core);
//! cluster.on_spawn(&mut host)?;
//!
//! loop {
//!     let contacts = host.step(dt);
//!     cluster.on_physics_step(&mut host, &input, &contacts)?;
//!     let camera = cluster.on_late_step(&host, look)?;
//! }
//! ```
//!
//! Mass is accumulated by the cluster itself and pushed to the root body on
//! every absorption; the engine's own mass aggregation is never consulted.

pub mod camera;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod envelope;
pub mod error;
pub mod host;
pub mod merge;

pub mod prelude {
    //! Common imports for cluster functionality
    pub use crate::camera::{CameraPose, CameraRig, LookInput};
    pub use crate::cluster::{Cluster, StepReport};
    pub use crate::config::{CameraConfig, ClusterConfig, MovementConfig, RayStrategy};
    pub use crate::controller::{MovementInput, MovementReport};
    pub use crate::envelope::{
        Envelope, EnvelopeGenerator, EnvelopeReport, EnvelopeShape, SampleGrid,
    };
    pub use crate::error::{ClusterError, Result};
    pub use crate::host::{ClusterHost, PhysicsHost, RayHit};
    pub use crate::merge::{IgnoreReason, MergeCoordinator, MergeOutcome};
}

pub use prelude::*;
