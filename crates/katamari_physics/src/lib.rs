//! Katamari Physics - Rapier 3D Integration
//!
//! Rigid bodies, colliders, collision groups, ray queries and collision
//! events, wrapped behind small handle types so the rest of the workspace
//! never touches rapier directly.
//!
//! On top of the usual simulation surface the world supports what the
//! cluster needs between steps:
//!
//! - enabling / disabling individual colliders
//! - replacing a collider's shape (triangle mesh or convex hull)
//! - overriding a body's mass independently of its colliders
//! - teleporting bodies with their colliders so queries see the new pose
//!   before the next step
//!
//! # Example
//!
//! ```ignore
//! use katamari_physics::prelude::*;
//!
//! let mut physics = PhysicsWorld::new(PhysicsConfig::default());
//!
//! let body = physics.create_rigid_body(
//!     RigidBodyDesc::dynamic().with_position(Vec3::new(0.0, 10.0, 0.0)),
//! );
//! physics.create_collider(ColliderDesc::new(ColliderShape::sphere(0.5)), Some(body))?;
//!
//! physics.step(1.0 / 60.0);
//! ```

pub mod body;
pub mod collider;
pub mod config;
pub mod error;
pub mod events;
pub mod groups;
pub mod material;
pub mod query;
pub mod world;

mod convert;

pub mod prelude {
    //! Common imports for physics functionality
    pub use crate::body::{RigidBodyDesc, RigidBodyHandle, RigidBodyType};
    pub use crate::collider::{ColliderDesc, ColliderHandle, ColliderShape};
    pub use crate::config::PhysicsConfig;
    pub use crate::error::{PhysicsError, Result};
    pub use crate::events::{CollisionEvent, CollisionEventType};
    pub use crate::groups::CollisionGroups;
    pub use crate::material::PhysicsMaterial;
    pub use crate::query::{RaycastHit, RaycastOptions};
    pub use crate::world::PhysicsWorld;
    pub use katamari_math::{Quat, Transform, Vec3};
}

pub use prelude::*;
