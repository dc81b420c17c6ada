//! Katamari Scene - transform hierarchy
//!
//! An arena of nodes addressed by generational [`NodeHandle`]s, with explicit
//! parent pointers and child lists. The cluster core never holds references
//! into the arena; it only stores handles and goes through the
//! [`SceneGraph`] capability trait, which [`Scene`] implements and which a
//! host engine can implement on top of its own hierarchy.
//!
//! # Example
//!
//! ```ignore
//! use katamari_scene::prelude::*;
//!
//! let mut scene = Scene::new();
//! let ball = scene.spawn(NodeDesc::new("ball").with_tag("Mergeable"));
//! let player = scene.spawn(NodeDesc::new("player").with_layer(CollisionLayer::PLAYER));
//!
//! scene.reparent(ball, Some(player))?;
//! set_layer_recursive(&mut scene, ball, CollisionLayer::PLAYER)?;
//! ```

pub mod arena;
pub mod error;
pub mod graph;
pub mod layers;
pub mod scene;

pub mod prelude {
    //! Common imports for scene functionality
    pub use crate::arena::NodeHandle;
    pub use crate::error::{Result, SceneError};
    pub use crate::graph::{set_layer_recursive, SceneGraph};
    pub use crate::layers::{CollisionLayer, CollisionMatrix};
    pub use crate::scene::{Node, NodeDesc, Scene};
}

pub use prelude::*;
