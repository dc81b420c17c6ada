//! Katamari Runtime
//!
//! The concrete host for the cluster core: a scene graph and a rapier world
//! kept in sync ([`GameWorld`]), configuration loading, and a headless
//! [`Driver`] that runs the lifecycle phases in fixed steps.

pub mod config;
pub mod driver;
pub mod error;
pub mod world;

pub use config::{InputScript, PlayerConfig, PropConfig, RuntimeConfig};
pub use driver::{Driver, RunSummary, TickReport};
pub use error::{Result, RuntimeError};
pub use world::{EnvelopeMesh, GameWorld};
