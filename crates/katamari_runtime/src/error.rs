//! Runtime error types

use katamari_cluster::ClusterError;
use katamari_physics::PhysicsError;
use katamari_scene::SceneError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration or driving the world
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidOverride { key: String, value: String },

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
