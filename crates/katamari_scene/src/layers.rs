//! Collision layers and filtering

use crate::error::{Result, SceneError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A collision layer identifier (bit index, 0..32)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionLayer(pub u32);

impl CollisionLayer {
    /// Default layer
    pub const DEFAULT: Self = Self(0);
    /// The player cluster and everything it has absorbed
    pub const PLAYER: Self = Self(1);
    /// Static environment (ground, walls)
    pub const ENVIRONMENT: Self = Self(2);
    /// Loose props waiting to be picked up
    pub const PROPS: Self = Self(3);

    /// Create a custom layer
    pub const fn custom(id: u32) -> Self {
        Self(id)
    }

    /// Get the layer as a bitmask
    pub const fn as_mask(&self) -> u32 {
        1 << self.0
    }

    /// Mask matching every layer except this one
    pub const fn inverse_mask(&self) -> u32 {
        !self.as_mask()
    }
}

impl Default for CollisionLayer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Named layers plus the pairwise rules deciding which layers collide
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionMatrix {
    layer_names: HashMap<String, CollisionLayer>,
    rules: HashMap<CollisionLayer, Vec<CollisionLayer>>,
}

impl Default for CollisionMatrix {
    fn default() -> Self {
        let mut matrix = Self::new();

        matrix.register_layer("default", CollisionLayer::DEFAULT);
        matrix.register_layer("player", CollisionLayer::PLAYER);
        matrix.register_layer("environment", CollisionLayer::ENVIRONMENT);
        matrix.register_layer("props", CollisionLayer::PROPS);

        // Absorbed geometry must never touch the envelope that replaced it
        matrix.set_collides_with(CollisionLayer::PLAYER, &[
            CollisionLayer::DEFAULT,
            CollisionLayer::ENVIRONMENT,
            CollisionLayer::PROPS,
        ]);

        matrix.set_collides_with(CollisionLayer::PROPS, &[
            CollisionLayer::DEFAULT,
            CollisionLayer::PLAYER,
            CollisionLayer::ENVIRONMENT,
            CollisionLayer::PROPS,
        ]);

        matrix
    }
}

impl CollisionMatrix {
    /// Create an empty collision matrix
    pub fn new() -> Self {
        Self {
            layer_names: HashMap::new(),
            rules: HashMap::new(),
        }
    }

    /// Register a named layer
    pub fn register_layer(&mut self, name: &str, layer: CollisionLayer) {
        self.layer_names.insert(name.to_string(), layer);
    }

    /// Get a layer by name
    pub fn get_layer(&self, name: &str) -> Option<CollisionLayer> {
        self.layer_names.get(name).copied()
    }

    /// Resolve a layer by name, failing on unknown names
    pub fn resolve(&self, name: &str) -> Result<CollisionLayer> {
        self.get_layer(name)
            .ok_or_else(|| SceneError::UnknownLayer(name.to_string()))
    }

    /// Set which layers a given layer collides with
    pub fn set_collides_with(&mut self, layer: CollisionLayer, collides_with: &[CollisionLayer]) {
        self.rules.insert(layer, collides_with.to_vec());
    }

    /// Filter bitmask for a layer (layers without rules collide with everything)
    pub fn filter_mask(&self, layer: CollisionLayer) -> u32 {
        self.rules
            .get(&layer)
            .map(|layers| layers.iter().fold(0u32, |acc, l| acc | l.as_mask()))
            .unwrap_or(u32::MAX)
    }

    /// Check if two layers can collide
    pub fn can_collide(&self, a: CollisionLayer, b: CollisionLayer) -> bool {
        let a_collides = self.rules.get(&a).map(|v| v.contains(&b)).unwrap_or(true);
        let b_collides = self.rules.get(&b).map(|v| v.contains(&a)).unwrap_or(true);
        a_collides && b_collides
    }
}
