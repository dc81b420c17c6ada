//! The node arena and its transform hierarchy

use crate::arena::{NodeArena, NodeHandle};
use crate::error::{Result, SceneError};
use crate::layers::CollisionLayer;
use katamari_math::{Transform, Vec3};
use std::collections::HashSet;

/// A node in the scene hierarchy
#[derive(Debug, Clone)]
pub struct Node {
    /// Debug name
    pub name: String,
    /// Transform relative to the parent (or world if root)
    pub local: Transform,
    /// Collision layer used for contact and ray filtering
    pub layer: CollisionLayer,
    /// Free-form markers ("Mergeable", ...)
    pub tags: HashSet<String>,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Description for spawning a node
#[derive(Debug, Clone, Default)]
pub struct NodeDesc {
    pub name: String,
    pub transform: Transform,
    pub layer: CollisionLayer,
    pub tags: Vec<String>,
    pub parent: Option<NodeHandle>,
}

impl NodeDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set local position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_layer(mut self, layer: CollisionLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Spawn under a parent; the transform is then parent-relative
    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Scene graph: an arena of nodes with parent pointers and child lists
#[derive(Default)]
pub struct Scene {
    nodes: NodeArena<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a node. A stale parent handle spawns the node at the root.
    pub fn spawn(&mut self, desc: NodeDesc) -> NodeHandle {
        let parent = desc.parent.filter(|p| self.nodes.contains(*p));
        if desc.parent.is_some() && parent.is_none() {
            log::warn!("Spawning '{}' at root: parent no longer exists", desc.name);
        }

        let handle = self.nodes.insert(Node {
            name: desc.name,
            local: desc.transform,
            layer: desc.layer,
            tags: desc.tags.into_iter().collect(),
            parent,
            children: Vec::new(),
        });

        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.push(handle);
            }
        }

        handle
    }

    /// Remove a node and its whole subtree
    pub fn despawn_recursive(&mut self, node: NodeHandle) -> Result<usize> {
        let parent = self.node(node)?.parent;
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != node);
            }
        }

        let mut removed = 0;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(n) = self.nodes.remove(current) {
                stack.extend(n.children);
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn get(&self, node: NodeHandle) -> Option<&Node> {
        self.nodes.get(node)
    }

    pub fn get_mut(&mut self, node: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(node)
    }

    pub(crate) fn node(&self, node: NodeHandle) -> Result<&Node> {
        self.nodes.get(node).ok_or(SceneError::NodeNotFound(node))
    }

    pub(crate) fn node_mut(&mut self, node: NodeHandle) -> Result<&mut Node> {
        self.nodes.get_mut(node).ok_or(SceneError::NodeNotFound(node))
    }

    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter()
    }

    /// First node with the given name
    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(h, _)| h)
    }

    /// Check whether `ancestor` is on the parent chain of `node`
    pub fn is_ancestor(&self, node: NodeHandle, ancestor: NodeHandle) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes.get(p).and_then(|n| n.parent);
        }
        false
    }

    /// All nodes of the subtree rooted at `root`, root included, depth-first
    pub fn descendants(&self, root: NodeHandle) -> Result<Vec<NodeHandle>> {
        self.node(root)?;

        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if let Some(n) = self.nodes.get(current) {
                out.push(current);
                stack.extend(n.children.iter().copied());
            }
        }
        Ok(out)
    }

    /// World-space transform, composed down from the root
    pub fn world_transform(&self, node: NodeHandle) -> Result<Transform> {
        let mut chain = vec![self.node(node)?.local];
        let mut current = self.node(node)?.parent;
        while let Some(p) = current {
            let parent = self.node(p)?;
            chain.push(parent.local);
            current = parent.parent;
        }

        Ok(chain
            .iter()
            .rev()
            .fold(Transform::IDENTITY, |acc, local| acc.combine(local)))
    }

    fn parent_world_transform(&self, node: NodeHandle) -> Result<Transform> {
        match self.node(node)?.parent {
            Some(parent) => self.world_transform(parent),
            None => Ok(Transform::IDENTITY),
        }
    }

    pub fn set_local_transform(&mut self, node: NodeHandle, local: Transform) -> Result<()> {
        self.node_mut(node)?.local = local;
        Ok(())
    }

    /// Place a node in world space, keeping its hierarchy
    pub fn set_world_transform(&mut self, node: NodeHandle, world: Transform) -> Result<()> {
        let parent_world = self.parent_world_transform(node)?;
        self.node_mut(node)?.local = parent_world.inverse().combine(&world);
        Ok(())
    }

    /// Move a node in world space, keeping its world rotation
    pub fn set_world_position(&mut self, node: NodeHandle, position: Vec3) -> Result<()> {
        let mut world = self.world_transform(node)?;
        world.position = position;
        self.set_world_transform(node, world)
    }

    /// Move a node under a new parent (or to the root), preserving its world pose
    pub fn reparent(&mut self, node: NodeHandle, new_parent: Option<NodeHandle>) -> Result<()> {
        let world = self.world_transform(node)?;

        if let Some(parent) = new_parent {
            if !self.nodes.contains(parent) {
                return Err(SceneError::InvalidParent { node, parent });
            }
            if parent == node || self.is_ancestor(parent, node) {
                return Err(SceneError::CycleDetected { node, parent });
            }
        }

        let old_parent = self.node(node)?.parent;
        if old_parent == new_parent {
            return Ok(());
        }

        if let Some(old) = old_parent {
            if let Some(p) = self.nodes.get_mut(old) {
                p.children.retain(|&c| c != node);
            }
        }
        if let Some(parent) = new_parent {
            self.node_mut(parent)?.children.push(node);
        }
        self.node_mut(node)?.parent = new_parent;

        self.set_world_transform(node, world)
    }
}
