//! Hierarchy capability consumed by the cluster core

use crate::arena::NodeHandle;
use crate::error::Result;
use crate::layers::CollisionLayer;
use crate::scene::{NodeDesc, Scene};
use katamari_math::{Transform, Vec3};

/// Scene hierarchy operations the cluster needs from its host.
///
/// [`Scene`] implements this directly; an engine integration can implement it
/// over its own node tree.
pub trait SceneGraph {
    fn contains_node(&self, node: NodeHandle) -> bool;

    fn parent_of(&self, node: NodeHandle) -> Result<Option<NodeHandle>>;

    fn children_of(&self, node: NodeHandle) -> Result<Vec<NodeHandle>>;

    fn world_transform_of(&self, node: NodeHandle) -> Result<Transform>;

    fn move_to(&mut self, node: NodeHandle, position: Vec3) -> Result<()>;

    /// Reparent keeping the world pose; fails on cycles
    fn attach_to(&mut self, node: NodeHandle, parent: Option<NodeHandle>) -> Result<()>;

    /// Create an empty child with an identity local transform
    fn create_child(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle>;

    fn node_has_tag(&self, node: NodeHandle, tag: &str) -> bool;

    fn layer_of(&self, node: NodeHandle) -> Result<CollisionLayer>;

    fn assign_layer(&mut self, node: NodeHandle, layer: CollisionLayer) -> Result<()>;
}

impl SceneGraph for Scene {
    fn contains_node(&self, node: NodeHandle) -> bool {
        self.contains(node)
    }

    fn parent_of(&self, node: NodeHandle) -> Result<Option<NodeHandle>> {
        Ok(self.node(node)?.parent())
    }

    fn children_of(&self, node: NodeHandle) -> Result<Vec<NodeHandle>> {
        Ok(self.node(node)?.children().to_vec())
    }

    fn world_transform_of(&self, node: NodeHandle) -> Result<Transform> {
        self.world_transform(node)
    }

    fn move_to(&mut self, node: NodeHandle, position: Vec3) -> Result<()> {
        self.set_world_position(node, position)
    }

    fn attach_to(&mut self, node: NodeHandle, parent: Option<NodeHandle>) -> Result<()> {
        self.reparent(node, parent)
    }

    fn create_child(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle> {
        let layer = self.node(parent)?.layer;
        Ok(self.spawn(NodeDesc::new(name).with_parent(parent).with_layer(layer)))
    }

    fn node_has_tag(&self, node: NodeHandle, tag: &str) -> bool {
        self.get(node).is_some_and(|n| n.has_tag(tag))
    }

    fn layer_of(&self, node: NodeHandle) -> Result<CollisionLayer> {
        Ok(self.node(node)?.layer)
    }

    fn assign_layer(&mut self, node: NodeHandle, layer: CollisionLayer) -> Result<()> {
        self.node_mut(node)?.layer = layer;
        Ok(())
    }
}

/// Assign `layer` to every node of the subtree rooted at `root`.
///
/// Iterative depth-first walk; each node is visited exactly once. Returns the
/// number of nodes relabelled.
pub fn set_layer_recursive<S: SceneGraph + ?Sized>(
    scene: &mut S,
    root: NodeHandle,
    layer: CollisionLayer,
) -> Result<usize> {
    let mut visited = 0;
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        scene.assign_layer(node, layer)?;
        visited += 1;
        stack.extend(scene.children_of(node)?);
    }

    log::trace!("Relabelled {} node(s) under {:?} to layer {}", visited, root, layer.0);
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneError;

    #[test]
    fn test_set_layer_recursive_covers_subtree() {
        let mut scene = Scene::new();
        let root = scene.spawn(NodeDesc::new("root").with_layer(CollisionLayer::PROPS));
        let a = scene.spawn(NodeDesc::new("a").with_parent(root).with_layer(CollisionLayer::PROPS));
        let b = scene.spawn(NodeDesc::new("b").with_parent(a).with_layer(CollisionLayer::DEFAULT));
        let c = scene.spawn(NodeDesc::new("c").with_parent(root));
        let outsider = scene.spawn(NodeDesc::new("outsider").with_layer(CollisionLayer::PROPS));

        let count = set_layer_recursive(&mut scene, root, CollisionLayer::PLAYER).unwrap();

        assert_eq!(count, 4);
        for node in [root, a, b, c] {
            assert_eq!(scene.layer_of(node).unwrap(), CollisionLayer::PLAYER);
        }
        assert_eq!(scene.layer_of(outsider).unwrap(), CollisionLayer::PROPS);
    }

    #[test]
    fn test_set_layer_recursive_deep_chain() {
        let mut scene = Scene::new();
        let root = scene.spawn(NodeDesc::new("root"));
        let mut tail = root;
        for i in 0..2000 {
            tail = scene.spawn(NodeDesc::new(format!("n{i}")).with_parent(tail));
        }

        let count = set_layer_recursive(&mut scene, root, CollisionLayer::PLAYER).unwrap();
        assert_eq!(count, 2001);
        assert_eq!(scene.layer_of(tail).unwrap(), CollisionLayer::PLAYER);
    }

    #[test]
    fn test_set_layer_recursive_stale_root() {
        let mut scene = Scene::new();
        let node = scene.spawn(NodeDesc::new("gone"));
        scene.despawn_recursive(node).unwrap();

        assert_eq!(
            set_layer_recursive(&mut scene, node, CollisionLayer::PLAYER),
            Err(SceneError::NodeNotFound(node))
        );
    }

    #[test]
    fn test_create_child_inherits_layer() {
        let mut scene = Scene::new();
        let root = scene.spawn(NodeDesc::new("root").with_layer(CollisionLayer::PLAYER));
        let child = scene.create_child(root, "members").unwrap();

        assert_eq!(scene.parent_of(child).unwrap(), Some(root));
        assert_eq!(scene.layer_of(child).unwrap(), CollisionLayer::PLAYER);
    }
}
