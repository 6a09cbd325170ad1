//! Node arena and tree mutation.
//!
//! Nodes are owned by the arena and linked by id. A node is either
//! connected (reachable from an installed root) or disconnected; only
//! connected nodes take part in the update pass.

use std::collections::HashMap;

use super::node::Node;
use super::flags::NodeFlags;
use crate::common::{BufferIndex, NodeId};

/// Arena of every node the update side knows about
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a disconnected node
    pub fn add_node(&mut self, node: Node) {
        let id = node.id();
        debug_assert!(!self.nodes.contains_key(&id), "{id} added twice");
        self.nodes.insert(id, node);
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable node by id
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// True if the node exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes, connected or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Installed roots in installation order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Iterate over every node
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate mutably over every node
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Make `id` a root: connected, depth 0, no parent
    ///
    /// Returns the nodes that became connected, the root first.
    pub fn install_root(&mut self, id: NodeId) -> Vec<NodeId> {
        let node = self.nodes.get_mut(&id).unwrap_or_else(|| panic!("unknown root {id}"));
        assert!(node.parent.is_none(), "{id} cannot be a root, it has a parent");
        node.is_root = true;
        node.depth = 0;
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
        self.mark_subtree_connected(id, 0)
    }

    /// Connect `child` under `parent`
    ///
    /// Panics if `parent == child`, if the parent is not connected, or if
    /// the child is a root or already has a parent. Returns the nodes that
    /// became connected in pre-order (the child first, then its retained
    /// subtree).
    pub fn connect_child(&mut self, parent: NodeId, child: NodeId) -> Vec<NodeId> {
        assert!(parent != child, "{parent} cannot be its own child");

        let parent_depth = {
            let p = self.nodes.get(&parent).unwrap_or_else(|| panic!("unknown parent {parent}"));
            assert!(p.connected, "{parent} is not connected to the scene graph");
            p.depth
        };
        {
            let c = self.nodes.get_mut(&child).unwrap_or_else(|| panic!("unknown child {child}"));
            assert!(!c.is_root, "{child} is a root and cannot be parented");
            assert!(c.parent.is_none(), "{child} already has a parent");
            c.parent = Some(parent);
            c.set_all_dirty_flags();
        }
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(child);
        }

        self.mark_subtree_connected(child, parent_depth + 1)
    }

    /// Disconnect `child` from `parent`
    ///
    /// The child keeps its own children; the whole subtree leaves the
    /// scene graph. Returns the disconnected nodes, descendants before
    /// their ancestors. Panics if `child` is not a child of `parent`.
    pub fn disconnect_child(&mut self, parent: NodeId, child: NodeId) -> Vec<NodeId> {
        let p = self.nodes.get_mut(&parent).unwrap_or_else(|| panic!("unknown parent {parent}"));
        let position = p
            .children
            .iter()
            .position(|c| *c == child)
            .unwrap_or_else(|| panic!("{child} is not a child of {parent}"));
        p.children.remove(position);
        p.dirty_flags |= NodeFlags::CHILD_DELETED;

        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = None;
        }

        let mut disconnected = Vec::new();
        self.mark_subtree_disconnected(child, &mut disconnected);
        disconnected
    }

    /// Remove a node from the arena
    ///
    /// The node is detached from its parent and its children become
    /// parentless, disconnected subtrees. A connected node must be
    /// disconnected first.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let mut node = self.nodes.remove(&id)?;
        assert!(!node.connected || node.is_root, "{id} must be disconnected before it is removed");

        if let Some(parent) = node.parent.take() {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != id);
            }
        }
        for child in node.children.drain(..) {
            if let Some(c) = self.nodes.get_mut(&child) {
                c.parent = None;
            }
        }
        self.roots.retain(|r| *r != id);
        Some(node)
    }

    /// True if the node and all its ancestors are visible in `buffer`
    pub fn is_fully_visible(&self, id: NodeId, buffer: BufferIndex) -> bool {
        let mut current = Some(id);
        while let Some(node) = current.and_then(|i| self.nodes.get(&i)) {
            if !node.is_visible(buffer) {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Node ids of the subtree under `id` in pre-order
    pub fn pre_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                order.push(current);
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    fn mark_subtree_connected(&mut self, id: NodeId, depth: u32) -> Vec<NodeId> {
        let mut connected = Vec::new();
        let mut stack = vec![(id, depth)];
        while let Some((current, depth)) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&current) {
                node.depth = depth;
                node.connected = true;
                node.set_all_dirty_flags();
                if let Some(attachment) = node.attachment.as_mut() {
                    attachment.connected_to_scene_graph();
                }
                connected.push(current);
                stack.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
            }
        }
        connected
    }

    fn mark_subtree_disconnected(&mut self, id: NodeId, out: &mut Vec<NodeId>) {
        let children = match self.nodes.get(&id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.mark_subtree_disconnected(child, out);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.connected = false;
            if let Some(attachment) = node.attachment.as_mut() {
                attachment.disconnected_from_scene_graph();
            }
        }
        out.push(id);
    }
}
