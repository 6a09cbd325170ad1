//! Tree structure, dirty flags and double-buffered property behaviour.

use dali_core::common::{BufferIndex, IdAllocator, NodeId};
use dali_core::foundation::math::{Vec3, Vec4};
use dali_core::nodes::{Node, NodeFlags, SceneGraph};
use dali_core::property::AnimatableProperty;

const B0: BufferIndex = BufferIndex::ZERO;
const B1: BufferIndex = BufferIndex::ONE;

fn tree(ids: &IdAllocator, extra: usize) -> (SceneGraph, NodeId, Vec<NodeId>) {
    let mut graph = SceneGraph::new();
    let root = ids.node();
    graph.add_node(Node::new_layer(root));
    graph.install_root(root);

    let nodes: Vec<NodeId> = (0..extra)
        .map(|_| {
            let id = ids.node();
            graph.add_node(Node::new(id));
            id
        })
        .collect();
    (graph, root, nodes)
}

#[test]
fn test_depth_is_parent_depth_plus_one() {
    let ids = IdAllocator::new();
    let (mut graph, root, nodes) = tree(&ids, 4);
    graph.connect_child(root, nodes[0]);
    graph.connect_child(nodes[0], nodes[1]);
    graph.connect_child(nodes[1], nodes[2]);
    graph.connect_child(root, nodes[3]);

    for node in graph.iter().filter(|n| n.is_connected()) {
        if let Some(parent) = node.parent() {
            assert_eq!(node.depth(), graph.node(parent).unwrap().depth() + 1);
        }
    }
    assert_eq!(graph.node(nodes[2]).unwrap().depth(), 3);
}

#[test]
fn test_reconnected_subtree_gets_new_depths() {
    let ids = IdAllocator::new();
    let (mut graph, root, nodes) = tree(&ids, 3);
    graph.connect_child(root, nodes[0]);
    graph.connect_child(nodes[0], nodes[1]);
    graph.connect_child(root, nodes[2]);

    graph.disconnect_child(root, nodes[0]);
    assert!(!graph.node(nodes[1]).unwrap().is_connected());
    graph.connect_child(nodes[2], nodes[0]);
    assert_eq!(graph.node(nodes[0]).unwrap().depth(), 2);
    assert_eq!(graph.node(nodes[1]).unwrap().depth(), 3);
}

#[test]
fn test_connect_then_disconnect_restores_children() {
    let ids = IdAllocator::new();
    let (mut graph, root, nodes) = tree(&ids, 4);
    graph.connect_child(root, nodes[0]);
    graph.connect_child(root, nodes[1]);
    graph.connect_child(root, nodes[2]);
    let before = graph.node(root).unwrap().children().to_vec();

    graph.connect_child(root, nodes[3]);
    graph.disconnect_child(root, nodes[3]);
    assert_eq!(graph.node(root).unwrap().children(), before.as_slice());

    graph.disconnect_child(root, nodes[1]);
    assert_eq!(graph.node(root).unwrap().children(), &[nodes[0], nodes[2]]);
    assert!(graph.node(root).unwrap().dirty_flags().contains(NodeFlags::CHILD_DELETED));
}

#[test]
#[should_panic(expected = "not a child")]
fn test_disconnecting_a_non_child_panics() {
    let ids = IdAllocator::new();
    let (mut graph, root, nodes) = tree(&ids, 2);
    graph.connect_child(root, nodes[0]);
    graph.disconnect_child(nodes[0], nodes[1]);
}

#[test]
fn test_bake_marks_node_dirty_until_next_reset() {
    let mut node = Node::new(NodeId::from_raw(1));
    node.reset_default_properties(B0);
    node.reset_default_properties(B1);
    assert!(!node.dirty_flags().contains(NodeFlags::TRANSFORM));

    node.position_mut().bake(B0, Vec3::new(1.0, 2.0, 3.0));
    assert!(node.dirty_flags().contains(NodeFlags::TRANSFORM));
    node.color_mut().bake(B0, Vec4::new(1.0, 0.0, 0.0, 1.0));
    assert!(node.dirty_flags().contains(NodeFlags::COLOR));

    node.reset_default_properties(B1);
    assert!(!node.dirty_flags().contains(NodeFlags::TRANSFORM));
    assert_eq!(node.position().get(B0), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_bake_writes_both_buffers_set_only_one() {
    let mut property = AnimatableProperty::new(0.0_f32);

    property.bake(B0, 4.0);
    assert_eq!(property.get(B0), 4.0);
    assert_eq!(property.get(B1), 4.0);

    property.set(B1, 9.0);
    assert_eq!(property.get(B1), 9.0);
    assert_eq!(property.get(B0), 4.0);

    property.reset_to_base_value(B1);
    assert_eq!(property.get(B1), 4.0);
    property.reset_to_base_value(B0);
    assert!(property.is_clean());
}
