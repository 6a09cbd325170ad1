//! World transform and colour propagation.
//!
//! A pre-order walk from every root: a child's world values depend only on
//! its local properties and its parent's world values from the same walk.
//! Nodes whose own and inherited flags are clean keep last frame's world
//! values; the walk still descends, since a clean parent may have dirty
//! children.

use crate::common::{BufferIndex, NodeId};
use crate::foundation::math::utils::compose;
use crate::foundation::math::{Quat, Vec3, Vec4};
use crate::nodes::node::HALF;
use crate::nodes::{ColorMode, Node, NodeAttachment, NodeFlags, PositionInheritance, SceneGraph};

#[derive(Debug, Clone, Copy)]
struct ParentState {
    position: Vec3,
    orientation: Quat,
    scale: Vec3,
    color: Vec4,
    size: Vec3,
    flags: NodeFlags,
}

impl ParentState {
    fn of(node: &Node, buffer: BufferIndex) -> Self {
        Self {
            position: node.world_position(),
            orientation: node.world_orientation(),
            scale: node.world_scale(),
            color: node.world_color(),
            size: node.size().get(buffer),
            flags: node.dirty_flags,
        }
    }

    /// Flags a child picks up from this parent
    fn inherited_flags(&self) -> NodeFlags {
        let mut flags = self.flags & NodeFlags::INHERITED;
        if self.flags.contains(NodeFlags::SIZE) {
            // children are positioned relative to the parent's size
            flags |= NodeFlags::TRANSFORM;
        }
        flags
    }
}

/// Counters for one transform pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Connected nodes visited
    pub nodes_visited: usize,
    /// Nodes whose world transform was recomputed
    pub transforms_updated: usize,
    /// Nodes whose world colour was recomputed
    pub colors_updated: usize,
}

/// Recompute world values of every connected node for `buffer`
///
/// Resolved flags (own plus inherited) are stored on each node so the
/// render-instruction pass can see what changed.
pub fn update_node_transforms(graph: &mut SceneGraph, buffer: BufferIndex) -> TransformStats {
    let mut stats = TransformStats::default();
    let mut stack: Vec<(NodeId, Option<ParentState>)> = graph.roots().iter().rev().map(|r| (*r, None)).collect();

    while let Some((id, parent)) = stack.pop() {
        let Some(node) = graph.node_mut(id) else { continue };
        if !node.is_connected() {
            continue;
        }
        stats.nodes_visited += 1;

        let mut flags = node.dirty_flags();
        if let Some(parent) = parent.as_ref() {
            flags |= parent.inherited_flags();
        }

        if flags.contains(NodeFlags::TRANSFORM) {
            update_world_transform(node, buffer, parent.as_ref());
            stats.transforms_updated += 1;
        }
        if flags.contains(NodeFlags::COLOR) {
            update_world_color(node, buffer, parent.as_ref());
            stats.colors_updated += 1;
        }

        let (position, orientation) = (node.world_position(), node.world_orientation());
        if let Some(NodeAttachment::Camera(camera)) = node.attachment.as_mut() {
            camera.update(buffer, &position, &orientation, flags.contains(NodeFlags::TRANSFORM));
        }

        node.dirty_flags = flags;
        let state = ParentState::of(node, buffer);
        stack.extend(node.children.iter().rev().map(|c| (*c, Some(state))));
    }

    stats
}

fn update_world_transform(node: &mut Node, buffer: BufferIndex, parent: Option<&ParentState>) {
    let local_position = node.position().get(buffer);
    let local_orientation = node.orientation().get(buffer);
    let local_scale = node.scale().get(buffer);

    let (position, orientation, scale) = match parent {
        None => (local_position, local_orientation, local_scale),
        Some(parent) => {
            let orientation = if node.inherit_orientation() {
                parent.orientation * local_orientation
            } else {
                local_orientation
            };
            let scale = if node.inherit_scale() { parent.scale.component_mul(&local_scale) } else { local_scale };

            let position = match node.position_inheritance() {
                PositionInheritance::InheritParentPosition => {
                    let anchor = (HALF - node.anchor_point()).component_mul(&node.size().get(buffer));
                    let anchor = local_orientation * anchor.component_mul(&local_scale);
                    let origin = (node.parent_origin() - HALF).component_mul(&parent.size);
                    let offset = (local_position + origin + anchor).component_mul(&parent.scale);
                    parent.position + parent.orientation * offset
                }
                PositionInheritance::UseParentPosition => parent.position,
                PositionInheritance::DontInherit => local_position,
            };
            (position, orientation, scale)
        }
    };

    node.world_position.set(position);
    node.world_orientation.set(orientation);
    node.world_scale.set(scale);
    node.world_matrix.set(compose(&position, &orientation, &scale));
}

fn update_world_color(node: &mut Node, buffer: BufferIndex, parent: Option<&ParentState>) {
    let own = node.color().get(buffer);
    let color = match parent {
        None => own,
        Some(parent) => match node.color_mode() {
            ColorMode::UseOwnColor => own,
            ColorMode::UseParentColor => parent.color,
            ColorMode::UseOwnMultiplyParentColor => own.component_mul(&parent.color),
            ColorMode::UseOwnMultiplyParentAlpha => Vec4::new(own.x, own.y, own.z, own.w * parent.color.w),
        },
    };
    node.world_color.set(color);
}
