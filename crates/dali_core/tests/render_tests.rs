//! Render list reuse, clip-space culling and deferred destruction.

use std::sync::Arc;

use dali_core::common::{BufferIndex, GeometryId, NodeId};
use dali_core::foundation::math::{BoundingBox, Mat4, Rect, Vec3};
use dali_core::nodes::Node;
use dali_core::render::{
    is_2d_box_outside_clip_space, is_3d_box_outside_clip_space, RenderFlags, RenderList, RenderMessage, RenderQueue,
};
use dali_core::update::{DiscardQueue, Discardable};

#[test]
fn test_render_list_reset_is_idempotent() {
    let mut list = RenderList::new();
    for _ in 0..3 {
        list.next_free_item();
    }
    list.set_flags(RenderFlags::DEPTH_BUFFER_ENABLED);

    list.reset();
    let (count, cached, flags) = (list.count(), list.cached_item_count(), list.flags());
    list.reset();
    assert_eq!((list.count(), list.cached_item_count(), list.flags()), (count, cached, flags));
    assert_eq!(count, 0);
    assert!(list.cached_item_count() >= list.count());
}

#[test]
fn test_cached_items_never_drop_below_count() {
    let mut list = RenderList::new();
    for round in [4_usize, 1, 6, 0, 2] {
        list.reset();
        for _ in 0..round {
            list.next_free_item();
            assert!(list.cached_item_count() >= list.count());
        }
    }
    assert_eq!(list.cached_item_count(), 6);
    list.release_unused_items();
    assert_eq!(list.cached_item_count(), 2);
}

#[test]
fn test_box_inside_clip_space_is_never_culled() {
    let mvp = Mat4::new_scaling(0.5);
    assert!(!is_3d_box_outside_clip_space(&mvp, &BoundingBox::centered(Vec3::new(1.5, 1.5, 1.5))));
    assert!(!is_2d_box_outside_clip_space(&mvp, &Rect::new(-1.0, -1.0, 2.0, 2.0)));
}

#[test]
fn test_box_beyond_one_plane_is_always_culled() {
    for offset in [Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 5.0, 0.0)] {
        let mvp = Mat4::new_translation(&offset);
        assert!(is_3d_box_outside_clip_space(&mvp, &BoundingBox::centered(Vec3::new(1.0, 1.0, 1.0))));
        assert!(is_2d_box_outside_clip_space(&mvp, &Rect::new(-0.5, -0.5, 1.0, 1.0)));
    }
}

#[test]
fn test_discarded_node_is_gone_after_two_cycles() {
    let queue = Arc::new(RenderQueue::new());
    let mut discard = DiscardQueue::new(Arc::clone(&queue));
    let id = NodeId::from_raw(7);

    discard.add(BufferIndex::ZERO, Discardable::Node(Box::new(Node::new(id))));
    assert!(discard.contains_node(id));

    discard.clear(BufferIndex::ONE);
    assert!(discard.contains_node(id));
    discard.clear(BufferIndex::ZERO);
    discard.clear(BufferIndex::ONE);
    assert!(!discard.contains_node(id));
    assert!(discard.is_empty());
}

#[test]
fn test_discarded_geometry_releases_gpu_buffers_immediately() {
    let queue = Arc::new(RenderQueue::new());
    let mut discard = DiscardQueue::new(Arc::clone(&queue));
    discard.add(BufferIndex::ONE, Discardable::Geometry(GeometryId::from_raw(3)));

    let messages = queue.drain(BufferIndex::ONE);
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0], RenderMessage::GlCleanup(id) if id == GeometryId::from_raw(3)));
    assert_eq!(discard.len(BufferIndex::ONE), 1);
}
