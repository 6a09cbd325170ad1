//! Per-layer lists of render items, reused from frame to frame.

use bitflags::bitflags;

use crate::common::{NodeId, RendererId};
use crate::foundation::math::{ClippingBox, Mat4, Vec4};

bitflags! {
    /// How a list uses the depth and stencil buffers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u32 {
        /// Depth testing on
        const DEPTH_BUFFER_ENABLED   = 0x01;
        /// Depth buffer writable
        const DEPTH_WRITE            = 0x02;
        /// Clear the depth buffer first
        const DEPTH_CLEAR            = 0x04;
        /// Stencil testing on
        const STENCIL_BUFFER_ENABLED = 0x08;
        /// Stencil buffer writable
        const STENCIL_WRITE          = 0x10;
        /// Clear the stencil buffer first
        const STENCIL_CLEAR          = 0x20;
    }
}

/// One draw: a renderer and the matrices it is drawn with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    /// Renderer to draw with; not owned
    pub renderer: RendererId,
    /// Node the item was produced from
    pub node: NodeId,
    /// World matrix scaled by the node size
    pub model_matrix: Mat4,
    /// View matrix times model matrix
    pub model_view_matrix: Mat4,
    /// World colour
    pub color: Vec4,
    /// Depth sort value
    pub sort_value: f32,
}

impl Default for RenderItem {
    fn default() -> Self {
        Self {
            renderer: RendererId::from_raw(0),
            node: NodeId::from_raw(0),
            model_matrix: Mat4::identity(),
            model_view_matrix: Mat4::identity(),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            sort_value: 0.0,
        }
    }
}

/// Ordered render items plus the state to draw them with
///
/// `reset` only rewinds the cursor; items beyond it stay cached so the
/// next frame can reuse them without allocating.
#[derive(Debug, Clone, Default)]
pub struct RenderList {
    items: Vec<RenderItem>,
    next_free: usize,
    flags: RenderFlags,
    clipping_box: Option<ClippingBox>,
    source_layer: Option<NodeId>,
}

impl RenderList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind for the next frame, keeping the cached items
    pub fn reset(&mut self) {
        self.next_free = 0;
        self.flags = RenderFlags::empty();
        self.clipping_box = None;
    }

    /// Rewind and make room for `size` items
    pub fn reserve(&mut self, size: usize) {
        self.next_free = 0;
        self.items.reserve(size.saturating_sub(self.items.len()));
    }

    /// Allocated capacity
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Next item to fill, reset to defaults
    pub fn next_free_item(&mut self) -> &mut RenderItem {
        if self.items.len() <= self.next_free {
            self.items.push(RenderItem::default());
        }
        let item = &mut self.items[self.next_free];
        self.next_free += 1;
        *item = RenderItem::default();
        item
    }

    /// Items in use
    pub fn items(&self) -> &[RenderItem] {
        &self.items[..self.next_free]
    }

    /// Items in use, mutable (for sorting)
    pub fn items_mut(&mut self) -> &mut [RenderItem] {
        &mut self.items[..self.next_free]
    }

    /// Item at `index`
    pub fn item(&self, index: usize) -> &RenderItem {
        debug_assert!(index < self.cached_item_count());
        &self.items[index]
    }

    /// Number of items in use
    pub const fn count(&self) -> usize {
        self.next_free
    }

    /// Number of items held, used or not
    pub fn cached_item_count(&self) -> usize {
        self.items.len()
    }

    /// True if no item is in use
    pub const fn is_empty(&self) -> bool {
        self.next_free == 0
    }

    /// Drop every flag
    pub fn clear_flags(&mut self) {
        self.flags = RenderFlags::empty();
    }

    /// Add flags
    pub fn set_flags(&mut self, flags: RenderFlags) {
        self.flags |= flags;
    }

    /// Current flags
    pub const fn flags(&self) -> RenderFlags {
        self.flags
    }

    /// Clip to `clipping_box` when `clipping` is on
    pub fn set_clipping(&mut self, clipping: bool, clipping_box: ClippingBox) {
        if clipping {
            self.clipping_box = Some(clipping_box);
        }
    }

    /// True if a clipping box is set
    pub const fn is_clipping(&self) -> bool {
        self.clipping_box.is_some()
    }

    /// Clipping box, in window coordinates
    pub const fn clipping_box(&self) -> Option<ClippingBox> {
        self.clipping_box
    }

    /// Trim cached items down to the ones in use
    pub fn release_unused_items(&mut self) {
        self.items.truncate(self.next_free);
    }

    /// Layer the items come from
    pub const fn source_layer(&self) -> Option<NodeId> {
        self.source_layer
    }

    /// Record the layer the items come from
    pub fn set_source_layer(&mut self, layer: NodeId) {
        self.source_layer = Some(layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Rect;

    fn filled(n: u64) -> RenderList {
        let mut list = RenderList::new();
        for i in 0..n {
            list.next_free_item().renderer = RendererId::from_raw(i);
        }
        list
    }

    #[test]
    fn test_reset_keeps_cache() {
        let mut list = filled(3);
        list.set_flags(RenderFlags::DEPTH_WRITE);
        list.reset();
        assert_eq!(list.count(), 0);
        assert_eq!(list.cached_item_count(), 3);
        assert!(list.flags().is_empty());

        list.reset();
        assert_eq!(list.count(), 0);
        assert_eq!(list.cached_item_count(), 3);
    }

    #[test]
    fn test_reused_items_are_fresh() {
        let mut list = filled(2);
        list.reset();
        let item = list.next_free_item();
        assert_eq!(item.renderer, RendererId::from_raw(0));
        assert_eq!(list.count(), 1);
        assert!(list.cached_item_count() >= list.count());
    }

    #[test]
    fn test_release_unused_items() {
        let mut list = filled(4);
        list.reset();
        list.next_free_item();
        list.release_unused_items();
        assert_eq!(list.cached_item_count(), 1);
        assert_eq!(list.items().len(), 1);
    }

    #[test]
    fn test_clipping_only_when_enabled() {
        let mut list = RenderList::new();
        list.set_clipping(false, Rect::new(0, 0, 10, 10));
        assert!(!list.is_clipping());
        list.set_clipping(true, Rect::new(0, 0, 10, 10));
        assert_eq!(list.clipping_box(), Some(Rect::new(0, 0, 10, 10)));
        list.reset();
        assert!(!list.is_clipping());
    }
}
