//! Layer specialisation of a node.

use crate::common::NodeId;
use crate::foundation::math::{ClippingBox, Vec3};

/// Computes the depth sort value of a renderable in a layer
///
/// Receives the view-space position of the renderable and its sort
/// modifier. Lower values are drawn first.
pub type SortFunction = fn(&Vec3, f32) -> f32;

/// Default sort: view-space z plus the sort modifier
///
/// The camera looks down -z, so items further away get lower values and
/// are drawn before nearer ones. A larger modifier brings an item forward.
pub fn default_sort_function(position: &Vec3, sort_modifier: f32) -> f32 {
    position.z + sort_modifier
}

/// Which of the four per-layer lists a renderable goes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderCategory {
    /// Writes the stencil buffer used to clip other renderables
    Stencil,
    /// Blended, drawn back to front
    Transparent,
    /// Fully opaque
    Opaque,
    /// Drawn after everything else in the layer
    Overlay,
}

/// Layer data attached to a node
///
/// The renderable lists are rebuilt by every update pass and hold the ids
/// of visible renderable nodes in tree order.
#[derive(Debug, Clone)]
pub struct Layer {
    stencil_renderables: Vec<NodeId>,
    transparent_renderables: Vec<NodeId>,
    opaque_renderables: Vec<NodeId>,
    overlay_renderables: Vec<NodeId>,
    sort_function: SortFunction,
    clipping: bool,
    clipping_box: ClippingBox,
    depth_test_disabled: bool,
}

impl Default for Layer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer {
    /// Layer with the default sort function and no clipping
    pub fn new() -> Self {
        Self {
            stencil_renderables: Vec::new(),
            transparent_renderables: Vec::new(),
            opaque_renderables: Vec::new(),
            overlay_renderables: Vec::new(),
            sort_function: default_sort_function,
            clipping: false,
            clipping_box: ClippingBox::default(),
            depth_test_disabled: false,
        }
    }

    /// Empty the four lists, keeping their storage
    pub fn clear_renderables(&mut self) {
        self.stencil_renderables.clear();
        self.transparent_renderables.clear();
        self.opaque_renderables.clear();
        self.overlay_renderables.clear();
    }

    /// Append a renderable node to a list
    pub fn add_renderable(&mut self, category: RenderCategory, node: NodeId) {
        match category {
            RenderCategory::Stencil => self.stencil_renderables.push(node),
            RenderCategory::Transparent => self.transparent_renderables.push(node),
            RenderCategory::Opaque => self.opaque_renderables.push(node),
            RenderCategory::Overlay => self.overlay_renderables.push(node),
        }
    }

    /// Renderable nodes of one category
    pub fn renderables(&self, category: RenderCategory) -> &[NodeId] {
        match category {
            RenderCategory::Stencil => &self.stencil_renderables,
            RenderCategory::Transparent => &self.transparent_renderables,
            RenderCategory::Opaque => &self.opaque_renderables,
            RenderCategory::Overlay => &self.overlay_renderables,
        }
    }

    /// Total renderables across the four lists
    pub fn renderable_count(&self) -> usize {
        self.stencil_renderables.len()
            + self.transparent_renderables.len()
            + self.opaque_renderables.len()
            + self.overlay_renderables.len()
    }

    /// Sort function for transparent items
    pub fn sort_function(&self) -> SortFunction {
        self.sort_function
    }

    /// Replace the sort function
    pub fn set_sort_function(&mut self, function: SortFunction) {
        self.sort_function = function;
    }

    /// Enable or disable scissor clipping
    pub fn set_clipping(&mut self, enabled: bool) {
        self.clipping = enabled;
    }

    /// True if clipping is enabled
    pub const fn is_clipping(&self) -> bool {
        self.clipping
    }

    /// Set the scissor rectangle
    pub fn set_clipping_box(&mut self, clipping_box: ClippingBox) {
        self.clipping_box = clipping_box;
    }

    /// The scissor rectangle
    pub const fn clipping_box(&self) -> ClippingBox {
        self.clipping_box
    }

    /// Disable depth testing for this layer
    pub fn set_depth_test_disabled(&mut self, disabled: bool) {
        self.depth_test_disabled = disabled;
    }

    /// True if depth testing is disabled
    pub const fn is_depth_test_disabled(&self) -> bool {
        self.depth_test_disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_and_clear() {
        let mut layer = Layer::new();
        layer.add_renderable(RenderCategory::Opaque, NodeId::from_raw(1));
        layer.add_renderable(RenderCategory::Transparent, NodeId::from_raw(2));
        layer.add_renderable(RenderCategory::Opaque, NodeId::from_raw(3));
        assert_eq!(layer.renderables(RenderCategory::Opaque), &[NodeId::from_raw(1), NodeId::from_raw(3)]);
        assert_eq!(layer.renderable_count(), 3);

        layer.clear_renderables();
        assert_eq!(layer.renderable_count(), 0);
    }

    #[test]
    fn test_default_sort_orders_far_first() {
        let far = default_sort_function(&Vec3::new(0.0, 0.0, -100.0), 0.0);
        let near = default_sort_function(&Vec3::new(0.0, 0.0, -10.0), 0.0);
        assert!(far < near);
        assert!(default_sort_function(&Vec3::new(0.0, 0.0, -100.0), 95.0) > near);
    }
}
