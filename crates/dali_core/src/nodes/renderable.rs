//! Renderable attachment: what a node draws and how it is culled.

use crate::common::{RendererId, ResourceId};
use crate::foundation::math::{BoundingBox, Rect};

/// Local-space shape used for culling
///
/// Bounds are expressed in the unit space of the renderable, before the
/// node size is applied, so the default rectangle covers the whole node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CullingBounds {
    /// Flat rectangle, tested with four corners
    Rect2d(Rect<f32>),
    /// Box, tested with eight corners
    Box3d(BoundingBox),
}

impl Default for CullingBounds {
    fn default() -> Self {
        Self::Rect2d(Rect::new(-0.5, -0.5, 1.0, 1.0))
    }
}

/// Loading state of an external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Still being decoded or uploaded
    Loading,
    /// Ready to draw
    Loaded,
    /// Will never become ready
    Failed,
}

/// Ticket for a resource owned by the resource loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTicket {
    /// Resource id
    pub id: ResourceId,
    /// Current state
    pub state: ResourceState,
}

/// Something a node draws through a render-side renderer
#[derive(Debug, Clone)]
pub struct RenderableAttachment {
    renderer: RendererId,
    bounds: CullingBounds,
    use_blend: bool,
    cull_enabled: bool,
    sort_modifier: f32,
    requires_depth_test: bool,
    resource: Option<ResourceTicket>,
    on_stage: bool,
}

impl RenderableAttachment {
    /// Renderable drawn by `renderer` with default bounds
    pub fn new(renderer: RendererId) -> Self {
        Self {
            renderer,
            bounds: CullingBounds::default(),
            use_blend: false,
            cull_enabled: true,
            sort_modifier: 0.0,
            requires_depth_test: false,
            resource: None,
            on_stage: false,
        }
    }

    /// Builder: culling bounds
    #[must_use]
    pub fn with_bounds(mut self, bounds: CullingBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Builder: always blend
    #[must_use]
    pub fn with_blending(mut self, use_blend: bool) -> Self {
        self.use_blend = use_blend;
        self
    }

    /// Builder: needs depth testing even when alone in its list
    #[must_use]
    pub fn with_depth_test(mut self, required: bool) -> Self {
        self.requires_depth_test = required;
        self
    }

    /// Builder: resource gating readiness
    #[must_use]
    pub fn with_resource(mut self, id: ResourceId) -> Self {
        self.resource = Some(ResourceTicket { id, state: ResourceState::Loading });
        self
    }

    /// Render-side renderer
    pub const fn renderer(&self) -> RendererId {
        self.renderer
    }

    /// Culling shape
    pub const fn bounds(&self) -> CullingBounds {
        self.bounds
    }

    /// True if blending was requested
    pub const fn use_blend(&self) -> bool {
        self.use_blend
    }

    /// Set blending
    pub fn set_use_blend(&mut self, use_blend: bool) {
        self.use_blend = use_blend;
    }

    /// True if the renderable may be culled
    pub const fn is_cull_enabled(&self) -> bool {
        self.cull_enabled
    }

    /// Enable or disable culling
    pub fn set_cull_enabled(&mut self, enabled: bool) {
        self.cull_enabled = enabled;
    }

    /// Depth sort modifier
    pub const fn sort_modifier(&self) -> f32 {
        self.sort_modifier
    }

    /// Set the depth sort modifier
    pub fn set_sort_modifier(&mut self, modifier: f32) {
        self.sort_modifier = modifier;
    }

    /// True if depth testing is needed
    pub const fn requires_depth_test(&self) -> bool {
        self.requires_depth_test
    }

    /// Resource ticket, if any
    pub const fn resource(&self) -> Option<ResourceTicket> {
        self.resource
    }

    /// Record a new state for the resource with `id`; returns false if the
    /// ticket belongs to another resource
    pub fn set_resource_state(&mut self, id: ResourceId, state: ResourceState) -> bool {
        match self.resource.as_mut() {
            Some(ticket) if ticket.id == id => {
                ticket.state = state;
                true
            }
            _ => false,
        }
    }

    /// Ready to draw: no resource or a loaded one
    pub fn is_ready(&self) -> bool {
        self.resource.map_or(true, |t| t.state == ResourceState::Loaded)
    }

    /// True if the resource failed to load
    pub fn has_resource_load_failed(&self) -> bool {
        self.resource.is_some_and(|t| t.state == ResourceState::Failed)
    }

    /// Opaque if not blended and the world colour is fully opaque
    pub fn is_fully_opaque(&self, world_alpha: f32) -> bool {
        !self.use_blend && world_alpha >= 1.0
    }

    /// True while the owning node is connected
    pub const fn is_on_stage(&self) -> bool {
        self.on_stage
    }

    pub(crate) fn set_on_stage(&mut self, on_stage: bool) {
        self.on_stage = on_stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_gates_readiness() {
        let resource = ResourceId::from_raw(7);
        let mut renderable = RenderableAttachment::new(RendererId::from_raw(1)).with_resource(resource);
        assert!(!renderable.is_ready());

        assert!(!renderable.set_resource_state(ResourceId::from_raw(8), ResourceState::Loaded));
        assert!(renderable.set_resource_state(resource, ResourceState::Failed));
        assert!(renderable.has_resource_load_failed());
        assert!(!renderable.is_ready());

        renderable.set_resource_state(resource, ResourceState::Loaded);
        assert!(renderable.is_ready());
    }

    #[test]
    fn test_opacity() {
        let renderable = RenderableAttachment::new(RendererId::from_raw(1));
        assert!(renderable.is_fully_opaque(1.0));
        assert!(!renderable.is_fully_opaque(0.5));
        assert!(!renderable.with_blending(true).is_fully_opaque(1.0));
    }
}
