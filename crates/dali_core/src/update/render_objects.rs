//! Update-side bookkeeping of render-side objects.
//!
//! Renderers, geometries and shaders are created on the event thread and
//! used on the render thread. The update thread only tracks which ids are
//! alive, forwards data changes through the render queue, and parks
//! released objects in the discard queue.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use super::discard_queue::{DiscardQueue, Discardable};
use crate::common::{BufferIndex, GeometryId, RendererId, ShaderId};
use crate::foundation::math::Vec4;
use crate::render::{GeometryType, PropertyBufferData, RenderGeometry, RenderMessage, RenderQueue, Renderer};

/// Live render-side ids
#[derive(Debug)]
pub struct RenderObjects {
    renderers: HashSet<RendererId>,
    geometries: HashSet<GeometryId>,
    shaders: HashSet<ShaderId>,
    queue: Arc<RenderQueue>,
}

impl RenderObjects {
    /// Registry forwarding to `queue`
    pub fn new(queue: Arc<RenderQueue>) -> Self {
        Self { renderers: HashSet::new(), geometries: HashSet::new(), shaders: HashSet::new(), queue }
    }

    /// Register a renderer and hand it to the render thread
    pub fn add_renderer(&mut self, buffer: BufferIndex, renderer: Renderer) {
        if !self.geometries.contains(&renderer.geometry()) {
            warn!("{} uses unknown {}", renderer.id(), renderer.geometry());
        }
        if !self.shaders.contains(&renderer.shader()) {
            warn!("{} uses unknown {}", renderer.id(), renderer.shader());
        }
        self.renderers.insert(renderer.id());
        self.queue.push(buffer, RenderMessage::AddRenderer(renderer));
    }

    /// Forget a renderer; the render thread drops it with this frame
    pub fn remove_renderer(&mut self, buffer: BufferIndex, id: RendererId, discard: &mut DiscardQueue) {
        if self.renderers.remove(&id) {
            discard.add(buffer, Discardable::Renderer(id));
        } else {
            debug!("remove of unknown {id}");
        }
    }

    /// Register a geometry and hand it to the render thread
    pub fn add_geometry(&mut self, buffer: BufferIndex, id: GeometryId, geometry: RenderGeometry) {
        self.geometries.insert(id);
        self.queue.push(buffer, RenderMessage::AddGeometry { id, geometry });
    }

    /// Replace one vertex buffer
    pub fn set_vertex_data(&self, buffer: BufferIndex, geometry: GeometryId, index: usize, data: PropertyBufferData) {
        if self.geometries.contains(&geometry) {
            self.queue.push(buffer, RenderMessage::SetVertexData { geometry, buffer: index, data });
        } else {
            warn!("vertex data for unknown {geometry} dropped");
        }
    }

    /// Replace the index data
    pub fn set_index_data(&self, buffer: BufferIndex, geometry: GeometryId, data: PropertyBufferData) {
        if self.geometries.contains(&geometry) {
            self.queue.push(buffer, RenderMessage::SetIndexData { geometry, data });
        } else {
            warn!("index data for unknown {geometry} dropped");
        }
    }

    /// Change the primitive type
    pub fn set_geometry_type(&self, buffer: BufferIndex, geometry: GeometryId, geometry_type: GeometryType) {
        if self.geometries.contains(&geometry) {
            self.queue.push(buffer, RenderMessage::SetGeometryType { geometry, geometry_type });
        } else {
            warn!("geometry type for unknown {geometry} dropped");
        }
    }

    /// Forget a geometry; its GPU buffers are released on the render thread
    pub fn remove_geometry(&mut self, buffer: BufferIndex, id: GeometryId, discard: &mut DiscardQueue) {
        if self.geometries.remove(&id) {
            discard.add(buffer, Discardable::Geometry(id));
        } else {
            debug!("remove of unknown {id}");
        }
    }

    /// Register a shader program
    pub fn add_shader(&mut self, id: ShaderId) {
        self.shaders.insert(id);
    }

    /// Forget a shader program
    pub fn remove_shader(&mut self, buffer: BufferIndex, id: ShaderId, discard: &mut DiscardQueue) {
        if self.shaders.remove(&id) {
            discard.add(buffer, Discardable::Shader(id));
        }
    }

    /// Tell the render thread about a new background colour
    pub fn set_background_color(&self, buffer: BufferIndex, color: Vec4) {
        self.queue.push(buffer, RenderMessage::SetBackgroundColor(color));
    }

    /// True if the renderer is registered
    pub fn has_renderer(&self, id: RendererId) -> bool {
        self.renderers.contains(&id)
    }

    /// True if the geometry is registered
    pub fn has_geometry(&self, id: GeometryId) -> bool {
        self.geometries.contains(&id)
    }

    /// Registered renderers, geometries and shaders
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.renderers.len(), self.geometries.len(), self.shaders.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const B0: BufferIndex = BufferIndex::ZERO;

    #[test]
    fn test_renderer_lifecycle_goes_through_queue_and_discard() {
        let queue = Arc::new(RenderQueue::new());
        let mut discard = DiscardQueue::new(Arc::clone(&queue));
        let mut objects = RenderObjects::new(Arc::clone(&queue));

        let geometry = GeometryId::from_raw(1);
        let shader = ShaderId::from_raw(2);
        let renderer = RendererId::from_raw(3);
        objects.add_geometry(B0, geometry, RenderGeometry::quad());
        objects.add_shader(shader);
        objects.add_renderer(B0, Renderer::new(renderer, geometry, shader));
        assert_eq!(objects.counts(), (1, 1, 1));
        assert_eq!(queue.len(B0), 2);

        objects.remove_renderer(B0, renderer, &mut discard);
        objects.remove_geometry(B0, geometry, &mut discard);
        assert!(!objects.has_renderer(renderer));
        assert!(!objects.has_geometry(geometry));
        assert_eq!(discard.len(B0), 2);

        let messages = queue.drain(B0);
        assert!(matches!(messages[2], RenderMessage::RemoveRenderer(id) if id == renderer));
        assert!(matches!(messages[3], RenderMessage::GlCleanup(id) if id == geometry));
    }

    #[test]
    fn test_data_for_unknown_geometry_is_dropped() {
        let queue = Arc::new(RenderQueue::new());
        let objects = RenderObjects::new(Arc::clone(&queue));
        objects.set_index_data(B0, GeometryId::from_raw(9), PropertyBufferData::from_indices(&[0, 1, 2]));
        objects.set_geometry_type(B0, GeometryId::from_raw(9), GeometryType::Lines);
        assert!(queue.is_empty(B0));
    }
}
