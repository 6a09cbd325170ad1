//! Update-to-render message queue.
//!
//! One message list per buffer index. The update thread appends to the
//! list of the buffer it is writing; the render thread drains that list
//! before drawing the same buffer one frame later.

use std::sync::{Mutex, PoisonError};

use super::geometry::{GeometryType, RenderGeometry};
use super::property_buffer::PropertyBufferData;
use super::renderer::Renderer;
use crate::common::{BufferIndex, GeometryId, RendererId};
use crate::foundation::math::Vec4;

/// Work for the render thread
#[derive(Debug)]
pub enum RenderMessage {
    /// Start drawing with a renderer
    AddRenderer(Renderer),
    /// Stop drawing with a renderer
    RemoveRenderer(RendererId),
    /// Take ownership of a geometry
    AddGeometry {
        /// Geometry id
        id: GeometryId,
        /// Initial data
        geometry: RenderGeometry,
    },
    /// Replace the data of one vertex buffer
    SetVertexData {
        /// Target geometry
        geometry: GeometryId,
        /// Vertex buffer index within the geometry
        buffer: usize,
        /// New data
        data: PropertyBufferData,
    },
    /// Replace the index data
    SetIndexData {
        /// Target geometry
        geometry: GeometryId,
        /// New data
        data: PropertyBufferData,
    },
    /// Change the primitive type
    SetGeometryType {
        /// Target geometry
        geometry: GeometryId,
        /// New type
        geometry_type: GeometryType,
    },
    /// Release the GPU resources of a geometry and forget it
    GlCleanup(GeometryId),
    /// Colour used by tasks that clear without their own colour
    SetBackgroundColor(Vec4),
}

/// Per-buffer message lists
#[derive(Debug, Default)]
pub struct RenderQueue {
    queues: [Mutex<Vec<RenderMessage>>; 2],
}

impl RenderQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message for the frame written to `buffer`
    pub fn push(&self, buffer: BufferIndex, message: RenderMessage) {
        self.queues[buffer.get()].lock().unwrap_or_else(PoisonError::into_inner).push(message);
    }

    /// Take every message for `buffer`, in the order they were pushed
    pub fn drain(&self, buffer: BufferIndex) -> Vec<RenderMessage> {
        std::mem::take(&mut *self.queues[buffer.get()].lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of messages waiting for `buffer`
    pub fn len(&self, buffer: BufferIndex) -> usize {
        self.queues[buffer.get()].lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing waits for `buffer`
    pub fn is_empty(&self, buffer: BufferIndex) -> bool {
        self.len(buffer) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_are_separate() {
        let queue = RenderQueue::new();
        queue.push(BufferIndex::ZERO, RenderMessage::RemoveRenderer(RendererId::from_raw(1)));
        queue.push(BufferIndex::ONE, RenderMessage::GlCleanup(GeometryId::from_raw(2)));
        queue.push(BufferIndex::ZERO, RenderMessage::RemoveRenderer(RendererId::from_raw(3)));

        assert_eq!(queue.len(BufferIndex::ZERO), 2);
        let drained = queue.drain(BufferIndex::ZERO);
        assert!(matches!(drained[1], RenderMessage::RemoveRenderer(id) if id == RendererId::from_raw(3)));
        assert!(queue.is_empty(BufferIndex::ZERO));
        assert_eq!(queue.len(BufferIndex::ONE), 1);
    }
}
