//! Deferred destruction of objects the render thread may still be reading.
//!
//! The update pass for buffer `N` can run while the render thread draws
//! buffer `N - 1`. An object dropped by the update side during buffer `N`
//! is parked in the sub-queue for `N`, and only freed when the update pass
//! reaches the same buffer index again, two frames later.
//!
//! Render-side resources are told to release their GPU objects through the
//! render queue at the moment they are parked, since that work has to run on
//! the thread owning the graphics context. Shaders are exempt: programs are
//! cached for the life of the process.

use std::sync::Arc;

use log::trace;

use crate::common::{BufferIndex, GeometryId, NodeId, RendererId, ShaderId};
use crate::nodes::Node;
use crate::render::{RenderMessage, RenderQueue};

/// Something waiting to be freed
#[derive(Debug)]
pub enum Discardable {
    /// A node removed from the arena, with its attachment
    Node(Box<Node>),
    /// A renderer dropped by the update side
    Renderer(RendererId),
    /// A geometry whose GPU buffers must be released
    Geometry(GeometryId),
    /// A shader; no GPU release
    Shader(ShaderId),
}

impl Discardable {
    fn render_message(&self) -> Option<RenderMessage> {
        match self {
            Self::Renderer(id) => Some(RenderMessage::RemoveRenderer(*id)),
            Self::Geometry(id) => Some(RenderMessage::GlCleanup(*id)),
            Self::Node(_) | Self::Shader(_) => None,
        }
    }
}

/// Two-generation deferred free list
#[derive(Debug)]
pub struct DiscardQueue {
    queues: [Vec<Discardable>; 2],
    render_queue: Arc<RenderQueue>,
}

impl DiscardQueue {
    /// Create a queue sending release messages through `render_queue`
    pub fn new(render_queue: Arc<RenderQueue>) -> Self {
        Self { queues: [Vec::new(), Vec::new()], render_queue }
    }

    /// Park `item` in the sub-queue of `buffer`
    pub fn add(&mut self, buffer: BufferIndex, item: Discardable) {
        if let Some(message) = item.render_message() {
            self.render_queue.push(buffer, message);
        }
        self.queues[buffer.get()].push(item);
    }

    /// Free everything parked the last time `buffer` was current
    ///
    /// Must run at the start of the update pass for `buffer`, before
    /// anything new is parked. Returns the number of freed entries.
    pub fn clear(&mut self, buffer: BufferIndex) -> usize {
        let queue = &mut self.queues[buffer.get()];
        let freed = queue.len();
        if freed > 0 {
            trace!("discard queue {}: freeing {freed} objects", buffer.get());
        }
        queue.clear();
        freed
    }

    /// Entries parked for `buffer`
    pub fn len(&self, buffer: BufferIndex) -> usize {
        self.queues[buffer.get()].len()
    }

    /// True if both sub-queues are empty
    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(Vec::is_empty)
    }

    /// True if a node with `id` is parked in either sub-queue
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.queues
            .iter()
            .flatten()
            .any(|item| matches!(item, Discardable::Node(node) if node.id() == id))
    }
}
