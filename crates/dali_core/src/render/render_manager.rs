//! # Render Manager
//!
//! Owns everything the render thread touches: the graphics context, the
//! render-side renderers and geometries, and the read ends of the render
//! queue and instruction buffers. One call to [`RenderManager::render`]
//! draws the frame the update side published for a buffer index.
//!
//! ## Frame Flow
//!
//! ```text
//! process_queue(buffer)       add/remove renderers, geometry data, GlCleanup
//! clear default surface       background colour, default viewport
//! for each instruction
//!     viewport, optional clear
//!     for each render list
//!         depth/stencil state from RenderFlags, scissor from clipping box
//!         for each item: Renderer::render -> RenderGeometry::upload_and_draw
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};

use super::context::Context;
use super::geometry::RenderGeometry;
use super::instruction::{RenderInstruction, RenderInstructionBuffers};
use super::queue::{RenderMessage, RenderQueue};
use super::render_list::{RenderFlags, RenderList};
use super::renderer::Renderer;
use crate::common::{BufferIndex, GeometryId, RendererId};
use crate::core::RenderConfig;
use crate::foundation::math::{Vec4, Viewport};

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frame number the instructions were prepared for
    pub frame: u64,
    /// Instructions drawn
    pub instructions: usize,
    /// Render lists drawn
    pub render_lists: usize,
    /// Render items visited
    pub items: usize,
    /// Items that produced a draw call
    pub draw_calls: usize,
}

/// Render-thread state and draw loop
pub struct RenderManager<C: Context> {
    context: C,
    renderers: HashMap<RendererId, Renderer>,
    geometries: HashMap<GeometryId, RenderGeometry>,
    queue: Arc<RenderQueue>,
    instructions: Arc<RenderInstructionBuffers>,
    background: Vec4,
    default_viewport: Viewport,
    depth_test_enabled: bool,
}

impl<C: Context> RenderManager<C> {
    /// Create a render manager reading from `queue` and `instructions`
    pub fn new(
        context: C,
        config: &RenderConfig,
        queue: Arc<RenderQueue>,
        instructions: Arc<RenderInstructionBuffers>,
    ) -> Self {
        Self {
            context,
            renderers: HashMap::new(),
            geometries: HashMap::new(),
            queue,
            instructions,
            background: config.background(),
            default_viewport: config.default_viewport,
            depth_test_enabled: config.depth_test_enabled,
        }
    }

    /// Graphics context
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Mutable graphics context
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Tear down the manager, handing the context back
    pub fn into_context(self) -> C {
        self.context
    }

    /// Current background colour
    pub const fn background_color(&self) -> Vec4 {
        self.background
    }

    /// Renderer by id
    pub fn renderer(&self, id: RendererId) -> Option<&Renderer> {
        self.renderers.get(&id)
    }

    /// Number of live renderers
    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    /// True if the geometry is still held
    pub fn has_geometry(&self, id: GeometryId) -> bool {
        self.geometries.contains_key(&id)
    }

    /// Number of live geometries
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// The context was lost and recreated: re-upload every buffer
    pub fn gl_context_created(&mut self) {
        for geometry in self.geometries.values_mut() {
            geometry.gl_context_created();
        }
    }

    /// Apply every message the update side queued for `buffer`
    pub fn process_queue(&mut self, buffer: BufferIndex) -> usize {
        let messages = self.queue.drain(buffer);
        let count = messages.len();
        for message in messages {
            self.process_message(message);
        }
        count
    }

    fn process_message(&mut self, message: RenderMessage) {
        match message {
            RenderMessage::AddRenderer(renderer) => {
                self.renderers.insert(renderer.id(), renderer);
            }
            RenderMessage::RemoveRenderer(id) => {
                if self.renderers.remove(&id).is_none() {
                    debug!("remove of unknown {id}");
                }
            }
            RenderMessage::AddGeometry { id, geometry } => {
                self.geometries.insert(id, geometry);
            }
            RenderMessage::SetVertexData { geometry, buffer, data } => {
                let updated = self.geometries.get_mut(&geometry).is_some_and(|g| g.set_vertex_data(buffer, data));
                if !updated {
                    warn!("vertex data for missing buffer {buffer} of {geometry}");
                }
            }
            RenderMessage::SetIndexData { geometry, data } => match self.geometries.get_mut(&geometry) {
                Some(g) => g.set_indices(data),
                None => warn!("index data for missing {geometry}"),
            },
            RenderMessage::SetGeometryType { geometry, geometry_type } => match self.geometries.get_mut(&geometry) {
                Some(g) => g.set_geometry_type(geometry_type),
                None => warn!("geometry type for missing {geometry}"),
            },
            RenderMessage::GlCleanup(id) => {
                if let Some(mut geometry) = self.geometries.remove(&id) {
                    geometry.gl_cleanup(&mut self.context);
                    trace!("released GPU buffers of {id}");
                }
            }
            RenderMessage::SetBackgroundColor(color) => self.background = color,
        }
    }

    /// Draw the instructions published for `buffer`
    pub fn render(&mut self, buffer: BufferIndex) -> RenderStats {
        self.process_queue(buffer);

        self.context.set_viewport(self.default_viewport);
        self.context.clear(Some(self.background), true, true);

        let instructions = Arc::clone(&self.instructions);
        let container = instructions.lock(buffer);
        let mut stats = RenderStats { frame: container.frame(), ..RenderStats::default() };

        for instruction in container.instructions() {
            self.draw_instruction(instruction, &mut stats);
        }

        self.context.set_scissor(None);
        trace!(
            "rendered frame {}: {} instructions, {} lists, {} draws",
            stats.frame,
            stats.instructions,
            stats.render_lists,
            stats.draw_calls
        );
        stats
    }

    fn draw_instruction(&mut self, instruction: &RenderInstruction, stats: &mut RenderStats) {
        stats.instructions += 1;
        if let Some(viewport) = instruction.viewport() {
            self.context.set_viewport(viewport);
        }
        if let Some(color) = instruction.clear_color() {
            self.context.clear(Some(color), true, true);
        }

        let projection = instruction.projection_matrix();
        for list in instruction.render_lists() {
            if list.is_empty() {
                continue;
            }
            stats.render_lists += 1;
            self.apply_list_state(list);

            for item in list.items() {
                stats.items += 1;
                let Some(renderer) = self.renderers.get(&item.renderer) else {
                    debug!("{} not on the render side yet", item.renderer);
                    continue;
                };
                if renderer.render(&mut self.context, &mut self.geometries, item, projection) {
                    stats.draw_calls += 1;
                }
            }
        }
    }

    fn apply_list_state(&mut self, list: &RenderList) {
        let flags = list.flags();

        let depth_test = self.depth_test_enabled && flags.contains(RenderFlags::DEPTH_BUFFER_ENABLED);
        self.context.set_depth_state(depth_test, depth_test && flags.contains(RenderFlags::DEPTH_WRITE));
        self.context.set_stencil_state(
            flags.contains(RenderFlags::STENCIL_BUFFER_ENABLED),
            flags.contains(RenderFlags::STENCIL_WRITE),
        );

        let clear_depth = depth_test && flags.contains(RenderFlags::DEPTH_CLEAR);
        let clear_stencil = flags.contains(RenderFlags::STENCIL_CLEAR);
        if clear_depth || clear_stencil {
            self.context.clear(None, clear_depth, clear_stencil);
        }

        self.context.set_scissor(list.clipping_box());
    }
}

impl<C: Context> std::fmt::Debug for RenderManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderManager")
            .field("renderers", &self.renderers.len())
            .field("geometries", &self.geometries.len())
            .field("background", &self.background)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{NodeId, RenderTaskId, ShaderId};
    use crate::foundation::math::{Mat4, Rect};
    use crate::render::context::{GlCall, RecordingContext};

    struct Fixture {
        manager: RenderManager<RecordingContext>,
        queue: Arc<RenderQueue>,
        instructions: Arc<RenderInstructionBuffers>,
    }

    fn fixture() -> Fixture {
        let queue = Arc::new(RenderQueue::new());
        let instructions = Arc::new(RenderInstructionBuffers::new());
        let manager = RenderManager::new(
            RecordingContext::new(),
            &RenderConfig::default(),
            Arc::clone(&queue),
            Arc::clone(&instructions),
        );
        Fixture { manager, queue, instructions }
    }

    fn add_quad_renderer(queue: &RenderQueue, buffer: BufferIndex, renderer: u64, geometry: u64) {
        let geometry = GeometryId::from_raw(geometry);
        queue.push(buffer, RenderMessage::AddGeometry { id: geometry, geometry: RenderGeometry::quad() });
        queue.push(
            buffer,
            RenderMessage::AddRenderer(Renderer::new(RendererId::from_raw(renderer), geometry, ShaderId::from_raw(1))),
        );
    }

    fn publish_items(instructions: &RenderInstructionBuffers, buffer: BufferIndex, frame: u64, renderers: &[u64]) {
        let mut container = instructions.lock(buffer);
        container.reset_and_reserve(frame, 1);
        let instruction = container.next_instruction();
        instruction.reset(RenderTaskId::from_raw(1), Mat4::identity(), Mat4::identity(), None, None);
        let list = instruction.next_free_render_list(renderers.len());
        list.set_flags(RenderFlags::DEPTH_BUFFER_ENABLED | RenderFlags::DEPTH_WRITE | RenderFlags::DEPTH_CLEAR);
        list.set_clipping(true, Rect::new(0, 0, 100, 100));
        for raw in renderers {
            let item = list.next_free_item();
            item.renderer = RendererId::from_raw(*raw);
            item.node = NodeId::from_raw(*raw);
        }
        drop(container);
        instructions.publish(frame);
    }

    #[test]
    fn test_draws_published_items() {
        let mut f = fixture();
        let buffer = BufferIndex::ZERO;
        add_quad_renderer(&f.queue, buffer, 10, 20);
        publish_items(&f.instructions, buffer, 1, &[10, 10]);

        let stats = f.manager.render(buffer);
        assert_eq!(stats.frame, 1);
        assert_eq!(stats.items, 2);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(f.manager.context().draw_call_count(), 2);

        let calls = f.manager.context().calls();
        assert!(calls.contains(&GlCall::DepthState { test: true, write: true }));
        assert!(calls.contains(&GlCall::Clear { color: None, depth: true, stencil: false }));
        assert!(calls.contains(&GlCall::Scissor(Some(Rect::new(0, 0, 100, 100)))));
        assert_eq!(calls.last(), Some(&GlCall::Scissor(None)));
    }

    #[test]
    fn test_unknown_renderer_is_skipped() {
        let mut f = fixture();
        publish_items(&f.instructions, BufferIndex::ONE, 2, &[99]);
        let stats = f.manager.render(BufferIndex::ONE);
        assert_eq!(stats.items, 1);
        assert_eq!(stats.draw_calls, 0);
    }

    #[test]
    fn test_gl_cleanup_releases_geometry() {
        let mut f = fixture();
        let buffer = BufferIndex::ZERO;
        add_quad_renderer(&f.queue, buffer, 10, 20);
        publish_items(&f.instructions, buffer, 1, &[10]);
        f.manager.render(buffer);
        assert_eq!(f.manager.context().live_buffer_count(), 2);

        f.queue.push(buffer, RenderMessage::RemoveRenderer(RendererId::from_raw(10)));
        f.queue.push(buffer, RenderMessage::GlCleanup(GeometryId::from_raw(20)));
        f.manager.process_queue(buffer);

        assert_eq!(f.manager.renderer_count(), 0);
        assert!(!f.manager.has_geometry(GeometryId::from_raw(20)));
        assert_eq!(f.manager.context().live_buffer_count(), 0);
    }

    #[test]
    fn test_background_clears_default_surface() {
        let mut f = fixture();
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        f.queue.push(BufferIndex::ZERO, RenderMessage::SetBackgroundColor(red));
        f.manager.render(BufferIndex::ZERO);
        assert_eq!(f.manager.background_color(), red);
        assert!(f
            .manager
            .context()
            .calls()
            .contains(&GlCall::Clear { color: Some(red), depth: true, stencil: true }));
    }
}
