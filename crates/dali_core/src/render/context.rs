//! # Graphics Context Abstraction
//!
//! The render thread issues every graphics call through the [`Context`]
//! trait, so the render manager, renderers and geometry never touch a
//! graphics API directly. A platform layer implements it over GL; the
//! crate ships [`RecordingContext`], which records the calls and backs the
//! tests and the headless demo.
//!
//! A context belongs to the render thread. Buffer handles it returns are
//! only meaningful to that context.

use std::collections::HashSet;

use crate::common::ShaderId;
use crate::foundation::math::{ClippingBox, Mat4, Vec4, Viewport};

/// Handle to a buffer object owned by the context
pub type BufferHandle = u32;

/// Primitive topology of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    /// Independent triangles
    Triangles,
    /// Independent line segments
    Lines,
    /// Points
    Points,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
    /// Closed line loop
    LineLoop,
    /// Open line strip
    LineStrip,
}

/// What a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Vertex attributes
    Array,
    /// 16-bit indices
    ElementArray,
}

/// Graphics entry points used by the render thread
pub trait Context: Send {
    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport);

    /// Clear the colour buffer (when `color` is given) and optionally the
    /// depth and stencil buffers
    fn clear(&mut self, color: Option<Vec4>, depth: bool, stencil: bool);

    /// Enable the scissor test with `clip`, or disable it with `None`
    fn set_scissor(&mut self, clip: Option<ClippingBox>);

    /// Depth test and depth write switches
    fn set_depth_state(&mut self, test: bool, write: bool);

    /// Stencil test and stencil write switches
    fn set_stencil_state(&mut self, test: bool, write: bool);

    /// Blending on or off
    fn set_blending(&mut self, enabled: bool);

    /// Create a buffer object
    fn create_buffer(&mut self) -> BufferHandle;

    /// Upload `data` into `buffer`
    ///
    /// # Arguments
    /// * `target` - How the buffer is bound
    /// * `buffer` - Handle from [`Context::create_buffer`]
    /// * `data` - Raw bytes, replacing the previous contents
    fn buffer_data(&mut self, target: BufferTarget, buffer: BufferHandle, data: &[u8]);

    /// Bind a buffer for the following attribute pointers or draw
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle);

    /// Delete a buffer object
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Point attribute `location` at the bound array buffer
    ///
    /// # Arguments
    /// * `location` - Attribute location in the current program
    /// * `components` - Floats per vertex
    /// * `stride` - Bytes between consecutive vertices
    /// * `offset` - Byte offset of the attribute within a vertex
    fn vertex_attribute_pointer(&mut self, location: u32, components: u32, stride: u32, offset: u32);

    /// Disable an attribute array after a draw
    fn disable_vertex_attribute(&mut self, location: u32);

    /// Make `shader` the current program
    fn use_program(&mut self, shader: ShaderId);

    /// Set a matrix uniform on the current program
    fn set_uniform_matrix(&mut self, name: &'static str, value: &Mat4);

    /// Set a vector uniform on the current program
    fn set_uniform_vec4(&mut self, name: &'static str, value: &Vec4);

    /// Indexed draw using the bound element buffer
    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32);

    /// Non-indexed draw of `count` vertices
    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32);
}

/// One recorded context call
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum GlCall {
    Viewport(Viewport),
    Clear { color: Option<Vec4>, depth: bool, stencil: bool },
    Scissor(Option<ClippingBox>),
    DepthState { test: bool, write: bool },
    StencilState { test: bool, write: bool },
    Blending(bool),
    CreateBuffer(BufferHandle),
    BufferData { target: BufferTarget, buffer: BufferHandle, size: usize },
    BindBuffer { target: BufferTarget, buffer: BufferHandle },
    DeleteBuffer(BufferHandle),
    VertexAttributePointer { location: u32, components: u32, stride: u32, offset: u32 },
    DisableVertexAttribute(u32),
    UseProgram(ShaderId),
    UniformMatrix(&'static str),
    UniformVec4(&'static str, Vec4),
    DrawElements { mode: PrimitiveMode, count: u32 },
    DrawArrays { mode: PrimitiveMode, first: u32, count: u32 },
}

/// Context that records calls instead of issuing them
#[derive(Debug, Default)]
pub struct RecordingContext {
    calls: Vec<GlCall>,
    next_buffer: BufferHandle,
    live_buffers: HashSet<BufferHandle>,
}

impl RecordingContext {
    /// Empty recording
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded since the last [`RecordingContext::take_calls`]
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Take the recorded calls, leaving the recording empty
    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of draw calls recorded
    pub fn draw_call_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GlCall::DrawElements { .. } | GlCall::DrawArrays { .. }))
            .count()
    }

    /// Buffers created and not yet deleted
    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }
}

impl Context for RecordingContext {
    fn set_viewport(&mut self, viewport: Viewport) {
        self.calls.push(GlCall::Viewport(viewport));
    }

    fn clear(&mut self, color: Option<Vec4>, depth: bool, stencil: bool) {
        self.calls.push(GlCall::Clear { color, depth, stencil });
    }

    fn set_scissor(&mut self, clip: Option<ClippingBox>) {
        self.calls.push(GlCall::Scissor(clip));
    }

    fn set_depth_state(&mut self, test: bool, write: bool) {
        self.calls.push(GlCall::DepthState { test, write });
    }

    fn set_stencil_state(&mut self, test: bool, write: bool) {
        self.calls.push(GlCall::StencilState { test, write });
    }

    fn set_blending(&mut self, enabled: bool) {
        self.calls.push(GlCall::Blending(enabled));
    }

    fn create_buffer(&mut self) -> BufferHandle {
        self.next_buffer += 1;
        self.live_buffers.insert(self.next_buffer);
        self.calls.push(GlCall::CreateBuffer(self.next_buffer));
        self.next_buffer
    }

    fn buffer_data(&mut self, target: BufferTarget, buffer: BufferHandle, data: &[u8]) {
        debug_assert!(self.live_buffers.contains(&buffer), "upload to deleted buffer {buffer}");
        self.calls.push(GlCall::BufferData { target, buffer, size: data.len() });
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle) {
        self.calls.push(GlCall::BindBuffer { target, buffer });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.live_buffers.remove(&buffer);
        self.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn vertex_attribute_pointer(&mut self, location: u32, components: u32, stride: u32, offset: u32) {
        self.calls.push(GlCall::VertexAttributePointer { location, components, stride, offset });
    }

    fn disable_vertex_attribute(&mut self, location: u32) {
        self.calls.push(GlCall::DisableVertexAttribute(location));
    }

    fn use_program(&mut self, shader: ShaderId) {
        self.calls.push(GlCall::UseProgram(shader));
    }

    fn set_uniform_matrix(&mut self, name: &'static str, _value: &Mat4) {
        self.calls.push(GlCall::UniformMatrix(name));
    }

    fn set_uniform_vec4(&mut self, name: &'static str, value: &Vec4) {
        self.calls.push(GlCall::UniformVec4(name, *value));
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32) {
        self.calls.push(GlCall::DrawElements { mode, count });
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32) {
        self.calls.push(GlCall::DrawArrays { mode, first, count });
    }
}
