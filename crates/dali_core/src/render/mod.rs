//! # Render Side
//!
//! The part of the pipeline that runs on the render thread, plus the data
//! the update thread hands over to it.
//!
//! - **Culling**: clip-space box tests used by the update side
//! - **Render lists**: per-layer items with depth/stencil flags
//! - **Instructions**: one per render task per frame, double-buffered
//! - **Render queue**: per-buffer messages from update to render
//! - **Context**: graphics entry points, with a recording implementation
//! - **Geometry and property buffers**: vertex/index data and draw calls
//! - **Render manager**: processes the queue and draws the instructions

pub mod context;
pub mod culling;
pub mod geometry;
pub mod instruction;
pub mod property_buffer;
pub mod queue;
pub mod render_list;
pub mod render_manager;
pub mod renderer;

pub use context::{BufferHandle, BufferTarget, Context, GlCall, PrimitiveMode, RecordingContext};
pub use culling::{is_2d_box_outside_clip_space, is_3d_box_outside_clip_space};
pub use geometry::{GeometryType, RenderGeometry};
pub use instruction::{RenderInstruction, RenderInstructionBuffers, RenderInstructionContainer};
pub use property_buffer::{AttributeType, PropertyBufferData, PropertyBufferFormat, TexturedVertex, VertexAttribute};
pub use queue::{RenderMessage, RenderQueue};
pub use render_list::{RenderFlags, RenderItem, RenderList};
pub use render_manager::{RenderManager, RenderStats};
pub use renderer::Renderer;
