//! # Scene Graph Nodes
//!
//! The update-side tree: nodes with their double-buffered transform
//! properties, the layer specialisation that partitions renderables into
//! four render categories, and the camera and renderable attachments.
//!
//! ```text
//! SceneGraph (arena, NodeId -> Node)
//!   root Layer
//!    ├── Node ── Renderable
//!    │    └── Node ── Renderable
//!    ├── Node ── Camera
//!    └── Layer
//!         └── Node ── Renderable
//! ```

pub mod attachment;
pub mod camera;
pub mod flags;
pub mod layer;
pub mod node;
pub mod renderable;
pub mod scene_graph;

pub use attachment::NodeAttachment;
pub use camera::{CameraAttachment, ProjectionMode};
pub use flags::NodeFlags;
pub use layer::{default_sort_function, Layer, RenderCategory, SortFunction};
pub use node::{ColorMode, DrawMode, Node, NodeProperty, PositionInheritance};
pub use renderable::{CullingBounds, RenderableAttachment, ResourceState, ResourceTicket};
pub use scene_graph::SceneGraph;
