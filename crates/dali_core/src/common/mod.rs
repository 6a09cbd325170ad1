//! Types shared by the event, update and render sides.

pub mod buffer_index;
pub mod ids;

pub use buffer_index::{BufferIndex, SceneGraphBuffers};
pub use ids::{
    AnimationId, ConstraintId, GeometryId, IdAllocator, NodeId, ObjectId, PropertyOwnerId,
    RenderTaskId, RendererId, ResourceId, ShaderId,
};
