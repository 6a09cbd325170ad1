//! Event-to-update messages.
//!
//! The event side never touches update-side state. Every mutation is one
//! of these messages, sent over a channel and applied at the start of the
//! next update, in the order it was sent.

use crate::animation::{Animation, Constraint, EndAction};
use crate::common::{AnimationId, ConstraintId, GeometryId, NodeId, ObjectId, PropertyOwnerId, RenderTaskId};
use crate::common::{RendererId, ResourceId, ShaderId};
use crate::foundation::math::{ClippingBox, Vec4, Viewport};
use crate::nodes::{ColorMode, DrawMode, Node, NodeAttachment, PositionInheritance, ResourceState, SortFunction};
use crate::property::{PropertyIndex, PropertyValue, SceneObject, WriteMode};
use crate::render::{GeometryType, PropertyBufferData, RenderGeometry, Renderer};

use super::render_task::RenderTask;

/// Node settings that are not properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeOption {
    /// Follow the parent's orientation
    InheritOrientation(bool),
    /// Follow the parent's scale
    InheritScale(bool),
    /// How the parent position is used
    PositionInheritance(PositionInheritance),
    /// How the world colour is derived
    ColorMode(ColorMode),
    /// Render category override
    DrawMode(DrawMode),
}

/// Layer settings
#[derive(Debug, Clone, Copy)]
pub enum LayerOption {
    /// Scissor to the clipping box
    Clipping(bool),
    /// Clipping box in window coordinates
    ClippingBox(ClippingBox),
    /// Skip depth testing for the whole layer
    DepthTestDisabled(bool),
    /// Transparent item ordering
    SortFunction(SortFunction),
}

/// Renderable attachment settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderableOption {
    /// Always blend, making the item transparent
    UseBlend(bool),
    /// Cull against the camera frustum
    CullEnabled(bool),
    /// Added to the depth used for sorting
    SortModifier(f32),
}

/// Animation control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationCommand {
    /// Play to the end of the play range
    Play,
    /// Play from a progress in `[0, 1]`
    PlayFrom(f32),
    /// Play until a progress in `[0, 1]`
    PlayTo(f32),
    /// Freeze
    Pause,
    /// Stop and apply the end action
    Stop,
    /// New duration in seconds
    SetDuration(f32),
    /// Loop forever or play once
    SetLooping(bool),
    /// Number of loops, 0 for forever
    SetLoopCount(u32),
    /// Play range as fractions of the duration
    SetPlayRange(f32, f32),
    /// Applied when the animation finishes or is stopped
    SetEndAction(EndAction),
    /// Applied when the animation is destroyed while running
    SetDestroyAction(EndAction),
}

/// One event-side mutation
#[derive(Debug)]
pub enum UpdateMessage {
    /// Hand a new node to the update side; it starts disconnected
    AddNode(Box<Node>),
    /// Make a node a root of the scene graph
    InstallRoot(NodeId),
    /// Connect `child` under `parent`
    ConnectNode {
        /// New parent
        parent: NodeId,
        /// Node to connect
        child: NodeId,
    },
    /// Disconnect a node from its parent
    DisconnectNode(NodeId),
    /// Disconnect if needed, then discard a node
    DestroyNode(NodeId),
    /// Set the attachment of a node
    AttachToNode {
        /// Target node
        node: NodeId,
        /// New attachment
        attachment: NodeAttachment,
    },
    /// Change a node setting
    SetNodeOption {
        /// Target node
        node: NodeId,
        /// New setting
        option: NodeOption,
    },
    /// Change a layer setting
    SetLayerOption {
        /// Layer node
        layer: NodeId,
        /// New setting
        option: LayerOption,
    },
    /// Change a renderable setting
    SetRenderableOption {
        /// Node carrying the renderable
        node: NodeId,
        /// New setting
        option: RenderableOption,
    },
    /// Write a property
    SetProperty {
        /// Property owner
        owner: PropertyOwnerId,
        /// Property index
        index: PropertyIndex,
        /// Value to write
        value: PropertyValue,
        /// Set, bake or bake relative
        mode: WriteMode,
    },
    /// Install a custom property
    InstallCustomProperty {
        /// Property owner
        owner: PropertyOwnerId,
        /// Index handed out by the event side
        index: PropertyIndex,
        /// Initial value, which also fixes the type
        initial: PropertyValue,
    },
    /// Add a stand-alone property owner
    AddObject(Box<SceneObject>),
    /// Remove a stand-alone property owner
    DestroyObject(ObjectId),
    /// Add an animation; it starts stopped
    AddAnimation(Box<Animation>),
    /// Control an animation
    AnimationCommand {
        /// Target animation
        id: AnimationId,
        /// What to do
        command: AnimationCommand,
    },
    /// Destroy an animation, applying its destroy action
    DestroyAnimation(AnimationId),
    /// Start applying a constraint
    AddConstraint(Box<Constraint>),
    /// Stop applying a constraint
    RemoveConstraint(ConstraintId),
    /// Bake a constraint weight
    SetConstraintWeight {
        /// Target constraint
        id: ConstraintId,
        /// Weight in `[0, 1]`
        weight: f32,
    },
    /// Register a renderer and hand it to the render side
    AddRenderer(Renderer),
    /// Drop a renderer
    RemoveRenderer(RendererId),
    /// Register a geometry and hand it to the render side
    AddGeometry {
        /// Geometry id
        id: GeometryId,
        /// Initial data
        geometry: RenderGeometry,
    },
    /// Replace one vertex buffer of a geometry
    SetVertexData {
        /// Target geometry
        geometry: GeometryId,
        /// Vertex buffer index
        buffer: usize,
        /// New data
        data: PropertyBufferData,
    },
    /// Replace the index data of a geometry
    SetIndexData {
        /// Target geometry
        geometry: GeometryId,
        /// New data
        data: PropertyBufferData,
    },
    /// Change the primitive type of a geometry
    SetGeometryType {
        /// Target geometry
        geometry: GeometryId,
        /// New type
        geometry_type: GeometryType,
    },
    /// Drop a geometry; its GPU buffers are released on the render thread
    RemoveGeometry(GeometryId),
    /// Register a shader program
    AddShader(ShaderId),
    /// Drop a shader program
    RemoveShader(ShaderId),
    /// Append a render task
    AddRenderTask(RenderTask),
    /// Remove a render task
    RemoveRenderTask(RenderTaskId),
    /// Restrict a render task to a viewport, or release it
    SetRenderTaskViewport {
        /// Target task
        id: RenderTaskId,
        /// New viewport
        viewport: Option<Viewport>,
    },
    /// Clear colour of the default surface
    SetBackgroundColor(Vec4),
    /// A resource finished loading, or failed
    SetResourceState {
        /// Resource
        resource: ResourceId,
        /// New state
        state: ResourceState,
    },
    /// Leave the update loop
    Stop,
}

impl UpdateMessage {
    /// Short name for logging
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddNode(_) => "AddNode",
            Self::InstallRoot(_) => "InstallRoot",
            Self::ConnectNode { .. } => "ConnectNode",
            Self::DisconnectNode(_) => "DisconnectNode",
            Self::DestroyNode(_) => "DestroyNode",
            Self::AttachToNode { .. } => "AttachToNode",
            Self::SetNodeOption { .. } => "SetNodeOption",
            Self::SetLayerOption { .. } => "SetLayerOption",
            Self::SetRenderableOption { .. } => "SetRenderableOption",
            Self::SetProperty { .. } => "SetProperty",
            Self::InstallCustomProperty { .. } => "InstallCustomProperty",
            Self::AddObject(_) => "AddObject",
            Self::DestroyObject(_) => "DestroyObject",
            Self::AddAnimation(_) => "AddAnimation",
            Self::AnimationCommand { .. } => "AnimationCommand",
            Self::DestroyAnimation(_) => "DestroyAnimation",
            Self::AddConstraint(_) => "AddConstraint",
            Self::RemoveConstraint(_) => "RemoveConstraint",
            Self::SetConstraintWeight { .. } => "SetConstraintWeight",
            Self::AddRenderer(_) => "AddRenderer",
            Self::RemoveRenderer(_) => "RemoveRenderer",
            Self::AddGeometry { .. } => "AddGeometry",
            Self::SetVertexData { .. } => "SetVertexData",
            Self::SetIndexData { .. } => "SetIndexData",
            Self::SetGeometryType { .. } => "SetGeometryType",
            Self::RemoveGeometry(_) => "RemoveGeometry",
            Self::AddShader(_) => "AddShader",
            Self::RemoveShader(_) => "RemoveShader",
            Self::AddRenderTask(_) => "AddRenderTask",
            Self::RemoveRenderTask(_) => "RemoveRenderTask",
            Self::SetRenderTaskViewport { .. } => "SetRenderTaskViewport",
            Self::SetBackgroundColor(_) => "SetBackgroundColor",
            Self::SetResourceState { .. } => "SetResourceState",
            Self::Stop => "Stop",
        }
    }
}
