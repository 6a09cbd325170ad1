//! The closed set of things a node can carry.

use super::camera::CameraAttachment;
use super::renderable::RenderableAttachment;

/// Zero or one attachment per node
#[derive(Debug, Clone)]
pub enum NodeAttachment {
    /// Provides view and projection matrices to render tasks
    Camera(CameraAttachment),
    /// Draws through a renderer
    Renderable(RenderableAttachment),
}

impl NodeAttachment {
    /// The owning node joined the scene graph
    pub fn connected_to_scene_graph(&mut self) {
        match self {
            Self::Camera(camera) => camera.mark_view_dirty(),
            Self::Renderable(renderable) => renderable.set_on_stage(true),
        }
    }

    /// The owning node left the scene graph
    pub fn disconnected_from_scene_graph(&mut self) {
        match self {
            Self::Camera(_) => {}
            Self::Renderable(renderable) => renderable.set_on_stage(false),
        }
    }

    /// Camera, if this is one
    pub const fn as_camera(&self) -> Option<&CameraAttachment> {
        match self {
            Self::Camera(camera) => Some(camera),
            Self::Renderable(_) => None,
        }
    }

    /// Mutable camera
    pub fn as_camera_mut(&mut self) -> Option<&mut CameraAttachment> {
        match self {
            Self::Camera(camera) => Some(camera),
            Self::Renderable(_) => None,
        }
    }

    /// Renderable, if this is one
    pub const fn as_renderable(&self) -> Option<&RenderableAttachment> {
        match self {
            Self::Renderable(renderable) => Some(renderable),
            Self::Camera(_) => None,
        }
    }

    /// Mutable renderable
    pub fn as_renderable_mut(&mut self) -> Option<&mut RenderableAttachment> {
        match self {
            Self::Renderable(renderable) => Some(renderable),
            Self::Camera(_) => None,
        }
    }
}
