//! Render tasks: which subtree to draw, through which camera, into which
//! part of the surface.

use crate::common::{NodeId, RenderTaskId};
use crate::foundation::math::{Vec4, Viewport};

/// One pass over a subtree of the scene graph
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTask {
    id: RenderTaskId,
    source: NodeId,
    camera: NodeId,
    viewport: Option<Viewport>,
    clear_color: Vec4,
    clear_enabled: bool,
}

impl RenderTask {
    /// Task drawing `source` as seen by the camera attached to `camera`
    pub fn new(id: RenderTaskId, source: NodeId, camera: NodeId) -> Self {
        Self {
            id,
            source,
            camera,
            viewport: None,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            clear_enabled: false,
        }
    }

    /// Builder: draw into `viewport` instead of the whole surface
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Builder: clear with `color` before drawing
    #[must_use]
    pub fn with_clear_color(mut self, color: Vec4) -> Self {
        self.clear_color = color;
        self.clear_enabled = true;
        self
    }

    /// Task id
    pub const fn id(&self) -> RenderTaskId {
        self.id
    }

    /// Root of the drawn subtree
    pub const fn source(&self) -> NodeId {
        self.source
    }

    /// Node carrying the camera
    pub const fn camera(&self) -> NodeId {
        self.camera
    }

    /// Change the camera node
    pub fn set_camera(&mut self, camera: NodeId) {
        self.camera = camera;
    }

    /// Viewport, if restricted
    pub const fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Restrict or release the viewport
    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.viewport = viewport;
    }

    /// Colour to clear with, if clearing is enabled
    pub fn clear(&self) -> Option<Vec4> {
        self.clear_enabled.then_some(self.clear_color)
    }

    /// Enable or disable clearing
    pub fn set_clear_enabled(&mut self, enabled: bool) {
        self.clear_enabled = enabled;
    }

    /// Set the clear colour
    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }
}

/// Render tasks in drawing order
#[derive(Debug, Clone, Default)]
pub struct RenderTaskList {
    tasks: Vec<RenderTask>,
}

impl RenderTaskList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task; it draws after the existing ones
    pub fn add(&mut self, task: RenderTask) {
        debug_assert!(self.get(task.id()).is_none(), "{} added twice", task.id());
        self.tasks.push(task);
    }

    /// Remove a task
    pub fn remove(&mut self, id: RenderTaskId) -> Option<RenderTask> {
        let position = self.tasks.iter().position(|t| t.id() == id)?;
        Some(self.tasks.remove(position))
    }

    /// Task by id
    pub fn get(&self, id: RenderTaskId) -> Option<&RenderTask> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Mutable task by id
    pub fn get_mut(&mut self, id: RenderTaskId) -> Option<&mut RenderTask> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }

    /// Tasks in drawing order
    pub fn tasks(&self) -> &[RenderTask] {
        &self.tasks
    }

    /// Drop every task whose source or camera is `node`
    pub fn remove_node_references(&mut self, node: NodeId) -> Vec<RenderTaskId> {
        let removed: Vec<_> = self
            .tasks
            .iter()
            .filter(|t| t.source == node || t.camera == node)
            .map(RenderTask::id)
            .collect();
        self.tasks.retain(|t| t.source != node && t.camera != node);
        removed
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True if there is no task
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, source: u64, camera: u64) -> RenderTask {
        RenderTask::new(RenderTaskId::from_raw(id), NodeId::from_raw(source), NodeId::from_raw(camera))
    }

    #[test]
    fn test_clear_only_when_enabled() {
        let mut t = task(1, 2, 3);
        assert_eq!(t.clear(), None);
        t = t.with_clear_color(Vec4::new(0.2, 0.2, 0.2, 1.0));
        assert_eq!(t.clear(), Some(Vec4::new(0.2, 0.2, 0.2, 1.0)));
        t.set_clear_enabled(false);
        assert!(t.clear().is_none());
    }

    #[test]
    fn test_list_keeps_order_and_drops_node_references() {
        let mut list = RenderTaskList::new();
        list.add(task(1, 10, 11));
        list.add(task(2, 20, 11));
        list.add(task(3, 30, 31));

        assert_eq!(list.remove_node_references(NodeId::from_raw(11)).len(), 2);
        assert_eq!(list.tasks()[0].id(), RenderTaskId::from_raw(3));
        assert!(list.remove(RenderTaskId::from_raw(3)).is_some());
        assert!(list.is_empty());
    }
}
