//! Event-side entry point to the scene.
//!
//! [`SceneController`] is what application code holds. It allocates ids,
//! validates property writes against the types it knows about and turns
//! every call into an [`UpdateMessage`]. It never waits for the update
//! thread; values it reports are the ones the event side last wrote, not
//! the animated ones.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use log::{debug, warn};

use crate::animation::{Animation, Constraint};
use crate::common::{
    AnimationId, BufferIndex, ConstraintId, GeometryId, IdAllocator, NodeId, ObjectId, PropertyOwnerId, RenderTaskId, RendererId,
    ResourceId, ShaderId,
};
use crate::foundation::math::{Vec3, Vec4, Viewport};
use crate::nodes::{CameraAttachment, Node, NodeAttachment, NodeProperty, ResourceState};
use crate::property::{
    check_type, PropertyError, PropertyIndex, PropertyValue, SceneObject, WriteMode, CUSTOM_PROPERTY_START_INDEX,
};
use crate::render::{GeometryType, PropertyBufferData, RenderGeometry, Renderer};
use crate::update::{AnimationCommand, LayerOption, NodeOption, RenderTask, RenderableOption, UpdateMessage};

/// Ids of the default stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// Root layer
    pub root: NodeId,
    /// Node carrying the default camera
    pub camera: NodeId,
    /// Task drawing the root layer through the default camera
    pub task: RenderTaskId,
}

#[derive(Debug)]
struct OwnerMirror {
    values: HashMap<PropertyIndex, PropertyValue>,
    next_custom: PropertyIndex,
}

impl OwnerMirror {
    fn new() -> Self {
        Self { values: HashMap::new(), next_custom: CUSTOM_PROPERTY_START_INDEX }
    }

    fn for_node(node: &Node) -> Self {
        let mut mirror = Self::new();
        for property in NodeProperty::ALL.into_iter().filter(|p| p.is_writable()) {
            if let Some(input) = node.property(property.index()) {
                mirror.values.insert(property.index(), input.value(BufferIndex::ZERO));
            }
        }
        mirror
    }
}

/// Event-side handle to the scene
#[derive(Debug)]
pub struct SceneController {
    ids: Arc<IdAllocator>,
    sender: Sender<UpdateMessage>,
    owners: HashMap<PropertyOwnerId, OwnerMirror>,
    parents: HashMap<NodeId, Option<NodeId>>,
    roots: HashSet<NodeId>,
}

impl SceneController {
    /// Controller sending to `sender`
    pub fn new(sender: Sender<UpdateMessage>) -> Self {
        Self::with_ids(sender, Arc::new(IdAllocator::new()))
    }

    /// Controller sharing an id source
    pub fn with_ids(sender: Sender<UpdateMessage>, ids: Arc<IdAllocator>) -> Self {
        Self { ids, sender, owners: HashMap::new(), parents: HashMap::new(), roots: HashSet::new() }
    }

    /// Id source, for building animations and constraints
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    fn send(&self, message: UpdateMessage) {
        let name = message.name();
        if self.sender.send(message).is_err() {
            warn!("update side is gone, dropping {name}");
        }
    }

    // --- nodes ------------------------------------------------------------

    /// Create a disconnected node
    pub fn create_node(&mut self) -> NodeId {
        let id = self.ids.node();
        self.add_node(Node::new(id));
        id
    }

    /// Create a disconnected layer
    pub fn create_layer(&mut self) -> NodeId {
        let id = self.ids.node();
        self.add_node(Node::new_layer(id));
        id
    }

    /// Hand a prepared node to the update side
    ///
    /// Its id must come from [`Self::ids`].
    pub fn add_node(&mut self, node: Node) {
        let id = node.id();
        self.owners.insert(id.into(), OwnerMirror::for_node(&node));
        self.parents.insert(id, None);
        self.send(UpdateMessage::AddNode(Box::new(node)));
    }

    /// Make a node a root of the scene graph
    pub fn install_root(&mut self, id: NodeId) {
        assert!(self.parents.get(&id).is_some_and(Option::is_none), "{id} cannot be a root");
        self.roots.insert(id);
        self.send(UpdateMessage::InstallRoot(id));
    }

    /// Connect `child` under `parent`
    ///
    /// Panics on self-parenting, on a parent outside the scene graph and on
    /// a child that is a root or already has a parent.
    pub fn add(&mut self, parent: NodeId, child: NodeId) {
        assert!(parent != child, "{parent} cannot be its own child");
        assert!(self.is_connected(parent), "{parent} is not connected to the scene graph");
        assert!(!self.roots.contains(&child), "{child} is a root and cannot be parented");
        let slot = self.parents.get_mut(&child).unwrap_or_else(|| panic!("unknown child {child}"));
        assert!(slot.is_none(), "{child} already has a parent");
        *slot = Some(parent);
        self.send(UpdateMessage::ConnectNode { parent, child });
    }

    /// Disconnect a node from its parent
    pub fn remove(&mut self, child: NodeId) {
        match self.parents.get_mut(&child) {
            Some(slot @ Some(_)) => {
                *slot = None;
                self.send(UpdateMessage::DisconnectNode(child));
            }
            _ => debug!("{child} has no parent"),
        }
    }

    /// Release a node; the update side frees it two frames later
    pub fn destroy_node(&mut self, id: NodeId) {
        if self.parents.remove(&id).is_none() {
            debug!("destroy of unknown {id}");
            return;
        }
        for parent in self.parents.values_mut() {
            if *parent == Some(id) {
                *parent = None;
            }
        }
        self.roots.remove(&id);
        self.owners.remove(&id.into());
        self.send(UpdateMessage::DestroyNode(id));
    }

    /// True if `id` is a root or hangs below one
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if self.roots.contains(&current) {
                return true;
            }
            match self.parents.get(&current) {
                Some(Some(parent)) => current = *parent,
                _ => return false,
            }
        }
    }

    /// Parent as the event side last set it
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied().flatten()
    }

    /// Set the attachment of a node
    pub fn attach(&self, node: NodeId, attachment: NodeAttachment) {
        self.send(UpdateMessage::AttachToNode { node, attachment });
    }

    /// Change a node setting
    pub fn set_node_option(&self, node: NodeId, option: NodeOption) {
        self.send(UpdateMessage::SetNodeOption { node, option });
    }

    /// Change a layer setting
    pub fn set_layer_option(&self, layer: NodeId, option: LayerOption) {
        self.send(UpdateMessage::SetLayerOption { layer, option });
    }

    /// Change a renderable setting
    pub fn set_renderable_option(&self, node: NodeId, option: RenderableOption) {
        self.send(UpdateMessage::SetRenderableOption { node, option });
    }

    // --- properties -------------------------------------------------------

    /// Create a stand-alone property owner
    pub fn create_object(&mut self) -> ObjectId {
        let id = self.ids.object();
        self.owners.insert(id.into(), OwnerMirror::new());
        self.send(UpdateMessage::AddObject(Box::new(SceneObject::new(id))));
        id
    }

    /// Release a stand-alone property owner
    pub fn destroy_object(&mut self, id: ObjectId) {
        if self.owners.remove(&id.into()).is_some() {
            self.send(UpdateMessage::DestroyObject(id));
        }
    }

    /// Install a custom property, returning its index
    pub fn register_property(
        &mut self,
        owner: impl Into<PropertyOwnerId>,
        initial: PropertyValue,
    ) -> Result<PropertyIndex, PropertyError> {
        let owner = owner.into();
        let mirror = self.owners.get_mut(&owner).ok_or(PropertyError::UnknownOwner(owner))?;
        let index = mirror.next_custom;
        mirror.next_custom += 1;
        mirror.values.insert(index, initial);
        self.send(UpdateMessage::InstallCustomProperty { owner, index, initial });
        Ok(index)
    }

    /// Bake a property
    pub fn set_property(
        &mut self,
        owner: impl Into<PropertyOwnerId>,
        index: PropertyIndex,
        value: PropertyValue,
    ) -> Result<(), PropertyError> {
        self.write_property(owner, index, value, WriteMode::Bake)
    }

    /// Write a property with an explicit mode
    ///
    /// `Set` is transient on the update side, so the value reported by
    /// [`Self::get_property`] only follows `Bake` and `BakeRelative`.
    pub fn write_property(
        &mut self,
        owner: impl Into<PropertyOwnerId>,
        index: PropertyIndex,
        value: PropertyValue,
        mode: WriteMode,
    ) -> Result<(), PropertyError> {
        let owner = owner.into();
        let mirror = self.owners.get_mut(&owner).ok_or(PropertyError::UnknownOwner(owner))?;

        if matches!(owner, PropertyOwnerId::Node(_)) && index < CUSTOM_PROPERTY_START_INDEX {
            let property = NodeProperty::from_index(index).ok_or(PropertyError::UnknownIndex { owner, index })?;
            if !property.is_writable() {
                return Err(PropertyError::ReadOnly(index));
            }
        }
        let current = mirror.values.get(&index).ok_or(PropertyError::UnknownIndex { owner, index })?;
        check_type(current.property_type(), &value)?;

        match mode {
            WriteMode::Set => {}
            WriteMode::Bake => {
                mirror.values.insert(index, value);
            }
            WriteMode::BakeRelative => {
                let updated = current.offset(&value, 1.0).ok_or(PropertyError::TypeMismatch {
                    expected: current.property_type(),
                    found: value.property_type(),
                })?;
                mirror.values.insert(index, updated);
            }
        }
        self.send(UpdateMessage::SetProperty { owner, index, value, mode });
        Ok(())
    }

    /// Last value the event side baked
    pub fn get_property(
        &self,
        owner: impl Into<PropertyOwnerId>,
        index: PropertyIndex,
    ) -> Result<PropertyValue, PropertyError> {
        let owner = owner.into();
        let mirror = self.owners.get(&owner).ok_or(PropertyError::UnknownOwner(owner))?;
        mirror.values.get(&index).copied().ok_or(PropertyError::UnknownIndex { owner, index })
    }

    // --- animations and constraints --------------------------------------

    /// Hand an animation to the update side; it starts stopped
    pub fn add_animation(&self, animation: Animation) -> AnimationId {
        let id = animation.id();
        self.send(UpdateMessage::AddAnimation(Box::new(animation)));
        id
    }

    /// Control an animation
    pub fn animation_command(&self, id: AnimationId, command: AnimationCommand) {
        self.send(UpdateMessage::AnimationCommand { id, command });
    }

    /// Play an animation
    pub fn play(&self, id: AnimationId) {
        self.animation_command(id, AnimationCommand::Play);
    }

    /// Stop an animation, applying its end action
    pub fn stop_animation(&self, id: AnimationId) {
        self.animation_command(id, AnimationCommand::Stop);
    }

    /// Release an animation, applying its destroy action
    pub fn destroy_animation(&self, id: AnimationId) {
        self.send(UpdateMessage::DestroyAnimation(id));
    }

    /// Start applying a constraint
    pub fn add_constraint(&self, constraint: Constraint) -> ConstraintId {
        let id = constraint.id();
        self.send(UpdateMessage::AddConstraint(Box::new(constraint)));
        id
    }

    /// Stop applying a constraint
    pub fn remove_constraint(&self, id: ConstraintId) {
        self.send(UpdateMessage::RemoveConstraint(id));
    }

    /// Bake a constraint weight
    pub fn set_constraint_weight(&self, id: ConstraintId, weight: f32) {
        self.send(UpdateMessage::SetConstraintWeight { id, weight });
    }

    // --- render objects ---------------------------------------------------

    /// Register geometry data, returning its id
    pub fn add_geometry(&self, geometry: RenderGeometry) -> GeometryId {
        let id = self.ids.geometry();
        self.send(UpdateMessage::AddGeometry { id, geometry });
        id
    }

    /// Replace one vertex buffer of a geometry
    pub fn set_vertex_data(&self, geometry: GeometryId, buffer: usize, data: PropertyBufferData) {
        self.send(UpdateMessage::SetVertexData { geometry, buffer, data });
    }

    /// Replace the index data of a geometry
    pub fn set_index_data(&self, geometry: GeometryId, data: PropertyBufferData) {
        self.send(UpdateMessage::SetIndexData { geometry, data });
    }

    /// Change the primitive type of a geometry
    pub fn set_geometry_type(&self, geometry: GeometryId, geometry_type: GeometryType) {
        self.send(UpdateMessage::SetGeometryType { geometry, geometry_type });
    }

    /// Release a geometry
    pub fn remove_geometry(&self, id: GeometryId) {
        self.send(UpdateMessage::RemoveGeometry(id));
    }

    /// Register a shader program
    pub fn add_shader(&self) -> ShaderId {
        let id = self.ids.shader();
        self.send(UpdateMessage::AddShader(id));
        id
    }

    /// Release a shader program
    pub fn remove_shader(&self, id: ShaderId) {
        self.send(UpdateMessage::RemoveShader(id));
    }

    /// Create a renderer drawing `geometry` with `shader`
    pub fn add_renderer(&self, geometry: GeometryId, shader: ShaderId, blending: bool) -> RendererId {
        let id = self.ids.renderer();
        self.send(UpdateMessage::AddRenderer(Renderer::new(id, geometry, shader).with_blending(blending)));
        id
    }

    /// Release a renderer
    pub fn remove_renderer(&self, id: RendererId) {
        self.send(UpdateMessage::RemoveRenderer(id));
    }

    /// Report a resource load result
    pub fn set_resource_state(&self, resource: ResourceId, state: ResourceState) {
        self.send(UpdateMessage::SetResourceState { resource, state });
    }

    // --- render tasks and stage -------------------------------------------

    /// Draw `source` through the camera on `camera`
    pub fn add_render_task(&self, source: NodeId, camera: NodeId) -> RenderTaskId {
        let id = self.ids.render_task();
        self.send(UpdateMessage::AddRenderTask(RenderTask::new(id, source, camera)));
        id
    }

    /// Append a prepared render task; its id must come from [`Self::ids`]
    pub fn add_render_task_with(&self, task: RenderTask) -> RenderTaskId {
        let id = task.id();
        self.send(UpdateMessage::AddRenderTask(task));
        id
    }

    /// Remove a render task
    pub fn remove_render_task(&self, id: RenderTaskId) {
        self.send(UpdateMessage::RemoveRenderTask(id));
    }

    /// Restrict a render task to a viewport, or release it
    pub fn set_render_task_viewport(&self, id: RenderTaskId, viewport: Option<Viewport>) {
        self.send(UpdateMessage::SetRenderTaskViewport { id, viewport });
    }

    /// Clear colour of the default surface
    pub fn set_background_color(&self, color: Vec4) {
        self.send(UpdateMessage::SetBackgroundColor(color));
    }

    /// Root layer, default camera and default render task for a
    /// `width` x `height` surface
    pub fn install_default_stage(&mut self, width: f32, height: f32) -> Result<Stage, PropertyError> {
        let root = self.create_layer();
        self.set_property(root, NodeProperty::Size.index(), PropertyValue::Vector3(Vec3::new(width, height, 0.0)))?;
        self.install_root(root);

        let camera = self.create_node();
        let attachment = CameraAttachment::for_stage(width, height);
        let distance = CameraAttachment::distance_for(height, attachment.field_of_view());
        self.set_property(camera, NodeProperty::Position.index(), PropertyValue::Vector3(Vec3::new(0.0, 0.0, distance)))?;
        self.attach(camera, NodeAttachment::Camera(attachment));
        self.add(root, camera);

        let task = self.add_render_task(root, camera);
        debug!("default stage {width} x {height}: root {root}, camera {camera}, {task}");
        Ok(Stage { root, camera, task })
    }

    /// Ask the update loop to finish
    pub fn request_stop(&self) {
        self.send(UpdateMessage::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Receiver};

    fn controller() -> (SceneController, Receiver<UpdateMessage>) {
        let (sender, receiver) = channel();
        (SceneController::new(sender), receiver)
    }

    #[test]
    fn test_property_errors() {
        let (mut scene, _receiver) = controller();
        let node = scene.create_node();

        let unknown = NodeId::from_raw(999);
        assert_eq!(
            scene.set_property(unknown, NodeProperty::Position.index(), PropertyValue::Float(1.0)),
            Err(PropertyError::UnknownOwner(unknown.into()))
        );
        assert_eq!(
            scene.set_property(node, NodeProperty::WorldPosition.index(), PropertyValue::Vector3(Vec3::zeros())),
            Err(PropertyError::ReadOnly(NodeProperty::WorldPosition.index()))
        );
        assert!(matches!(
            scene.set_property(node, NodeProperty::Visible.index(), PropertyValue::Float(1.0)),
            Err(PropertyError::TypeMismatch { .. })
        ));
        assert!(matches!(
            scene.set_property(node, 40, PropertyValue::Float(1.0)),
            Err(PropertyError::UnknownIndex { .. })
        ));
    }

    #[test]
    fn test_custom_properties_are_indexed_in_order() {
        let (mut scene, receiver) = controller();
        let object = scene.create_object();
        let first = scene.register_property(object, PropertyValue::Float(1.0)).unwrap();
        let second = scene.register_property(object, PropertyValue::Integer(3)).unwrap();
        assert_eq!(first, CUSTOM_PROPERTY_START_INDEX);
        assert_eq!(second, CUSTOM_PROPERTY_START_INDEX + 1);

        scene.write_property(object, first, PropertyValue::Float(2.0), WriteMode::BakeRelative).unwrap();
        assert_eq!(scene.get_property(object, first), Ok(PropertyValue::Float(3.0)));
        scene.write_property(object, first, PropertyValue::Float(9.0), WriteMode::Set).unwrap();
        assert_eq!(scene.get_property(object, first), Ok(PropertyValue::Float(3.0)));

        let names: Vec<_> = receiver.try_iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec!["AddObject", "InstallCustomProperty", "InstallCustomProperty", "SetProperty", "SetProperty"]
        );
    }

    #[test]
    fn test_default_stage_messages() {
        let (mut scene, receiver) = controller();
        let stage = scene.install_default_stage(480.0, 800.0).unwrap();
        assert_eq!(scene.parent(stage.camera), Some(stage.root));
        assert_eq!(
            scene.get_property(stage.root, NodeProperty::Size.index()),
            Ok(PropertyValue::Vector3(Vec3::new(480.0, 800.0, 0.0)))
        );

        let messages: Vec<_> = receiver.try_iter().collect();
        assert!(matches!(messages.last(), Some(UpdateMessage::AddRenderTask(task)) if task.id() == stage.task));
    }

    #[test]
    #[should_panic(expected = "already has a parent")]
    fn test_double_parenting_panics() {
        let (mut scene, _receiver) = controller();
        let root = scene.create_layer();
        scene.install_root(root);
        let a = scene.create_node();
        let b = scene.create_node();
        scene.add(root, a);
        scene.add(root, b);
        scene.add(a, b);
    }

    #[test]
    #[should_panic(expected = "its own child")]
    fn test_self_parenting_panics() {
        let (mut scene, _receiver) = controller();
        let a = scene.create_node();
        scene.add(a, a);
    }

    #[test]
    #[should_panic(expected = "not connected")]
    fn test_connecting_under_disconnected_parent_panics() {
        let (mut scene, _receiver) = controller();
        let root = scene.create_layer();
        scene.install_root(root);
        let a = scene.create_node();
        let b = scene.create_node();
        scene.add(root, a);
        scene.remove(a);
        scene.add(a, b);
    }

    #[test]
    fn test_sending_after_update_side_is_gone_does_not_fail() {
        let (mut scene, receiver) = controller();
        drop(receiver);
        let node = scene.create_node();
        assert!(scene.set_property(node, NodeProperty::Color.index(), PropertyValue::Vector4(Vec4::zeros())).is_ok());
    }
}
