//! # Update Manager
//!
//! Owns the update-side scene: the node arena, stand-alone property
//! owners, animations, constraints, render tasks and the bookkeeping of
//! render-side objects. One call to [`UpdateManager::update`] produces one
//! frame into the update buffer index:
//!
//! ```text
//! discard queue      free what was parked two frames ago for this buffer
//! reset              restore base values of nodes, objects, constraint weights
//! messages           apply every event-side mutation, in order
//! animations         advance and apply animators; collect finished ones
//! constraints        advance weight ramps and apply
//! transforms         top-down world values
//! render tasks       partition renderables into layers, cull, sort, flag
//! publish            hand the instructions to the render side
//! notify, swap       finished animations and frame done; flip buffers
//! ```

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};
use std::sync::Arc;

use log::{debug, error, info, trace, warn};

use super::discard_queue::{DiscardQueue, Discardable};
use super::message::{AnimationCommand, LayerOption, NodeOption, RenderableOption, UpdateMessage};
use super::notification::{Notification, NotificationQueue};
use super::prepare::{process_render_tasks, PrepareOptions};
use super::render_objects::RenderObjects;
use super::render_task::RenderTaskList;
use super::transform::update_node_transforms;
use crate::animation::{Animation, AnimationState, ApplyResult, Constraint};
use crate::common::{AnimationId, BufferIndex, ConstraintId, NodeId, ObjectId, PropertyOwnerId, SceneGraphBuffers};
use crate::core::{CoreConfig, UpdateConfig};
use crate::nodes::{Node, NodeAttachment, ResourceState, SceneGraph};
use crate::property::{
    write_property, AnimatablePropertyBase, Observer, ObserverRegistry, OwnerEvent, PropertyError, PropertyIndex,
    PropertyInput, PropertyOwnerLookup, PropertyValue, SceneObject, WriteMode,
};
use crate::render::{RenderInstructionBuffers, RenderQueue};

/// Every property owner on the update side
#[derive(Debug, Default)]
pub struct OwnerStore {
    graph: SceneGraph,
    objects: HashMap<ObjectId, SceneObject>,
}

impl OwnerStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Node arena
    pub const fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable node arena
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Stand-alone object by id
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Mutable stand-alone object
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    /// Add a stand-alone object
    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.insert(object.id(), object);
    }

    /// Remove a stand-alone object
    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.objects.remove(&id)
    }

    /// True if the owner exists
    pub fn contains(&self, owner: PropertyOwnerId) -> bool {
        match owner {
            PropertyOwnerId::Node(id) => self.graph.contains(id),
            PropertyOwnerId::Object(id) => self.objects.contains_key(&id),
        }
    }

    /// Write a property of any owner
    pub fn write_property(
        &mut self,
        buffer: BufferIndex,
        owner: PropertyOwnerId,
        index: PropertyIndex,
        value: &PropertyValue,
        mode: WriteMode,
    ) -> Result<(), PropertyError> {
        match owner {
            PropertyOwnerId::Node(id) => self
                .graph
                .node_mut(id)
                .ok_or(PropertyError::UnknownOwner(owner))?
                .write_property(buffer, index, value, mode),
            PropertyOwnerId::Object(id) => {
                let object = self.objects.get_mut(&id).ok_or(PropertyError::UnknownOwner(owner))?;
                let target = object.custom_mut().get_mut(index).ok_or(PropertyError::UnknownIndex { owner, index })?;
                write_property(target, buffer, value, mode)
            }
        }
    }

    /// Install a custom property on any owner
    pub fn install_custom_property(
        &mut self,
        owner: PropertyOwnerId,
        index: PropertyIndex,
        initial: &PropertyValue,
    ) -> Result<(), PropertyError> {
        let custom = match owner {
            PropertyOwnerId::Node(id) => self.graph.node_mut(id).map(|n| n.custom_mut()),
            PropertyOwnerId::Object(id) => self.objects.get_mut(&id).map(SceneObject::custom_mut),
        };
        custom.ok_or(PropertyError::UnknownOwner(owner))?.install(owner, index, initial)
    }

    /// Current value of a property in `buffer`
    pub fn value(&self, buffer: BufferIndex, owner: PropertyOwnerId, index: PropertyIndex) -> Option<PropertyValue> {
        self.input(owner, index).map(|p| p.value(buffer))
    }

    fn reset(&mut self, buffer: BufferIndex) {
        for node in self.graph.iter_mut() {
            node.reset_default_properties(buffer);
        }
        for object in self.objects.values_mut() {
            object.custom_mut().reset_to_base_values(buffer);
        }
    }
}

impl PropertyOwnerLookup for OwnerStore {
    fn input(&self, owner: PropertyOwnerId, index: PropertyIndex) -> Option<&dyn PropertyInput> {
        match owner {
            PropertyOwnerId::Node(id) => self.graph.node(id)?.property(index),
            PropertyOwnerId::Object(id) => self.objects.get(&id)?.custom().get(index).map(|p| p.as_input()),
        }
    }

    fn animatable_mut(&mut self, owner: PropertyOwnerId, index: PropertyIndex) -> Option<&mut dyn AnimatablePropertyBase> {
        match owner {
            PropertyOwnerId::Node(id) => self.graph.node_mut(id)?.animatable_mut(index),
            PropertyOwnerId::Object(id) => self.objects.get_mut(&id)?.custom_mut().get_mut(index),
        }
    }

    fn is_connected(&self, owner: PropertyOwnerId) -> bool {
        match owner {
            PropertyOwnerId::Node(id) => self.graph.node(id).is_some_and(|n| n.is_connected()),
            PropertyOwnerId::Object(id) => self.objects.contains_key(&id),
        }
    }
}

/// Counters for one update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, from 1
    pub frame: u64,
    /// Messages applied
    pub messages: usize,
    /// Objects freed from the discard queue
    pub discarded: usize,
    /// Animations playing after the update
    pub animations_running: usize,
    /// Animators that wrote their target
    pub animators_applied: usize,
    /// Animations that finished
    pub animations_finished: usize,
    /// Constraints that wrote their target
    pub constraints_applied: usize,
    /// Constraints with nothing to do
    pub constraints_skipped: usize,
    /// Constraints waiting for an owner
    pub constraints_disconnected: usize,
    /// World transforms recomputed
    pub transforms_updated: usize,
    /// Render instructions prepared
    pub instructions: usize,
    /// Render items prepared
    pub items: usize,
    /// Render items culled
    pub culled: usize,
}

/// Result of one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStatus {
    /// Frame number, from 1
    pub frame: u64,
    /// Buffer index the frame was written to
    pub buffer: BufferIndex,
    /// True while something is still changing
    pub keep_updating: bool,
    /// True once a stop message was processed
    pub stopped: bool,
    /// Counters
    pub stats: FrameStats,
}

/// Update-thread state and the per-frame update pass
pub struct UpdateManager {
    config: UpdateConfig,
    depth_test_enabled: bool,
    buffers: SceneGraphBuffers,
    frame: u64,
    owners: OwnerStore,
    animations: Vec<Animation>,
    constraints: Vec<Constraint>,
    observers: ObserverRegistry,
    tasks: RenderTaskList,
    render_objects: RenderObjects,
    discard: DiscardQueue,
    instructions: Arc<RenderInstructionBuffers>,
    messages: Receiver<UpdateMessage>,
    notifications: NotificationQueue,
    keep_rendering: f32,
    stopped: bool,
}

impl std::fmt::Debug for UpdateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateManager")
            .field("frame", &self.frame)
            .field("buffers", &self.buffers)
            .field("nodes", &self.owners.graph.len())
            .field("animations", &self.animations.len())
            .field("constraints", &self.constraints.len())
            .field("tasks", &self.tasks.len())
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl UpdateManager {
    /// Create an update manager reading `messages`
    pub fn new(
        config: &CoreConfig,
        messages: Receiver<UpdateMessage>,
        notifications: Option<SyncSender<Notification>>,
        render_queue: Arc<RenderQueue>,
        instructions: Arc<RenderInstructionBuffers>,
    ) -> Self {
        Self {
            config: config.update.clone(),
            depth_test_enabled: config.render.depth_test_enabled,
            buffers: SceneGraphBuffers::new(),
            frame: 0,
            owners: OwnerStore::new(),
            animations: Vec::new(),
            constraints: Vec::new(),
            observers: ObserverRegistry::new(),
            tasks: RenderTaskList::new(),
            render_objects: RenderObjects::new(Arc::clone(&render_queue)),
            discard: DiscardQueue::new(render_queue),
            instructions,
            messages,
            notifications: NotificationQueue::new(notifications),
            keep_rendering: 0.0,
            stopped: false,
        }
    }

    /// Number of completed frames
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Buffer slots
    pub const fn buffers(&self) -> SceneGraphBuffers {
        self.buffers
    }

    /// Property owners
    pub const fn owners(&self) -> &OwnerStore {
        &self.owners
    }

    /// Node arena
    pub const fn graph(&self) -> &SceneGraph {
        &self.owners.graph
    }

    /// Animation by id
    pub fn animation(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.iter().find(|a| a.id() == id)
    }

    /// Number of live animations
    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    /// Constraint by id
    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.id() == id)
    }

    /// Number of live constraints
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Observer subscriptions
    pub const fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    /// Render tasks
    pub const fn tasks(&self) -> &RenderTaskList {
        &self.tasks
    }

    /// Deferred frees
    pub const fn discard_queue(&self) -> &DiscardQueue {
        &self.discard
    }

    /// Render-side object registry
    pub const fn render_objects(&self) -> &RenderObjects {
        &self.render_objects
    }

    /// True once a stop message was processed
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Run one update pass for the current update buffer
    pub fn update(&mut self, elapsed_seconds: f32) -> UpdateStatus {
        let buffer = self.buffers.update_buffer_index();
        let frame = self.frame + 1;
        let mut stats = FrameStats { frame, ..FrameStats::default() };

        stats.discarded = self.discard.clear(buffer);

        self.owners.reset(buffer);
        for constraint in &mut self.constraints {
            constraint.reset_weight(buffer);
        }

        stats.messages = self.process_messages(buffer);
        self.animate(buffer, elapsed_seconds, &mut stats);
        self.apply_constraints(buffer, elapsed_seconds, &mut stats);

        stats.transforms_updated = update_node_transforms(&mut self.owners.graph, buffer).transforms_updated;

        let options =
            PrepareOptions { culling: self.config.enable_culling, depth_test_enabled: self.depth_test_enabled };
        {
            let mut container = self.instructions.lock(buffer);
            container.reset_and_reserve(frame, self.tasks.len());
            let prepared = process_render_tasks(&mut self.owners.graph, &self.tasks, buffer, &mut container, options);
            stats.instructions = prepared.tasks;
            stats.items = prepared.items;
            stats.culled = prepared.culled;

            let interval = u64::from(self.config.release_unused_items_interval);
            if interval > 0 && frame % interval == 0 {
                container.release_unused_items();
            }
        }
        self.instructions.publish(frame);

        self.notifications.push(Notification::FrameDone { frame });
        self.notifications.flush();

        let changing = stats.animations_running > 0 || stats.messages > 0;
        if changing {
            self.keep_rendering = self.config.keep_rendering_seconds;
        } else {
            self.keep_rendering = (self.keep_rendering - elapsed_seconds).max(0.0);
        }

        self.buffers.swap();
        self.frame = frame;

        trace!(
            "frame {frame}: {} messages, {} animators, {}/{} constraints applied/skipped, {} transforms, {} items, {} culled",
            stats.messages,
            stats.animators_applied,
            stats.constraints_applied,
            stats.constraints_skipped,
            stats.transforms_updated,
            stats.items,
            stats.culled
        );

        UpdateStatus {
            frame,
            buffer,
            keep_updating: changing || self.keep_rendering > 0.0,
            stopped: self.stopped,
            stats,
        }
    }

    fn process_messages(&mut self, buffer: BufferIndex) -> usize {
        let mut count = 0;
        while !self.stopped {
            match self.messages.try_recv() {
                Ok(message) => {
                    count += 1;
                    self.process_message(buffer, message);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("event side disconnected, stopping updates");
                    self.stopped = true;
                }
            }
        }
        count
    }

    fn process_message(&mut self, buffer: BufferIndex, message: UpdateMessage) {
        trace!("applying {}", message.name());
        match message {
            UpdateMessage::AddNode(node) => {
                if self.owners.graph.contains(node.id()) {
                    error!("{} added twice", node.id());
                } else {
                    self.owners.graph.add_node(*node);
                }
            }
            UpdateMessage::InstallRoot(id) => {
                if self.owners.graph.contains(id) {
                    let connected = self.owners.graph.install_root(id);
                    self.publish_all(buffer, &connected, OwnerEvent::Connected);
                } else {
                    error!("cannot install unknown root {id}");
                }
            }
            UpdateMessage::ConnectNode { parent, child } => self.connect_node(buffer, parent, child),
            UpdateMessage::DisconnectNode(id) => self.disconnect_node(buffer, id),
            UpdateMessage::DestroyNode(id) => self.destroy_node(buffer, id),
            UpdateMessage::AttachToNode { node, attachment } => match self.owners.graph.node_mut(node) {
                Some(n) => n.attach(attachment),
                None => error!("cannot attach to unknown {node}"),
            },
            UpdateMessage::SetNodeOption { node, option } => self.set_node_option(node, option),
            UpdateMessage::SetLayerOption { layer, option } => self.set_layer_option(layer, option),
            UpdateMessage::SetRenderableOption { node, option } => self.set_renderable_option(node, option),
            UpdateMessage::SetProperty { owner, index, value, mode } => {
                if let Err(e) = self.owners.write_property(buffer, owner, index, &value, mode) {
                    error!("dropping property write to {owner} index {index}: {e}");
                }
            }
            UpdateMessage::InstallCustomProperty { owner, index, initial } => {
                if let Err(e) = self.owners.install_custom_property(owner, index, &initial) {
                    error!("dropping custom property {index} of {owner}: {e}");
                }
            }
            UpdateMessage::AddObject(object) => self.owners.add_object(*object),
            UpdateMessage::DestroyObject(id) => {
                if self.owners.remove_object(id).is_some() {
                    self.publish(buffer, id.into(), OwnerEvent::Destroyed);
                } else {
                    debug!("destroy of unknown {id}");
                }
            }
            UpdateMessage::AddAnimation(animation) => self.add_animation(*animation),
            UpdateMessage::AnimationCommand { id, command } => self.animation_command(buffer, id, command),
            UpdateMessage::DestroyAnimation(id) => self.destroy_animation(buffer, id),
            UpdateMessage::AddConstraint(constraint) => self.add_constraint(*constraint),
            UpdateMessage::RemoveConstraint(id) => self.remove_constraint(id),
            UpdateMessage::SetConstraintWeight { id, weight } => {
                match self.constraints.iter_mut().find(|c| c.id() == id) {
                    Some(constraint) => constraint.set_weight(buffer, weight),
                    None => debug!("weight for unknown {id}"),
                }
            }
            UpdateMessage::AddRenderer(renderer) => self.render_objects.add_renderer(buffer, renderer),
            UpdateMessage::RemoveRenderer(id) => self.render_objects.remove_renderer(buffer, id, &mut self.discard),
            UpdateMessage::AddGeometry { id, geometry } => self.render_objects.add_geometry(buffer, id, geometry),
            UpdateMessage::SetVertexData { geometry, buffer: index, data } => {
                self.render_objects.set_vertex_data(buffer, geometry, index, data);
            }
            UpdateMessage::SetIndexData { geometry, data } => self.render_objects.set_index_data(buffer, geometry, data),
            UpdateMessage::SetGeometryType { geometry, geometry_type } => {
                self.render_objects.set_geometry_type(buffer, geometry, geometry_type);
            }
            UpdateMessage::RemoveGeometry(id) => self.render_objects.remove_geometry(buffer, id, &mut self.discard),
            UpdateMessage::AddShader(id) => self.render_objects.add_shader(id),
            UpdateMessage::RemoveShader(id) => self.render_objects.remove_shader(buffer, id, &mut self.discard),
            UpdateMessage::AddRenderTask(task) => {
                if self.tasks.get(task.id()).is_some() {
                    error!("{} added twice", task.id());
                } else {
                    self.tasks.add(task);
                }
            }
            UpdateMessage::RemoveRenderTask(id) => {
                if self.tasks.remove(id).is_none() {
                    debug!("remove of unknown {id}");
                }
            }
            UpdateMessage::SetRenderTaskViewport { id, viewport } => match self.tasks.get_mut(id) {
                Some(task) => task.set_viewport(viewport),
                None => debug!("viewport for unknown {id}"),
            },
            UpdateMessage::SetBackgroundColor(color) => self.render_objects.set_background_color(buffer, color),
            UpdateMessage::SetResourceState { resource, state } => {
                let mut updated = 0;
                for node in self.owners.graph.iter_mut() {
                    if let Some(NodeAttachment::Renderable(r)) = node.attachment_mut() {
                        if r.set_resource_state(resource, state) {
                            updated += 1;
                        }
                    }
                }
                if state == ResourceState::Failed {
                    warn!("{resource} failed to load, {updated} renderables affected");
                } else {
                    debug!("{resource} now {state:?} for {updated} renderables");
                }
            }
            UpdateMessage::Stop => {
                info!("stop requested after frame {}", self.frame);
                self.stopped = true;
            }
        }
    }

    // --- tree mutation ----------------------------------------------------

    fn connect_node(&mut self, buffer: BufferIndex, parent: NodeId, child: NodeId) {
        if !self.owners.graph.contains(parent) || !self.owners.graph.contains(child) {
            error!("cannot connect {child} under {parent}: unknown node");
            return;
        }
        if !self.owners.graph.node(parent).is_some_and(Node::is_connected) {
            error!("cannot connect {child} under {parent}: parent is not in the scene graph");
            return;
        }
        let connected = self.owners.graph.connect_child(parent, child);
        self.publish_all(buffer, &connected, OwnerEvent::Connected);
    }

    fn disconnect_node(&mut self, buffer: BufferIndex, id: NodeId) {
        let Some(parent) = self.owners.graph.node(id).and_then(|n| n.parent()) else {
            debug!("{id} has no parent to disconnect from");
            return;
        };
        let disconnected = self.owners.graph.disconnect_child(parent, id);
        self.publish_all(buffer, &disconnected, OwnerEvent::Disconnected);
    }

    fn destroy_node(&mut self, buffer: BufferIndex, id: NodeId) {
        let Some(node) = self.owners.graph.node(id) else {
            debug!("destroy of unknown {id}");
            return;
        };
        if node.is_root() {
            error!("{id} is a root and cannot be destroyed");
            return;
        }
        self.disconnect_node(buffer, id);

        let Some(node) = self.owners.graph.remove_node(id) else { return };
        self.publish(buffer, id.into(), OwnerEvent::Destroyed);
        for task in self.tasks.remove_node_references(id) {
            debug!("{task} removed with {id}");
        }
        self.discard.add(buffer, Discardable::Node(Box::new(node)));
    }

    fn set_node_option(&mut self, id: NodeId, option: NodeOption) {
        let Some(node) = self.owners.graph.node_mut(id) else {
            error!("option {option:?} for unknown {id}");
            return;
        };
        match option {
            NodeOption::InheritOrientation(inherit) => node.set_inherit_orientation(inherit),
            NodeOption::InheritScale(inherit) => node.set_inherit_scale(inherit),
            NodeOption::PositionInheritance(mode) => node.set_position_inheritance(mode),
            NodeOption::ColorMode(mode) => node.set_color_mode(mode),
            NodeOption::DrawMode(mode) => node.set_draw_mode(mode),
        }
    }

    fn set_layer_option(&mut self, id: NodeId, option: LayerOption) {
        let Some(layer) = self.owners.graph.node_mut(id).and_then(|n| n.layer_mut()) else {
            error!("layer option for {id}, which is not a layer");
            return;
        };
        match option {
            LayerOption::Clipping(enabled) => layer.set_clipping(enabled),
            LayerOption::ClippingBox(clipping_box) => layer.set_clipping_box(clipping_box),
            LayerOption::DepthTestDisabled(disabled) => layer.set_depth_test_disabled(disabled),
            LayerOption::SortFunction(function) => layer.set_sort_function(function),
        }
    }

    fn set_renderable_option(&mut self, id: NodeId, option: RenderableOption) {
        let renderable = self
            .owners
            .graph
            .node_mut(id)
            .and_then(|n| n.attachment_mut())
            .and_then(NodeAttachment::as_renderable_mut);
        let Some(renderable) = renderable else {
            error!("renderable option {option:?} for {id}, which has no renderable");
            return;
        };
        match option {
            RenderableOption::UseBlend(blend) => renderable.set_use_blend(blend),
            RenderableOption::CullEnabled(enabled) => renderable.set_cull_enabled(enabled),
            RenderableOption::SortModifier(modifier) => renderable.set_sort_modifier(modifier),
        }
    }

    // --- animations and constraints --------------------------------------

    fn add_animation(&mut self, animation: Animation) {
        if self.animation(animation.id()).is_some() {
            error!("{} added twice", animation.id());
            return;
        }
        for owner in animation.targets() {
            self.observers.subscribe(owner, Observer::Animation(animation.id()));
        }
        self.animations.push(animation);
    }

    fn animation_command(&mut self, buffer: BufferIndex, id: AnimationId, command: AnimationCommand) {
        let Some(animation) = self.animations.iter_mut().find(|a| a.id() == id) else {
            debug!("{command:?} for unknown {id}");
            return;
        };
        match command {
            AnimationCommand::Play => animation.play(),
            AnimationCommand::PlayFrom(progress) => animation.play_from(progress),
            AnimationCommand::PlayTo(progress) => animation.play_to(progress),
            AnimationCommand::Pause => animation.pause(),
            AnimationCommand::Stop => {
                if animation.stop(buffer, &mut self.owners) {
                    self.notifications.push(Notification::AnimationFinished(id));
                }
            }
            AnimationCommand::SetDuration(seconds) => animation.set_duration(seconds),
            AnimationCommand::SetLooping(looping) => animation.set_looping(looping),
            AnimationCommand::SetLoopCount(count) => animation.set_loop_count(count),
            AnimationCommand::SetPlayRange(start, end) => animation.set_play_range(start, end),
            AnimationCommand::SetEndAction(action) => animation.set_end_action(action),
            AnimationCommand::SetDestroyAction(action) => animation.set_destroy_action(action),
        }
    }

    fn destroy_animation(&mut self, buffer: BufferIndex, id: AnimationId) {
        let Some(position) = self.animations.iter().position(|a| a.id() == id) else {
            debug!("destroy of unknown {id}");
            return;
        };
        let mut animation = self.animations.remove(position);
        animation.on_destroy(buffer, &mut self.owners);
        self.observers.unsubscribe_all(Observer::Animation(id));
    }

    fn add_constraint(&mut self, mut constraint: Constraint) {
        if self.constraint(constraint.id()).is_some() {
            error!("{} added twice", constraint.id());
            return;
        }
        let owners = constraint.owners();
        for owner in &owners {
            self.observers.subscribe(*owner, Observer::Constraint(constraint.id()));
        }
        if !owners.iter().all(|o| self.owners.is_connected(*o)) {
            debug!("{} waits for its owners to connect", constraint.id());
            constraint.on_owner_disconnected();
        }
        self.constraints.push(constraint);
    }

    fn remove_constraint(&mut self, id: ConstraintId) {
        let before = self.constraints.len();
        self.constraints.retain(|c| c.id() != id);
        if self.constraints.len() == before {
            debug!("remove of unknown {id}");
        }
        self.observers.unsubscribe_all(Observer::Constraint(id));
    }

    fn animate(&mut self, buffer: BufferIndex, elapsed_seconds: f32, stats: &mut FrameStats) {
        for animation in &mut self.animations {
            if animation.update(buffer, elapsed_seconds, &mut self.owners) {
                stats.animations_finished += 1;
                self.notifications.push(Notification::AnimationFinished(animation.id()));
            }
            stats.animators_applied += animation.animators_applied();
            if animation.state() == AnimationState::Playing {
                stats.animations_running += 1;
            }
        }
    }

    fn apply_constraints(&mut self, buffer: BufferIndex, elapsed_seconds: f32, stats: &mut FrameStats) {
        for constraint in &mut self.constraints {
            constraint.advance_weight(buffer, elapsed_seconds);
            match constraint.apply(buffer, &mut self.owners) {
                ApplyResult::Applied => stats.constraints_applied += 1,
                ApplyResult::Skipped => stats.constraints_skipped += 1,
                ApplyResult::Disconnected => stats.constraints_disconnected += 1,
            }
        }
    }

    // --- observer delivery ------------------------------------------------

    fn publish_all(&mut self, buffer: BufferIndex, nodes: &[NodeId], event: OwnerEvent) {
        for id in nodes {
            self.publish(buffer, (*id).into(), event);
        }
    }

    fn publish(&mut self, buffer: BufferIndex, owner: PropertyOwnerId, event: OwnerEvent) {
        let mut removed = Vec::new();
        for observer in self.observers.publish(owner, event) {
            match observer {
                Observer::Animation(id) => {
                    let Some(animation) = self.animations.iter_mut().find(|a| a.id() == id) else { continue };
                    match event {
                        OwnerEvent::Connected => {}
                        OwnerEvent::Disconnected => animation.on_owner_disconnected(owner, buffer, &mut self.owners),
                        OwnerEvent::Destroyed => animation.on_owner_destroyed(owner),
                    }
                }
                Observer::Constraint(id) => {
                    let Some(constraint) = self.constraints.iter_mut().find(|c| c.id() == id) else { continue };
                    match event {
                        OwnerEvent::Connected => constraint.on_owner_connected(&self.owners),
                        OwnerEvent::Disconnected => constraint.on_owner_disconnected(),
                        OwnerEvent::Destroyed if constraint.target() == owner => removed.push(id),
                        OwnerEvent::Destroyed => constraint.on_owner_disconnected(),
                    }
                }
            }
        }
        for id in removed {
            debug!("{id} removed with its target {owner}");
            self.remove_constraint(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animator, AnimatorFunction, ConstraintSource, EndAction};
    use crate::common::IdAllocator;
    use crate::foundation::math::Vec3;
    use crate::nodes::{Node, NodeAttachment, NodeProperty, RenderableAttachment};
    use crate::update::notification::notification_channel;
    use approx::assert_relative_eq;
    use std::sync::mpsc::{channel, Receiver, Sender};

    struct Harness {
        manager: UpdateManager,
        sender: Sender<UpdateMessage>,
        notifications: Receiver<Notification>,
        ids: IdAllocator,
        root: NodeId,
    }

    impl Harness {
        fn new() -> Self {
            let (sender, receiver) = channel();
            let (notify, notifications) = notification_channel();
            let manager = UpdateManager::new(
                &CoreConfig::default(),
                receiver,
                Some(notify),
                Arc::new(RenderQueue::new()),
                Arc::new(RenderInstructionBuffers::new()),
            );
            let ids = IdAllocator::new();
            let root = ids.node();
            let harness = Self { manager, sender, notifications, ids, root };
            harness.send(UpdateMessage::AddNode(Box::new(Node::new_layer(root))));
            harness.send(UpdateMessage::InstallRoot(root));
            harness
        }

        fn send(&self, message: UpdateMessage) {
            self.sender.send(message).unwrap();
        }

        fn add_child(&self, parent: NodeId) -> NodeId {
            let id = self.ids.node();
            self.send(UpdateMessage::AddNode(Box::new(Node::new(id))));
            self.send(UpdateMessage::ConnectNode { parent, child: id });
            id
        }

        fn position_x(&self, id: NodeId) -> f32 {
            let value = self
                .manager
                .owners()
                .value(BufferIndex::ZERO, id.into(), NodeProperty::Position.index())
                .unwrap();
            value.get::<Vec3>().unwrap().x
        }
    }

    #[test]
    fn test_messages_apply_in_order() {
        let mut h = Harness::new();
        let child = h.add_child(h.root);
        h.send(UpdateMessage::SetProperty {
            owner: child.into(),
            index: NodeProperty::Position.index(),
            value: PropertyValue::Vector3(Vec3::new(3.0, 0.0, 0.0)),
            mode: WriteMode::Bake,
        });

        let status = h.manager.update(0.016);
        assert_eq!(status.frame, 1);
        assert_eq!(status.buffer, BufferIndex::ZERO);
        assert_eq!(status.stats.messages, 5);
        let node = h.manager.graph().node(child).unwrap();
        assert_eq!(node.depth(), 1);
        assert_relative_eq!(node.world_position().x, 3.0);
        assert_eq!(h.manager.buffers().update_buffer_index(), BufferIndex::ONE);
    }

    #[test]
    fn test_bad_property_write_is_dropped() {
        let mut h = Harness::new();
        let child = h.add_child(h.root);
        h.send(UpdateMessage::SetProperty {
            owner: child.into(),
            index: NodeProperty::Position.index(),
            value: PropertyValue::Float(1.0),
            mode: WriteMode::Bake,
        });
        h.manager.update(0.016);
        assert_relative_eq!(h.position_x(child), 0.0);
    }

    #[test]
    fn test_destroyed_node_is_freed_two_updates_later() {
        let mut h = Harness::new();
        let child = h.add_child(h.root);
        h.manager.update(0.016);

        h.send(UpdateMessage::DestroyNode(child));
        h.manager.update(0.016);
        assert!(!h.manager.graph().contains(child));
        assert!(h.manager.discard_queue().contains_node(child));

        h.manager.update(0.016);
        assert!(h.manager.discard_queue().contains_node(child));
        h.manager.update(0.016);
        assert!(!h.manager.discard_queue().contains_node(child));
    }

    #[test]
    fn test_disconnected_subtree_renderables_leave_stage() {
        let mut h = Harness::new();
        let child = h.add_child(h.root);
        let grandchild = h.add_child(child);
        h.send(UpdateMessage::AttachToNode {
            node: grandchild,
            attachment: NodeAttachment::Renderable(RenderableAttachment::new(h.ids.renderer())),
        });
        h.manager.update(0.016);
        let on_stage = |m: &UpdateManager| {
            m.graph().node(grandchild).and_then(|n| n.attachment()).and_then(|a| a.as_renderable()).unwrap().is_on_stage()
        };
        assert!(on_stage(&h.manager));

        h.send(UpdateMessage::DisconnectNode(child));
        h.manager.update(0.016);
        assert!(!on_stage(&h.manager));
        assert!(!h.manager.graph().node(grandchild).unwrap().is_connected());

        h.send(UpdateMessage::ConnectNode { parent: h.root, child });
        h.manager.update(0.016);
        assert!(on_stage(&h.manager));
    }

    #[test]
    fn test_finished_animation_is_notified_once() {
        let mut h = Harness::new();
        let child = h.add_child(h.root);
        let id = h.ids.animation();
        let mut animation = Animation::new(id, 0.5);
        animation.add_animator(Animator::new(
            child,
            NodeProperty::Position.index(),
            AnimatorFunction::AnimateTo(PropertyValue::Vector3(Vec3::new(8.0, 0.0, 0.0))),
            0.5,
        ));
        animation.set_end_action(EndAction::Bake);
        h.send(UpdateMessage::AddAnimation(Box::new(animation)));
        h.send(UpdateMessage::AnimationCommand { id, command: AnimationCommand::Play });

        assert!(h.manager.update(0.3).keep_updating);
        h.manager.update(0.3);
        h.manager.update(0.3);
        assert_relative_eq!(h.position_x(child), 8.0);

        let finished: Vec<_> = h
            .notifications
            .try_iter()
            .filter(|n| matches!(n, Notification::AnimationFinished(_)))
            .collect();
        assert_eq!(finished, vec![Notification::AnimationFinished(id)]);
    }

    #[test]
    fn test_constraint_removed_with_target() {
        let mut h = Harness::new();
        let child = h.add_child(h.root);
        let id = h.ids.constraint();
        let constraint = Constraint::new(
            id,
            child,
            NodeProperty::Position.index(),
            vec![ConstraintSource::new(h.root, NodeProperty::Size.index())],
            Box::new(|_current: &PropertyValue, inputs: &[PropertyValue]| inputs[0]),
        );
        h.send(UpdateMessage::AddConstraint(Box::new(constraint)));
        h.manager.update(0.016);
        assert_eq!(h.manager.constraint_count(), 1);

        h.send(UpdateMessage::DestroyNode(child));
        h.manager.update(0.016);
        assert_eq!(h.manager.constraint_count(), 0);
        assert!(h.manager.observers().observers(h.root.into()).is_empty());
    }

    #[test]
    fn test_stop_message_stops() {
        let mut h = Harness::new();
        h.send(UpdateMessage::Stop);
        assert!(h.manager.update(0.016).stopped);
        assert!(h.manager.is_stopped());
    }
}
