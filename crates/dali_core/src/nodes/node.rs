//! Scene-graph node: transform properties, world values and tree links.

use log::warn;

use super::attachment::NodeAttachment;
use super::flags::NodeFlags;
use super::layer::Layer;
use crate::common::{BufferIndex, NodeId, PropertyOwnerId};
use crate::foundation::math::constants::{FULLY_TRANSPARENT, MACHINE_EPSILON_1000, MAX_NODE_SIZE};
use crate::foundation::math::{Mat4, Quat, Vec3, Vec4};
use crate::property::{
    write_property, AnimatableProperty, AnimatablePropertyBase, CustomProperties, InheritedProperty, PlainProperty,
    PropertyError, PropertyIndex, PropertyInput, PropertyType, PropertyValue, WriteMode, CUSTOM_PROPERTY_START_INDEX,
};

/// Anchor and parent origin at the centre of a node
pub const HALF: Vec3 = Vec3::new(0.5, 0.5, 0.5);

/// Default property indices of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NodeProperty {
    /// Point of the parent the node is positioned from (non-animatable)
    ParentOrigin = 0,
    /// Point of the node that sits at its position (non-animatable)
    AnchorPoint = 1,
    /// Width, height and depth
    Size = 2,
    /// Local position
    Position = 3,
    /// Local orientation
    Orientation = 4,
    /// Local scale
    Scale = 5,
    /// Visibility
    Visible = 6,
    /// Local colour
    Color = 7,
    /// Derived world position (read-only)
    WorldPosition = 8,
    /// Derived world orientation (read-only)
    WorldOrientation = 9,
    /// Derived world scale (read-only)
    WorldScale = 10,
    /// Derived world colour (read-only)
    WorldColor = 11,
    /// Derived world matrix (read-only)
    WorldMatrix = 12,
}

impl NodeProperty {
    /// Every default property in index order
    pub const ALL: [Self; 13] = [
        Self::ParentOrigin,
        Self::AnchorPoint,
        Self::Size,
        Self::Position,
        Self::Orientation,
        Self::Scale,
        Self::Visible,
        Self::Color,
        Self::WorldPosition,
        Self::WorldOrientation,
        Self::WorldScale,
        Self::WorldColor,
        Self::WorldMatrix,
    ];

    /// Look up a default property
    pub fn from_index(index: PropertyIndex) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Property index
    pub const fn index(self) -> PropertyIndex {
        self as PropertyIndex
    }

    /// Value type
    pub const fn property_type(self) -> PropertyType {
        match self {
            Self::ParentOrigin | Self::AnchorPoint | Self::Size | Self::Position | Self::Scale | Self::WorldPosition
            | Self::WorldScale => PropertyType::Vector3,
            Self::Orientation | Self::WorldOrientation => PropertyType::Rotation,
            Self::Visible => PropertyType::Boolean,
            Self::Color | Self::WorldColor => PropertyType::Vector4,
            Self::WorldMatrix => PropertyType::Matrix,
        }
    }

    /// True if the event side may write it
    pub const fn is_writable(self) -> bool {
        (self as u32) < Self::WorldPosition as u32
    }

    /// True if animators and constraints may target it
    pub const fn is_animatable(self) -> bool {
        self.is_writable() && !matches!(self, Self::ParentOrigin | Self::AnchorPoint)
    }
}

/// How a node derives its world position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionInheritance {
    /// Parent world position plus the local position
    #[default]
    InheritParentPosition,
    /// Parent world position; the local position is ignored
    UseParentPosition,
    /// The local position is the world position
    DontInherit,
}

/// How a node derives its world colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Own colour only
    UseOwnColor,
    /// Parent world colour only
    UseParentColor,
    /// Own colour multiplied by the parent world colour
    UseOwnMultiplyParentColor,
    /// Own colour with alpha multiplied by the parent world alpha
    #[default]
    UseOwnMultiplyParentAlpha,
}

/// Render category override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Opaque or transparent, decided by alpha and blending
    #[default]
    Normal,
    /// Drawn after the rest of the layer
    Overlay,
    /// Writes the stencil buffer
    Stencil,
}

/// A node of the scene graph
///
/// Local properties are animatable and double-buffered. World values are
/// derived top-down by the update pass. Tree links are ids into the
/// scene-graph arena.
#[derive(Debug)]
pub struct Node {
    id: NodeId,

    pub(crate) parent_origin: PlainProperty<Vec3>,
    pub(crate) anchor_point: PlainProperty<Vec3>,
    pub(crate) size: AnimatableProperty<Vec3>,
    pub(crate) position: AnimatableProperty<Vec3>,
    pub(crate) orientation: AnimatableProperty<Quat>,
    pub(crate) scale: AnimatableProperty<Vec3>,
    pub(crate) visible: AnimatableProperty<bool>,
    pub(crate) color: AnimatableProperty<Vec4>,

    pub(crate) world_position: InheritedProperty<Vec3>,
    pub(crate) world_orientation: InheritedProperty<Quat>,
    pub(crate) world_scale: InheritedProperty<Vec3>,
    pub(crate) world_color: InheritedProperty<Vec4>,
    pub(crate) world_matrix: InheritedProperty<Mat4>,

    custom: CustomProperties,

    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: u32,
    pub(crate) is_root: bool,
    pub(crate) connected: bool,
    pub(crate) dirty_flags: NodeFlags,

    inherit_orientation: bool,
    inherit_scale: bool,
    position_inheritance: PositionInheritance,
    color_mode: ColorMode,
    draw_mode: DrawMode,

    pub(crate) attachment: Option<NodeAttachment>,
    pub(crate) layer: Option<Layer>,
}

impl Node {
    /// Plain node with default properties
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            parent_origin: PlainProperty::new(HALF),
            anchor_point: PlainProperty::new(HALF),
            size: AnimatableProperty::new(Vec3::zeros()),
            position: AnimatableProperty::new(Vec3::zeros()),
            orientation: AnimatableProperty::new(Quat::identity()),
            scale: AnimatableProperty::new(Vec3::new(1.0, 1.0, 1.0)),
            visible: AnimatableProperty::new(true),
            color: AnimatableProperty::new(Vec4::new(1.0, 1.0, 1.0, 1.0)),
            world_position: InheritedProperty::new(Vec3::zeros()),
            world_orientation: InheritedProperty::new(Quat::identity()),
            world_scale: InheritedProperty::new(Vec3::new(1.0, 1.0, 1.0)),
            world_color: InheritedProperty::new(Vec4::new(1.0, 1.0, 1.0, 1.0)),
            world_matrix: InheritedProperty::new(Mat4::identity()),
            custom: CustomProperties::new(),
            parent: None,
            children: Vec::new(),
            depth: 0,
            is_root: false,
            connected: false,
            dirty_flags: NodeFlags::all(),
            inherit_orientation: true,
            inherit_scale: true,
            position_inheritance: PositionInheritance::default(),
            color_mode: ColorMode::default(),
            draw_mode: DrawMode::default(),
            attachment: None,
            layer: None,
        }
    }

    /// Node carrying a layer
    pub fn new_layer(id: NodeId) -> Self {
        let mut node = Self::new(id);
        node.layer = Some(Layer::new());
        node
    }

    /// Node id
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Owner id for property addressing
    pub const fn owner_id(&self) -> PropertyOwnerId {
        PropertyOwnerId::Node(self.id)
    }

    // --- tree -------------------------------------------------------------

    /// Parent, if connected under one
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Tree level; 0 for a root
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// True for an installed root
    pub const fn is_root(&self) -> bool {
        self.is_root
    }

    /// True while reachable from a root
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    // --- properties -------------------------------------------------------

    /// Parent origin
    pub const fn parent_origin(&self) -> Vec3 {
        self.parent_origin.get()
    }

    /// Set the parent origin
    pub fn set_parent_origin(&mut self, origin: Vec3) {
        self.parent_origin.set(origin);
    }

    /// Anchor point
    pub const fn anchor_point(&self) -> Vec3 {
        self.anchor_point.get()
    }

    /// Set the anchor point
    pub fn set_anchor_point(&mut self, anchor: Vec3) {
        self.anchor_point.set(anchor);
    }

    /// Size property
    pub const fn size(&self) -> &AnimatableProperty<Vec3> {
        &self.size
    }

    /// Mutable size property
    pub fn size_mut(&mut self) -> &mut AnimatableProperty<Vec3> {
        &mut self.size
    }

    /// Position property
    pub const fn position(&self) -> &AnimatableProperty<Vec3> {
        &self.position
    }

    /// Mutable position property
    pub fn position_mut(&mut self) -> &mut AnimatableProperty<Vec3> {
        &mut self.position
    }

    /// Orientation property
    pub const fn orientation(&self) -> &AnimatableProperty<Quat> {
        &self.orientation
    }

    /// Mutable orientation property
    pub fn orientation_mut(&mut self) -> &mut AnimatableProperty<Quat> {
        &mut self.orientation
    }

    /// Scale property
    pub const fn scale(&self) -> &AnimatableProperty<Vec3> {
        &self.scale
    }

    /// Mutable scale property
    pub fn scale_mut(&mut self) -> &mut AnimatableProperty<Vec3> {
        &mut self.scale
    }

    /// Visible property
    pub const fn visible(&self) -> &AnimatableProperty<bool> {
        &self.visible
    }

    /// Mutable visible property
    pub fn visible_mut(&mut self) -> &mut AnimatableProperty<bool> {
        &mut self.visible
    }

    /// Colour property
    pub const fn color(&self) -> &AnimatableProperty<Vec4> {
        &self.color
    }

    /// Mutable colour property
    pub fn color_mut(&mut self) -> &mut AnimatableProperty<Vec4> {
        &mut self.color
    }

    /// Custom properties
    pub const fn custom(&self) -> &CustomProperties {
        &self.custom
    }

    /// Mutable custom properties
    pub fn custom_mut(&mut self) -> &mut CustomProperties {
        &mut self.custom
    }

    /// World position computed by the last update
    pub const fn world_position(&self) -> Vec3 {
        self.world_position.get()
    }

    /// World orientation computed by the last update
    pub const fn world_orientation(&self) -> Quat {
        self.world_orientation.get()
    }

    /// World scale computed by the last update
    pub const fn world_scale(&self) -> Vec3 {
        self.world_scale.get()
    }

    /// World colour computed by the last update
    pub const fn world_color(&self) -> Vec4 {
        self.world_color.get()
    }

    /// World matrix (translation, rotation, scale; size excluded)
    pub const fn world_matrix(&self) -> Mat4 {
        self.world_matrix.get()
    }

    /// Read access by index
    pub fn property(&self, index: PropertyIndex) -> Option<&dyn PropertyInput> {
        if index >= CUSTOM_PROPERTY_START_INDEX {
            return self.custom.get(index).map(|p| p.as_input());
        }
        let input: &dyn PropertyInput = match NodeProperty::from_index(index)? {
            NodeProperty::ParentOrigin => &self.parent_origin,
            NodeProperty::AnchorPoint => &self.anchor_point,
            NodeProperty::Size => &self.size,
            NodeProperty::Position => &self.position,
            NodeProperty::Orientation => &self.orientation,
            NodeProperty::Scale => &self.scale,
            NodeProperty::Visible => &self.visible,
            NodeProperty::Color => &self.color,
            NodeProperty::WorldPosition => &self.world_position,
            NodeProperty::WorldOrientation => &self.world_orientation,
            NodeProperty::WorldScale => &self.world_scale,
            NodeProperty::WorldColor => &self.world_color,
            NodeProperty::WorldMatrix => &self.world_matrix,
        };
        Some(input)
    }

    /// Write access by index, for animatable properties only
    pub fn animatable_mut(&mut self, index: PropertyIndex) -> Option<&mut dyn AnimatablePropertyBase> {
        if index >= CUSTOM_PROPERTY_START_INDEX {
            return self.custom.get_mut(index);
        }
        let property: &mut dyn AnimatablePropertyBase = match NodeProperty::from_index(index)? {
            NodeProperty::Size => &mut self.size,
            NodeProperty::Position => &mut self.position,
            NodeProperty::Orientation => &mut self.orientation,
            NodeProperty::Scale => &mut self.scale,
            NodeProperty::Visible => &mut self.visible,
            NodeProperty::Color => &mut self.color,
            _ => return None,
        };
        Some(property)
    }

    /// Write a property from a message
    ///
    /// Parent origin and anchor point are plain values and are always
    /// baked, whatever `mode` says.
    pub fn write_property(
        &mut self,
        buffer: BufferIndex,
        index: PropertyIndex,
        value: &PropertyValue,
        mode: WriteMode,
    ) -> Result<(), PropertyError> {
        let owner = self.owner_id();
        match NodeProperty::from_index(index) {
            Some(NodeProperty::ParentOrigin | NodeProperty::AnchorPoint) => {
                let v = match value {
                    PropertyValue::Vector3(v) => *v,
                    other => {
                        return Err(PropertyError::TypeMismatch {
                            expected: PropertyType::Vector3,
                            found: other.property_type(),
                        })
                    }
                };
                if index == NodeProperty::ParentOrigin.index() {
                    self.set_parent_origin(v);
                } else {
                    self.set_anchor_point(v);
                }
                Ok(())
            }
            Some(p) if !p.is_writable() => Err(PropertyError::ReadOnly(index)),
            _ => {
                let target = self
                    .animatable_mut(index)
                    .ok_or(PropertyError::UnknownIndex { owner, index })?;
                write_property(target, buffer, value, mode)
            }
        }
    }

    // --- settings ---------------------------------------------------------

    /// True if the parent's world orientation is inherited
    pub const fn inherit_orientation(&self) -> bool {
        self.inherit_orientation
    }

    /// Set orientation inheritance
    pub fn set_inherit_orientation(&mut self, inherit: bool) {
        if self.inherit_orientation != inherit {
            self.inherit_orientation = inherit;
            self.dirty_flags |= NodeFlags::TRANSFORM;
        }
    }

    /// True if the parent's world scale is inherited
    pub const fn inherit_scale(&self) -> bool {
        self.inherit_scale
    }

    /// Set scale inheritance
    pub fn set_inherit_scale(&mut self, inherit: bool) {
        if self.inherit_scale != inherit {
            self.inherit_scale = inherit;
            self.dirty_flags |= NodeFlags::TRANSFORM;
        }
    }

    /// Position inheritance mode
    pub const fn position_inheritance(&self) -> PositionInheritance {
        self.position_inheritance
    }

    /// Set position inheritance
    pub fn set_position_inheritance(&mut self, mode: PositionInheritance) {
        if self.position_inheritance != mode {
            self.position_inheritance = mode;
            self.dirty_flags |= NodeFlags::TRANSFORM;
        }
    }

    /// Colour mode
    pub const fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Set the colour mode
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        if self.color_mode != mode {
            self.color_mode = mode;
            self.dirty_flags |= NodeFlags::COLOR;
        }
    }

    /// Draw mode
    pub const fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Set the draw mode
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        if self.draw_mode != mode {
            self.draw_mode = mode;
            self.dirty_flags |= NodeFlags::OVERLAY;
        }
    }

    // --- attachment and layer ---------------------------------------------

    /// Attachment, if any
    pub const fn attachment(&self) -> Option<&NodeAttachment> {
        self.attachment.as_ref()
    }

    /// Mutable attachment
    pub fn attachment_mut(&mut self) -> Option<&mut NodeAttachment> {
        self.attachment.as_mut()
    }

    /// Replace the attachment; a connected node informs it immediately
    pub fn attach(&mut self, mut attachment: NodeAttachment) {
        if self.connected {
            attachment.connected_to_scene_graph();
        }
        self.attachment = Some(attachment);
        self.set_all_dirty_flags();
    }

    /// Layer data, if this node is a layer
    pub const fn layer(&self) -> Option<&Layer> {
        self.layer.as_ref()
    }

    /// Mutable layer data
    pub fn layer_mut(&mut self) -> Option<&mut Layer> {
        self.layer.as_mut()
    }

    /// True if this node is a layer
    pub const fn is_layer(&self) -> bool {
        self.layer.is_some()
    }

    // --- dirty flags ------------------------------------------------------

    /// Flags stored on the node plus whatever its properties report
    pub fn dirty_flags(&self) -> NodeFlags {
        let mut flags = self.dirty_flags;

        if !self.size.is_clean()
            || !self.position.is_clean()
            || !self.orientation.is_clean()
            || !self.scale.is_clean()
            || self.parent_origin.changed()
            || self.anchor_point.changed()
        {
            flags |= NodeFlags::TRANSFORM;
        }
        if !self.visible.is_clean() {
            flags |= NodeFlags::VISIBLE;
        }
        if !self.color.is_clean() {
            flags |= NodeFlags::COLOR;
        }
        if !self.size.is_clean() {
            flags |= NodeFlags::SIZE;
        }

        flags
    }

    /// Force a full recompute on the next update
    pub fn set_all_dirty_flags(&mut self) {
        self.dirty_flags = NodeFlags::all();
    }

    /// Start of frame: restore base values and clear the flags
    pub fn reset_default_properties(&mut self, buffer: BufferIndex) {
        self.parent_origin.clear();
        self.anchor_point.clear();
        self.size.reset_to_base_value(buffer);
        self.position.reset_to_base_value(buffer);
        self.orientation.reset_to_base_value(buffer);
        self.scale.reset_to_base_value(buffer);
        self.visible.reset_to_base_value(buffer);
        self.color.reset_to_base_value(buffer);
        self.custom.reset_to_base_values(buffer);

        self.world_position.mark_clean();
        self.world_orientation.mark_clean();
        self.world_scale.mark_clean();
        self.world_color.mark_clean();
        self.world_matrix.mark_clean();

        self.dirty_flags = NodeFlags::empty();
    }

    // --- visibility -------------------------------------------------------

    /// Visible property in `buffer`, ignoring ancestors
    pub fn is_visible(&self, buffer: BufferIndex) -> bool {
        self.visible.get(buffer)
    }

    /// Visible for rendering: visible, not transparent and of sane size
    ///
    /// Degenerate sizes are logged and treated as not visible.
    pub fn resolve_visibility(&self, buffer: BufferIndex) -> bool {
        if !self.visible.get(buffer) {
            return false;
        }
        if self.world_color.get().w <= FULLY_TRANSPARENT {
            return false;
        }

        let size = self.size.get(buffer);
        if size.x <= MACHINE_EPSILON_1000 || size.y <= MACHINE_EPSILON_1000 {
            warn!("{} has zero area ({} x {}), not rendering", self.id, size.x, size.y);
            return false;
        }
        if size.x >= MAX_NODE_SIZE || size.y >= MAX_NODE_SIZE {
            warn!("{} size {} x {} exceeds 2^30, not rendering", self.id, size.x, size.y);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const B0: BufferIndex = BufferIndex::ZERO;
    const B1: BufferIndex = BufferIndex::ONE;

    fn node() -> Node {
        let mut n = Node::new(NodeId::from_raw(1));
        n.reset_default_properties(B0);
        n.reset_default_properties(B1);
        n
    }

    #[test]
    fn test_new_node_is_fully_dirty() {
        assert_eq!(Node::new(NodeId::from_raw(1)).dirty_flags(), NodeFlags::all());
    }

    #[test]
    fn test_clean_after_resets() {
        assert_eq!(node().dirty_flags(), NodeFlags::empty());
    }

    #[test]
    fn test_bake_sets_flags_until_reset() {
        let mut n = node();
        n.size_mut().bake(B0, Vec3::new(10.0, 10.0, 0.0));
        assert!(n.dirty_flags().contains(NodeFlags::TRANSFORM | NodeFlags::SIZE));

        n.color_mut().bake(B0, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert!(n.dirty_flags().contains(NodeFlags::COLOR));

        n.reset_default_properties(B1);
        n.reset_default_properties(B0);
        assert_eq!(n.dirty_flags(), NodeFlags::empty());
    }

    #[test]
    fn test_parent_origin_marks_transform() {
        let mut n = node();
        n.write_property(B0, NodeProperty::ParentOrigin.index(), &PropertyValue::Vector3(Vec3::zeros()), WriteMode::Set)
            .unwrap();
        assert_eq!(n.dirty_flags(), NodeFlags::TRANSFORM);
        assert_eq!(n.parent_origin(), Vec3::zeros());
    }

    #[test]
    fn test_write_property_errors() {
        let mut n = node();
        let world = NodeProperty::WorldPosition.index();
        assert_eq!(
            n.write_property(B0, world, &PropertyValue::Vector3(Vec3::zeros()), WriteMode::Bake),
            Err(PropertyError::ReadOnly(world))
        );
        assert!(matches!(
            n.write_property(B0, 999, &PropertyValue::Float(1.0), WriteMode::Bake),
            Err(PropertyError::UnknownIndex { .. })
        ));
        assert!(matches!(
            n.write_property(B0, NodeProperty::Visible.index(), &PropertyValue::Float(1.0), WriteMode::Bake),
            Err(PropertyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_bake_relative() {
        let mut n = node();
        let index = NodeProperty::Position.index();
        n.write_property(B0, index, &PropertyValue::Vector3(Vec3::new(1.0, 0.0, 0.0)), WriteMode::Bake).unwrap();
        n.write_property(B0, index, &PropertyValue::Vector3(Vec3::new(2.0, 1.0, 0.0)), WriteMode::BakeRelative)
            .unwrap();
        assert_relative_eq!(n.position().get(B1).x, 3.0);
        assert_relative_eq!(n.position().get(B1).y, 1.0);
    }

    #[test]
    fn test_resolve_visibility() {
        let mut n = node();
        assert!(!n.resolve_visibility(B0), "zero size is not visible");

        n.size_mut().bake(B0, Vec3::new(10.0, 10.0, 0.0));
        assert!(n.resolve_visibility(B0));

        n.size_mut().bake(B0, Vec3::new(2.0e9, 10.0, 0.0));
        assert!(!n.resolve_visibility(B0));

        n.size_mut().bake(B0, Vec3::new(10.0, 10.0, 0.0));
        n.world_color.set(Vec4::new(1.0, 1.0, 1.0, 0.0));
        assert!(!n.resolve_visibility(B0));

        n.world_color.set(Vec4::new(1.0, 1.0, 1.0, 1.0));
        n.visible_mut().set(B0, false);
        assert!(!n.resolve_visibility(B0));
        assert!(n.resolve_visibility(B1));
    }

    #[test]
    fn test_property_lookup() {
        let n = node();
        assert_eq!(n.property(NodeProperty::WorldMatrix.index()).unwrap().property_type(), PropertyType::Matrix);
        assert!(n.property(NodeProperty::WorldColor.index()).is_some());
        assert!(NodeProperty::from_index(13).is_none());
        assert!(!NodeProperty::AnchorPoint.is_animatable());
        assert!(NodeProperty::Color.is_animatable());
    }
}
