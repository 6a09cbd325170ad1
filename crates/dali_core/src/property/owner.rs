//! Property owners: custom property storage and lookup by `(owner, index)`.

use super::{
    AnimatableProperty, AnimatablePropertyBase, PropertyError, PropertyIndex, PropertyInput, PropertyValue,
    CUSTOM_PROPERTY_START_INDEX,
};
use crate::common::{BufferIndex, ObjectId, PropertyOwnerId};

/// Resolves property addresses for animators and constraints
///
/// Implemented over the node arena and the stand-alone object map, so the
/// animation engine can write a property without holding a reference to
/// its owner between frames.
pub trait PropertyOwnerLookup {
    /// Read access to a property, `None` if the owner or index is unknown
    fn input(&self, owner: PropertyOwnerId, index: PropertyIndex) -> Option<&dyn PropertyInput>;

    /// Write access to an animatable property
    fn animatable_mut(&mut self, owner: PropertyOwnerId, index: PropertyIndex)
        -> Option<&mut dyn AnimatablePropertyBase>;

    /// True if the owner is connected to the scene graph
    fn is_connected(&self, owner: PropertyOwnerId) -> bool;
}

/// Build an animatable property holding `initial`
pub fn make_animatable(initial: &PropertyValue) -> Box<dyn AnimatablePropertyBase> {
    match *initial {
        PropertyValue::Boolean(v) => Box::new(AnimatableProperty::new(v)),
        PropertyValue::Float(v) => Box::new(AnimatableProperty::new(v)),
        PropertyValue::Integer(v) => Box::new(AnimatableProperty::new(v)),
        PropertyValue::Vector2(v) => Box::new(AnimatableProperty::new(v)),
        PropertyValue::Vector3(v) => Box::new(AnimatableProperty::new(v)),
        PropertyValue::Vector4(v) => Box::new(AnimatableProperty::new(v)),
        PropertyValue::Rotation(v) => Box::new(AnimatableProperty::new(v)),
        PropertyValue::Matrix(v) => Box::new(AnimatableProperty::new(v)),
    }
}

/// Custom properties installed on a node or object at run time
#[derive(Default)]
pub struct CustomProperties {
    properties: Vec<Box<dyn AnimatablePropertyBase>>,
}

impl std::fmt::Debug for CustomProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomProperties").field("count", &self.properties.len()).finish()
    }
}

impl CustomProperties {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next installed property will get
    pub fn next_index(&self) -> PropertyIndex {
        CUSTOM_PROPERTY_START_INDEX + self.properties.len() as PropertyIndex
    }

    /// Install a property at `index`, which must be `next_index()`
    ///
    /// The event side hands out custom indices in order, so a gap means a
    /// message was lost or reordered.
    pub fn install(
        &mut self,
        owner: PropertyOwnerId,
        index: PropertyIndex,
        initial: &PropertyValue,
    ) -> Result<(), PropertyError> {
        if index != self.next_index() {
            return Err(PropertyError::UnknownIndex { owner, index });
        }
        self.properties.push(make_animatable(initial));
        Ok(())
    }

    fn slot(index: PropertyIndex) -> Option<usize> {
        index.checked_sub(CUSTOM_PROPERTY_START_INDEX).map(|i| i as usize)
    }

    /// Property at `index`
    pub fn get(&self, index: PropertyIndex) -> Option<&dyn AnimatablePropertyBase> {
        Self::slot(index)
            .and_then(|i| self.properties.get(i))
            .map(|p| &**p)
    }

    /// Mutable property at `index`
    pub fn get_mut(&mut self, index: PropertyIndex) -> Option<&mut dyn AnimatablePropertyBase> {
        let i = Self::slot(index)?;
        let property: &mut dyn AnimatablePropertyBase = self.properties.get_mut(i)?.as_mut();
        Some(property)
    }

    /// Reset every property in `buffer`
    pub fn reset_to_base_values(&mut self, buffer: BufferIndex) {
        for property in &mut self.properties {
            property.reset_to_base_value(buffer);
        }
    }

    /// True if no property changed since the last reset
    pub fn is_clean(&self) -> bool {
        self.properties.iter().all(|p| p.is_clean())
    }

    /// Number of installed properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True if nothing is installed
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// A property owner that is not part of the node tree
///
/// Holds only custom properties, for example uniforms shared by several
/// renderers. It counts as connected for as long as it exists.
#[derive(Debug)]
pub struct SceneObject {
    id: ObjectId,
    custom: CustomProperties,
}

impl SceneObject {
    /// Create an object without properties
    pub fn new(id: ObjectId) -> Self {
        Self { id, custom: CustomProperties::new() }
    }

    /// Object id
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Installed properties
    pub const fn custom(&self) -> &CustomProperties {
        &self.custom
    }

    /// Installed properties, mutable
    pub fn custom_mut(&mut self) -> &mut CustomProperties {
        &mut self.custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ObjectId;

    #[test]
    fn test_install_in_order() {
        let owner = PropertyOwnerId::Object(ObjectId::from_raw(1));
        let mut custom = CustomProperties::new();
        let first = custom.next_index();
        custom.install(owner, first, &PropertyValue::Float(1.0)).unwrap();
        assert_eq!(custom.next_index(), first + 1);

        let err = custom.install(owner, first + 5, &PropertyValue::Float(1.0)).unwrap_err();
        assert!(matches!(err, PropertyError::UnknownIndex { .. }));

        assert!(custom.get(first).is_some());
        assert!(custom.get(first + 1).is_none());
        assert!(custom.get(3).is_none());
    }

    #[test]
    fn test_reset_restores_base() {
        let owner = PropertyOwnerId::Object(ObjectId::from_raw(1));
        let mut custom = CustomProperties::new();
        let index = custom.next_index();
        custom.install(owner, index, &PropertyValue::Integer(4)).unwrap();

        let property = custom.get_mut(index).unwrap();
        property.set_value(BufferIndex::ZERO, &PropertyValue::Integer(9)).unwrap();
        assert!(!custom.is_clean());

        custom.reset_to_base_values(BufferIndex::ZERO);
        assert_eq!(custom.get(index).unwrap().value(BufferIndex::ZERO), PropertyValue::Integer(4));
    }
}
