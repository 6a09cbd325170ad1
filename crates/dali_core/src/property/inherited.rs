//! Derived values computed from a node and its parent.

use super::{PropertyInput, PropertyType, PropertyValue, PropertyValueType};
use crate::common::BufferIndex;

/// A world-space value inherited through the tree
///
/// Holds a single value: it is recomputed from scratch every time the
/// transform or colour of the node is dirty, so it never needs a base
/// value. Constraints may only read it once it has been computed at least
/// once.
#[derive(Debug, Clone)]
pub struct InheritedProperty<T> {
    value: T,
    inherited: bool,
    reinherited: bool,
}

impl<T: Copy> InheritedProperty<T> {
    /// New property that has not been inherited yet
    pub const fn new(initial: T) -> Self {
        Self {
            value: initial,
            inherited: false,
            reinherited: true,
        }
    }

    /// Current value
    pub const fn get(&self) -> T {
        self.value
    }

    /// Store a freshly inherited value
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.inherited = true;
        self.reinherited = true;
    }

    /// Keep the value but mark it unchanged for this frame
    pub fn mark_clean(&mut self) {
        self.reinherited = false;
    }

    /// True once `set` has been called
    pub const fn is_initialized(&self) -> bool {
        self.inherited
    }
}

impl<T: PropertyValueType> PropertyInput for InheritedProperty<T> {
    fn property_type(&self) -> PropertyType {
        T::TYPE
    }

    fn value(&self, _buffer: BufferIndex) -> PropertyValue {
        self.value.into_value()
    }

    fn is_clean(&self) -> bool {
        !self.reinherited
    }

    fn input_initialized(&self) -> bool {
        self.inherited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_initialization_flags() {
        let mut p = InheritedProperty::new(Vec3::zeros());
        assert!(!p.input_initialized());
        assert!(!PropertyInput::is_clean(&p));

        p.mark_clean();
        assert!(PropertyInput::is_clean(&p));

        p.set(Vec3::new(1.0, 0.0, 0.0));
        assert!(p.input_initialized());
        assert!(p.input_changed());
        assert_eq!(p.value(BufferIndex::ONE), PropertyValue::Vector3(Vec3::new(1.0, 0.0, 0.0)));
    }
}
