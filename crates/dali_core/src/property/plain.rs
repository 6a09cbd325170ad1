//! Non-animatable property with a changed flag.

use super::{PropertyInput, PropertyType, PropertyValue, PropertyValueType};
use crate::common::BufferIndex;

/// A single value that is baked from the event side and never animated
#[derive(Debug, Clone)]
pub struct PlainProperty<T> {
    value: T,
    changed: bool,
}

impl<T: Copy> PlainProperty<T> {
    /// New property, initially marked changed so dependents compute once
    pub const fn new(initial: T) -> Self {
        Self { value: initial, changed: true }
    }

    /// Current value
    pub const fn get(&self) -> T {
        self.value
    }

    /// Replace the value
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.changed = true;
    }

    /// Forget the changed flag
    pub fn clear(&mut self) {
        self.changed = false;
    }

    /// True if the value was replaced since the last `clear`
    pub const fn changed(&self) -> bool {
        self.changed
    }
}

impl<T: PropertyValueType> PropertyInput for PlainProperty<T> {
    fn property_type(&self) -> PropertyType {
        T::TYPE
    }

    fn value(&self, _buffer: BufferIndex) -> PropertyValue {
        self.value.into_value()
    }

    fn is_clean(&self) -> bool {
        !self.changed
    }
}
