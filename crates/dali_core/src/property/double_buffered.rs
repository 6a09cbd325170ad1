//! Per-buffer value without a base, for values recomputed every frame.

use super::{PropertyInput, PropertyType, PropertyValue, PropertyValueType};
use crate::common::BufferIndex;

/// A value held once per buffer with a per-buffer dirty flag
///
/// Used for camera view and projection matrices: the update thread writes
/// the update buffer while the render thread may still read the other one.
#[derive(Debug, Clone)]
pub struct DoubleBufferedProperty<T> {
    values: [T; 2],
    dirty: [bool; 2],
}

impl<T: Copy> DoubleBufferedProperty<T> {
    /// Both buffers at `initial`, both dirty
    pub const fn new(initial: T) -> Self {
        Self {
            values: [initial, initial],
            dirty: [true, true],
        }
    }

    /// Value in `buffer`
    pub fn get(&self, buffer: BufferIndex) -> T {
        self.values[buffer.get()]
    }

    /// Write one buffer
    pub fn set(&mut self, buffer: BufferIndex, value: T) {
        self.values[buffer.get()] = value;
        self.dirty[buffer.get()] = true;
    }

    /// Write both buffers
    pub fn bake(&mut self, buffer: BufferIndex, value: T) {
        self.values = [value, value];
        self.dirty[buffer.get()] = true;
        self.dirty[buffer.other().get()] = true;
    }

    /// Copy the value from the other buffer into `buffer`
    pub fn copy_previous(&mut self, buffer: BufferIndex) {
        self.values[buffer.get()] = self.values[buffer.other().get()];
        self.dirty[buffer.get()] = false;
    }

    /// Clear the dirty flag of `buffer`
    pub fn mark_clean(&mut self, buffer: BufferIndex) {
        self.dirty[buffer.get()] = false;
    }

    /// True if `buffer` was written since it was last marked clean
    pub fn is_dirty(&self, buffer: BufferIndex) -> bool {
        self.dirty[buffer.get()]
    }
}

impl<T: PropertyValueType> PropertyInput for DoubleBufferedProperty<T> {
    fn property_type(&self) -> PropertyType {
        T::TYPE
    }

    fn value(&self, buffer: BufferIndex) -> PropertyValue {
        self.get(buffer).into_value()
    }

    fn is_clean(&self) -> bool {
        !self.dirty[0] && !self.dirty[1]
    }
}
