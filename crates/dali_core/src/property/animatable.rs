//! Double-buffered animatable property with a base value.

use super::{check_type, AnimatablePropertyBase, PropertyError, PropertyInput, PropertyType, PropertyValue, PropertyValueType};
use crate::common::BufferIndex;
use crate::foundation::math::{Vec2, Vec3, Vec4};

const CLEAN_FLAG: u8 = 0x00;
const BAKED_FLAG: u8 = 0x01;
const SET_FLAG: u8 = 0x02;

/// An animatable value held once per buffer
///
/// `set` is transient: the written buffer goes back to the base value on
/// the next reset of that buffer. `bake` is durable: it writes both
/// buffers and the base value.
///
/// The dirty flag ages by one step per reset (`SET -> BAKED -> CLEAN`), so
/// a change is visible to `is_clean` until both buffers have been reset
/// once.
#[derive(Debug, Clone)]
pub struct AnimatableProperty<T> {
    values: [T; 2],
    base: T,
    dirty: u8,
}

impl<T: Copy> AnimatableProperty<T> {
    /// New property with both buffers at `initial`
    pub const fn new(initial: T) -> Self {
        Self {
            values: [initial, initial],
            base: initial,
            dirty: BAKED_FLAG,
        }
    }

    /// Value in `buffer`
    pub fn get(&self, buffer: BufferIndex) -> T {
        self.values[buffer.get()]
    }

    /// Non-animated base value
    pub const fn base(&self) -> T {
        self.base
    }

    /// Transient write of one buffer
    pub fn set(&mut self, buffer: BufferIndex, value: T) {
        self.values[buffer.get()] = value;
        self.dirty = SET_FLAG;
    }

    /// Durable write of both buffers
    pub fn bake(&mut self, buffer: BufferIndex, value: T) {
        self.values[buffer.get()] = value;
        self.values[buffer.other().get()] = value;
        self.base = value;
        self.dirty = BAKED_FLAG;
    }

    /// Restore `buffer` to the base value and age the dirty flag
    pub fn reset_to_base_value(&mut self, buffer: BufferIndex) {
        if self.dirty != CLEAN_FLAG {
            self.values[buffer.get()] = self.base;
            self.dirty >>= 1;
        }
    }

    /// True once both buffers have been reset since the last write
    pub const fn is_clean(&self) -> bool {
        self.dirty == CLEAN_FLAG
    }
}

macro_rules! component_bakes {
    ($ty:ty, $($name:ident => $i:literal),+) => {
        impl AnimatableProperty<$ty> {
            $(
                #[doc = concat!("Bake component ", stringify!($i), " leaving the others untouched")]
                pub fn $name(&mut self, buffer: BufferIndex, value: f32) {
                    let mut v = self.get(buffer);
                    v[$i] = value;
                    self.bake(buffer, v);
                }
            )+
        }
    };
}

component_bakes!(Vec2, bake_x => 0, bake_y => 1);
component_bakes!(Vec3, bake_x => 0, bake_y => 1, bake_z => 2);
component_bakes!(Vec4, bake_x => 0, bake_y => 1, bake_z => 2, bake_w => 3);

impl<T: PropertyValueType> PropertyInput for AnimatableProperty<T> {
    fn property_type(&self) -> PropertyType {
        T::TYPE
    }

    fn value(&self, buffer: BufferIndex) -> PropertyValue {
        self.get(buffer).into_value()
    }

    fn is_clean(&self) -> bool {
        AnimatableProperty::is_clean(self)
    }
}

impl<T: PropertyValueType> AnimatablePropertyBase for AnimatableProperty<T> {
    fn set_value(&mut self, buffer: BufferIndex, value: &PropertyValue) -> Result<(), PropertyError> {
        check_type(T::TYPE, value)?;
        if let Some(v) = T::from_value(value) {
            self.set(buffer, v);
        }
        Ok(())
    }

    fn bake_value(&mut self, buffer: BufferIndex, value: &PropertyValue) -> Result<(), PropertyError> {
        check_type(T::TYPE, value)?;
        if let Some(v) = T::from_value(value) {
            self.bake(buffer, v);
        }
        Ok(())
    }

    fn reset_to_base_value(&mut self, buffer: BufferIndex) {
        AnimatableProperty::reset_to_base_value(self, buffer);
    }

    fn as_input(&self) -> &dyn PropertyInput {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const B0: BufferIndex = BufferIndex::ZERO;
    const B1: BufferIndex = BufferIndex::ONE;

    #[test]
    fn test_bake_writes_both_buffers() {
        let mut p = AnimatableProperty::new(0.0_f32);
        p.bake(B0, 3.0);
        assert_relative_eq!(p.get(B0), 3.0);
        assert_relative_eq!(p.get(B1), 3.0);
        assert_relative_eq!(p.base(), 3.0);
    }

    #[test]
    fn test_set_writes_one_buffer() {
        let mut p = AnimatableProperty::new(1.0_f32);
        p.set(B1, 7.0);
        assert_relative_eq!(p.get(B1), 7.0);
        assert_relative_eq!(p.get(B0), 1.0);
        assert!(!p.is_clean());
    }

    #[test]
    fn test_set_reverts_after_two_resets() {
        let mut p = AnimatableProperty::new(1.0_f32);
        p.reset_to_base_value(B0);
        p.reset_to_base_value(B1);
        assert!(p.is_clean());

        p.set(B0, 5.0);
        p.reset_to_base_value(B1);
        assert!(!p.is_clean());
        p.reset_to_base_value(B0);
        assert_relative_eq!(p.get(B0), 1.0);
        assert!(p.is_clean());
    }

    #[test]
    fn test_component_bake() {
        let mut p = AnimatableProperty::new(Vec3::new(1.0, 2.0, 3.0));
        p.bake_y(B0, 9.0);
        assert_eq!(p.get(B1), Vec3::new(1.0, 9.0, 3.0));

        let mut dynamic: Box<dyn AnimatablePropertyBase> = Box::new(AnimatableProperty::new(Vec4::zeros()));
        dynamic.bake_component(B0, 3, 0.5).unwrap();
        assert_eq!(dynamic.value(B1), PropertyValue::Vector4(Vec4::new(0.0, 0.0, 0.0, 0.5)));
        assert!(dynamic.bake_component(B0, 4, 0.5).is_err());
    }

    #[test]
    fn test_dynamic_type_check() {
        let mut p = AnimatableProperty::new(0.0_f32);
        let err = p.set_value(B0, &PropertyValue::Boolean(true)).unwrap_err();
        assert_eq!(
            err,
            PropertyError::TypeMismatch { expected: PropertyType::Float, found: PropertyType::Boolean }
        );
        p.bake_value(B0, &PropertyValue::Float(2.0)).unwrap();
        assert_relative_eq!(p.get(B1), 2.0);
    }
}
