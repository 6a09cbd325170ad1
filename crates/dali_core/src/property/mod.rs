//! # Property Model
//!
//! Every value the update thread animates or constrains lives in one of the
//! property containers defined here:
//!
//! ```text
//! AnimatableProperty<T>     value[2] + base + aging dirty flag   (position, color, custom)
//! InheritedProperty<T>      single derived value + flags         (world position, world color)
//! DoubleBufferedProperty<T> value[2], no base                    (camera matrices)
//! PlainProperty<T>          single value + changed flag          (parent origin, anchor point)
//! ```
//!
//! Type-erased access goes through [`PropertyInput`] (read) and
//! [`AnimatablePropertyBase`] (write), which is how animators and
//! constraints address a property by `(owner, index)`.

pub mod animatable;
pub mod double_buffered;
pub mod inherited;
pub mod observer;
pub mod owner;
pub mod plain;
pub mod value;

pub use animatable::AnimatableProperty;
pub use double_buffered::DoubleBufferedProperty;
pub use inherited::InheritedProperty;
pub use observer::{Observer, ObserverRegistry, OwnerEvent};
pub use owner::{CustomProperties, PropertyOwnerLookup, SceneObject};
pub use plain::PlainProperty;
pub use value::{PropertyType, PropertyValue, PropertyValueType};

use crate::common::{BufferIndex, PropertyOwnerId};

/// Index of a property within its owner
pub type PropertyIndex = u32;

/// First index handed out to custom properties
pub const CUSTOM_PROPERTY_START_INDEX: PropertyIndex = 50_000_000;

/// Property access errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// The owner does not exist (yet, or any more)
    #[error("unknown property owner {0}")]
    UnknownOwner(PropertyOwnerId),

    /// The owner has no property at that index
    #[error("{owner} has no property at index {index}")]
    UnknownIndex {
        /// Property owner
        owner: PropertyOwnerId,
        /// Requested index
        index: PropertyIndex,
    },

    /// The value type does not match the property type
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Type of the property
        expected: PropertyType,
        /// Type of the supplied value
        found: PropertyType,
    },

    /// The property can be read but not written
    #[error("property {0} is read-only")]
    ReadOnly(PropertyIndex),

    /// Component index outside the vector
    #[error("component {component} out of range for {property_type:?}")]
    InvalidComponent {
        /// Requested component
        component: u8,
        /// Type of the property
        property_type: PropertyType,
    },
}

/// Read access to a property, used for constraint inputs and animator targets
pub trait PropertyInput: Send {
    /// Type of the property
    fn property_type(&self) -> PropertyType;

    /// Value in the given buffer
    fn value(&self, buffer: BufferIndex) -> PropertyValue;

    /// False if the value changed since the last reset
    fn is_clean(&self) -> bool;

    /// False until a derived value has been computed at least once
    fn input_initialized(&self) -> bool {
        true
    }

    /// True if the value changed since the last reset
    fn input_changed(&self) -> bool {
        !self.is_clean()
    }
}

/// Write access to an animatable property
pub trait AnimatablePropertyBase: PropertyInput {
    /// Transient write of one buffer
    fn set_value(&mut self, buffer: BufferIndex, value: &PropertyValue) -> Result<(), PropertyError>;

    /// Durable write of both buffers and the base value
    fn bake_value(&mut self, buffer: BufferIndex, value: &PropertyValue) -> Result<(), PropertyError>;

    /// Restore the base value before animators run again
    fn reset_to_base_value(&mut self, buffer: BufferIndex);

    /// Bake a single vector component
    fn bake_component(&mut self, buffer: BufferIndex, component: u8, value: f32) -> Result<(), PropertyError> {
        let current = self.value(buffer);
        let updated = with_component(&current, component, value).ok_or(PropertyError::InvalidComponent {
            component,
            property_type: current.property_type(),
        })?;
        self.bake_value(buffer, &updated)
    }

    /// Read-only view
    fn as_input(&self) -> &dyn PropertyInput;
}

/// Copy of `value` with one vector component replaced
fn with_component(value: &PropertyValue, component: u8, v: f32) -> Option<PropertyValue> {
    let i = usize::from(component);
    match *value {
        PropertyValue::Vector2(mut vec) if i < 2 => {
            vec[i] = v;
            Some(PropertyValue::Vector2(vec))
        }
        PropertyValue::Vector3(mut vec) if i < 3 => {
            vec[i] = v;
            Some(PropertyValue::Vector3(vec))
        }
        PropertyValue::Vector4(mut vec) if i < 4 => {
            vec[i] = v;
            Some(PropertyValue::Vector4(vec))
        }
        _ => None,
    }
}

/// Check a value against the declared type of a property
pub fn check_type(expected: PropertyType, value: &PropertyValue) -> Result<(), PropertyError> {
    let found = value.property_type();
    if expected == found {
        Ok(())
    } else {
        Err(PropertyError::TypeMismatch { expected, found })
    }
}

/// How a property message writes its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Transient write of the update buffer
    Set,
    /// Durable write of both buffers
    Bake,
    /// Durable write of `current + value`
    BakeRelative,
}

/// Write `value` into `target` according to `mode`
pub fn write_property(
    target: &mut dyn AnimatablePropertyBase,
    buffer: BufferIndex,
    value: &PropertyValue,
    mode: WriteMode,
) -> Result<(), PropertyError> {
    match mode {
        WriteMode::Set => target.set_value(buffer, value),
        WriteMode::Bake => target.bake_value(buffer, value),
        WriteMode::BakeRelative => {
            let current = target.value(buffer);
            let updated = current.offset(value, 1.0).ok_or(PropertyError::TypeMismatch {
                expected: current.property_type(),
                found: value.property_type(),
            })?;
            target.bake_value(buffer, &updated)
        }
    }
}
