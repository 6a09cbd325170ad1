//! Type-erased property values.

use crate::foundation::math::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Type tag of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// `bool`
    Boolean,
    /// `f32`
    Float,
    /// `i32`
    Integer,
    /// 2 component vector
    Vector2,
    /// 3 component vector
    Vector3,
    /// 4 component vector (colours)
    Vector4,
    /// Unit quaternion
    Rotation,
    /// 4x4 matrix (read-only world matrix input)
    Matrix,
}

/// A property value of any supported type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    /// `bool`
    Boolean(bool),
    /// `f32`
    Float(f32),
    /// `i32`
    Integer(i32),
    /// 2 component vector
    Vector2(Vec2),
    /// 3 component vector
    Vector3(Vec3),
    /// 4 component vector
    Vector4(Vec4),
    /// Unit quaternion
    Rotation(Quat),
    /// 4x4 matrix
    Matrix(Mat4),
}

impl PropertyValue {
    /// Type tag of this value
    pub const fn property_type(&self) -> PropertyType {
        match self {
            Self::Boolean(_) => PropertyType::Boolean,
            Self::Float(_) => PropertyType::Float,
            Self::Integer(_) => PropertyType::Integer,
            Self::Vector2(_) => PropertyType::Vector2,
            Self::Vector3(_) => PropertyType::Vector3,
            Self::Vector4(_) => PropertyType::Vector4,
            Self::Rotation(_) => PropertyType::Rotation,
            Self::Matrix(_) => PropertyType::Matrix,
        }
    }

    /// Typed accessor
    pub fn get<T: PropertyValueType>(&self) -> Option<T> {
        T::from_value(self)
    }

    /// Interpolate towards `target`
    ///
    /// Booleans step at `alpha >= 1`, integers round half up, rotations
    /// slerp and matrices switch over at the midpoint. Returns `None` when
    /// the types differ.
    pub fn interpolate(&self, target: &Self, alpha: f32) -> Option<Self> {
        let value = match (self, target) {
            (Self::Boolean(a), Self::Boolean(b)) => Self::Boolean(if alpha >= 1.0 { *b } else { *a }),
            (Self::Float(a), Self::Float(b)) => Self::Float(a + (b - a) * alpha),
            (Self::Integer(a), Self::Integer(b)) => {
                Self::Integer((*a as f32 + (*b - *a) as f32 * alpha + 0.5).floor() as i32)
            }
            (Self::Vector2(a), Self::Vector2(b)) => Self::Vector2(a + (b - a) * alpha),
            (Self::Vector3(a), Self::Vector3(b)) => Self::Vector3(a + (b - a) * alpha),
            (Self::Vector4(a), Self::Vector4(b)) => Self::Vector4(a + (b - a) * alpha),
            (Self::Rotation(a), Self::Rotation(b)) => Self::Rotation(slerp(a, b, alpha)),
            (Self::Matrix(a), Self::Matrix(b)) => Self::Matrix(if alpha > 0.5 { *b } else { *a }),
            _ => return None,
        };
        Some(value)
    }

    /// Offset by `relative * alpha`
    ///
    /// Rotations are composed with a partial rotation. Booleans are or-ed in
    /// once `alpha` reaches 1.
    pub fn offset(&self, relative: &Self, alpha: f32) -> Option<Self> {
        let value = match (self, relative) {
            (Self::Boolean(a), Self::Boolean(b)) => Self::Boolean(if alpha >= 1.0 { *a || *b } else { *a }),
            (Self::Float(a), Self::Float(b)) => Self::Float(a + b * alpha),
            (Self::Integer(a), Self::Integer(b)) => {
                Self::Integer((*a as f32 + *b as f32 * alpha + 0.5).floor() as i32)
            }
            (Self::Vector2(a), Self::Vector2(b)) => Self::Vector2(a + b * alpha),
            (Self::Vector3(a), Self::Vector3(b)) => Self::Vector3(a + b * alpha),
            (Self::Vector4(a), Self::Vector4(b)) => Self::Vector4(a + b * alpha),
            (Self::Rotation(a), Self::Rotation(b)) => Self::Rotation(a * slerp(&Quat::identity(), b, alpha)),
            _ => return None,
        };
        Some(value)
    }
}

/// Spherical interpolation that tolerates antiparallel inputs
pub(crate) fn slerp(from: &Quat, to: &Quat, alpha: f32) -> Quat {
    from.try_slerp(to, alpha, 1.0e-6).unwrap_or_else(|| from.nlerp(to, alpha))
}

/// Rust types that can live in a property
pub trait PropertyValueType: Copy + Send + Sync + std::fmt::Debug + 'static {
    /// Matching type tag
    const TYPE: PropertyType;

    /// Wrap into a [`PropertyValue`]
    fn into_value(self) -> PropertyValue;

    /// Unwrap from a [`PropertyValue`] of the same type
    fn from_value(value: &PropertyValue) -> Option<Self>;
}

macro_rules! impl_value_type {
    ($ty:ty, $variant:ident) => {
        impl PropertyValueType for $ty {
            const TYPE: PropertyType = PropertyType::$variant;

            fn into_value(self) -> PropertyValue {
                PropertyValue::$variant(self)
            }

            fn from_value(value: &PropertyValue) -> Option<Self> {
                match value {
                    PropertyValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for PropertyValue {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        }
    };
}

impl_value_type!(bool, Boolean);
impl_value_type!(f32, Float);
impl_value_type!(i32, Integer);
impl_value_type!(Vec2, Vector2);
impl_value_type!(Vec3, Vector3);
impl_value_type!(Vec4, Vector4);
impl_value_type!(Quat, Rotation);
impl_value_type!(Mat4, Matrix);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interpolate_numbers() {
        let v = PropertyValue::Float(0.0).interpolate(&PropertyValue::Float(10.0), 0.25).unwrap();
        assert_relative_eq!(v.get::<f32>().unwrap(), 2.5);

        let v = PropertyValue::Integer(0).interpolate(&PropertyValue::Integer(3), 0.5).unwrap();
        assert_eq!(v, PropertyValue::Integer(2));
    }

    #[test]
    fn test_interpolate_bool_steps_at_end() {
        let from = PropertyValue::Boolean(false);
        let to = PropertyValue::Boolean(true);
        assert_eq!(from.interpolate(&to, 0.99), Some(from));
        assert_eq!(from.interpolate(&to, 1.0), Some(to));
    }

    #[test]
    fn test_interpolate_type_mismatch() {
        assert!(PropertyValue::Float(0.0).interpolate(&PropertyValue::Integer(1), 0.5).is_none());
        assert!(PropertyValue::Matrix(Mat4::identity()).offset(&PropertyValue::Matrix(Mat4::identity()), 0.5).is_none());
    }

    #[test]
    fn test_rotation_offset_half_way() {
        let quarter = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        let v = PropertyValue::Rotation(Quat::identity())
            .offset(&PropertyValue::Rotation(quarter), 0.5)
            .unwrap();
        let q = v.get::<Quat>().unwrap();
        assert_relative_eq!(q.angle(), std::f32::consts::FRAC_PI_4, epsilon = 1e-5);
    }

    #[test]
    fn test_typed_round_trip() {
        let value: PropertyValue = Vec3::new(1.0, 2.0, 3.0).into();
        assert_eq!(value.property_type(), PropertyType::Vector3);
        assert!(value.get::<Vec2>().is_none());
    }
}
