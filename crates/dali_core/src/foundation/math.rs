//! Math utilities and types
//!
//! Provides the math types used by the scene graph, plus the small geometric
//! helpers needed by culling and clipping.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

use serde::{Serialize, Deserialize};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect<T> {
    /// Left edge
    pub x: T,
    /// Top edge
    pub y: T,
    /// Width
    pub width: T,
    /// Height
    pub height: T,
}

impl<T> Rect<T> {
    /// Create a new rectangle
    pub const fn new(x: T, y: T, width: T, height: T) -> Self {
        Self { x, y, width, height }
    }
}

impl Rect<f32> {
    /// Rectangle centred on the origin, the shape of an actor of `size`
    pub fn centered(size: Vec2) -> Self {
        Self::new(-size.x * 0.5, -size.y * 0.5, size.x, size.y)
    }

    /// The four corners in local space (z = 0)
    pub fn corners(&self) -> [Vec3; 4] {
        let (left, top) = (self.x, self.y);
        let (right, bottom) = (self.x + self.width, self.y + self.height);
        [
            Vec3::new(left, top, 0.0),
            Vec3::new(right, top, 0.0),
            Vec3::new(left, bottom, 0.0),
            Vec3::new(right, bottom, 0.0),
        ]
    }
}

impl Rect<i32> {
    /// True if the rectangle covers no pixels
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Scissor rectangle in window coordinates
pub type ClippingBox = Rect<i32>;

/// Viewport in window coordinates
pub type Viewport = Rect<i32>;

/// Axis-aligned 3D bounding box in the local space of a renderable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a new bounding box
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centred on the origin with the given extents
    pub fn centered(size: Vec3) -> Self {
        let half = size * 0.5;
        Self::new(-half, half)
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Machine epsilon scaled for values around 1
    pub const MACHINE_EPSILON_1: f32 = f32::EPSILON;

    /// Machine epsilon scaled for values around 1000
    pub const MACHINE_EPSILON_1000: f32 = f32::EPSILON * 1000.0;

    /// Alpha at or below which a node counts as invisible
    pub const FULLY_TRANSPARENT: f32 = 0.01;

    /// Largest sane node dimension, 2^30
    pub const MAX_NODE_SIZE: f32 = 1_073_741_824.0;
}

/// Math utility functions
pub mod utils {
    use super::*;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Translation * rotation * scale
    pub fn compose(position: &Vec3, orientation: &Quat, scale: &Vec3) -> Mat4 {
        Mat4::new_translation(position)
            * orientation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(scale)
    }

    /// Translation component of an affine matrix
    pub fn translation(matrix: &Mat4) -> Vec3 {
        Vec3::new(matrix.m14, matrix.m24, matrix.m34)
    }

    /// Floating point modulo that keeps the sign of the divisor
    pub fn wrap(value: f32, modulus: f32) -> f32 {
        if modulus <= 0.0 {
            return 0.0;
        }
        let r = value % modulus;
        if r < 0.0 { r + modulus } else { r }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_matches_manual_transform() {
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), constants::PI * 0.5);
        let m = utils::compose(&Vec3::new(10.0, 0.0, 0.0), &rotation, &Vec3::new(2.0, 2.0, 2.0));
        let p = m.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(utils::translation(&m).x, 10.0);
    }

    #[test]
    fn test_wrap_keeps_result_in_range() {
        assert_relative_eq!(utils::wrap(2.5, 1.0), 0.5);
        assert_relative_eq!(utils::wrap(-0.25, 1.0), 0.75);
        assert_relative_eq!(utils::wrap(1.0, 0.0), 0.0);
    }

    #[test]
    fn test_rect_corners() {
        let rect = Rect::centered(Vec2::new(4.0, 2.0));
        let corners = rect.corners();
        assert_relative_eq!(corners[0].x, -2.0);
        assert_relative_eq!(corners[3].y, 1.0);
        assert!(ClippingBox::new(0, 0, 0, 10).is_empty());
    }
}
