//! Camera attachment: view and projection matrices per buffer.

use nalgebra::{Isometry3, Translation3};

use crate::common::BufferIndex;
use crate::foundation::math::{Mat4, Quat, Vec3};
use crate::property::DoubleBufferedProperty;

/// Frames a recomputed matrix must be written for, one per buffer
const UPDATE_COUNT: u8 = 2;

/// Projection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Perspective frustum from field of view and aspect ratio
    Perspective,
    /// Orthographic box from the clipping planes
    Orthographic,
}

/// Camera settings and derived matrices
///
/// The view matrix is the inverse of the owning node's world translation
/// and rotation; scale is ignored. Matrices are rewritten in both buffers
/// after a change, then left alone until the next change.
#[derive(Debug, Clone)]
pub struct CameraAttachment {
    projection_mode: ProjectionMode,
    field_of_view: f32,
    aspect_ratio: f32,
    near_clipping_plane: f32,
    far_clipping_plane: f32,
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    invert_y_axis: bool,
    view: DoubleBufferedProperty<Mat4>,
    projection: DoubleBufferedProperty<Mat4>,
    inverse_view_projection: DoubleBufferedProperty<Mat4>,
    view_updates: u8,
    projection_updates: u8,
}

impl CameraAttachment {
    /// Perspective camera
    pub fn perspective(field_of_view: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            projection_mode: ProjectionMode::Perspective,
            field_of_view,
            aspect_ratio,
            near_clipping_plane: near,
            far_clipping_plane: far,
            left: -1.0,
            right: 1.0,
            top: 1.0,
            bottom: -1.0,
            invert_y_axis: false,
            view: DoubleBufferedProperty::new(Mat4::identity()),
            projection: DoubleBufferedProperty::new(Mat4::identity()),
            inverse_view_projection: DoubleBufferedProperty::new(Mat4::identity()),
            view_updates: UPDATE_COUNT,
            projection_updates: UPDATE_COUNT,
        }
    }

    /// Orthographic camera
    pub fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        let mut camera = Self::perspective(std::f32::consts::FRAC_PI_4, 1.0, near, far);
        camera.projection_mode = ProjectionMode::Orthographic;
        camera.left = left;
        camera.right = right;
        camera.top = top;
        camera.bottom = bottom;
        camera
    }

    /// Perspective camera whose frustum exactly covers a `width` x `height`
    /// plane at the origin when the camera sits at `distance_for(height)`
    pub fn for_stage(width: f32, height: f32) -> Self {
        let fov = std::f32::consts::FRAC_PI_4;
        let distance = Self::distance_for(height, fov);
        Self::perspective(fov, width / height, distance * 0.1, distance * 10.0)
    }

    /// Distance at which a plane of `height` fills a field of view
    pub fn distance_for(height: f32, field_of_view: f32) -> f32 {
        (height * 0.5) / (field_of_view * 0.5).tan()
    }

    fn projection_changed(&mut self) {
        self.projection_updates = UPDATE_COUNT;
    }

    /// Projection mode
    pub const fn projection_mode(&self) -> ProjectionMode {
        self.projection_mode
    }

    /// Switch projection mode
    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        self.projection_mode = mode;
        self.projection_changed();
    }

    /// Vertical field of view in radians
    pub const fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Set the vertical field of view
    pub fn set_field_of_view(&mut self, field_of_view: f32) {
        self.field_of_view = field_of_view;
        self.projection_changed();
    }

    /// Width over height
    pub const fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Set the aspect ratio
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.projection_changed();
    }

    /// Set near and far planes
    pub fn set_clipping_planes(&mut self, near: f32, far: f32) {
        self.near_clipping_plane = near;
        self.far_clipping_plane = far;
        self.projection_changed();
    }

    /// Flip the y axis, for y-down UI coordinates
    pub fn set_invert_y_axis(&mut self, invert: bool) {
        self.invert_y_axis = invert;
        self.projection_changed();
    }

    /// Force the view matrix to be rebuilt from the node
    pub fn mark_view_dirty(&mut self) {
        self.view_updates = UPDATE_COUNT;
    }

    fn compute_projection(&self) -> Mat4 {
        let projection = match self.projection_mode {
            ProjectionMode::Perspective => Mat4::new_perspective(
                self.aspect_ratio,
                self.field_of_view,
                self.near_clipping_plane,
                self.far_clipping_plane,
            ),
            ProjectionMode::Orthographic => Mat4::new_orthographic(
                self.left,
                self.right,
                self.bottom,
                self.top,
                self.near_clipping_plane,
                self.far_clipping_plane,
            ),
        };
        if self.invert_y_axis {
            Mat4::new_nonuniform_scaling(&Vec3::new(1.0, -1.0, 1.0)) * projection
        } else {
            projection
        }
    }

    /// Recompute matrices for `buffer` from the node's world transform
    pub fn update(&mut self, buffer: BufferIndex, world_position: &Vec3, world_orientation: &Quat, transform_changed: bool) {
        if transform_changed {
            self.view_updates = UPDATE_COUNT;
        }

        let mut changed = false;
        if self.view_updates > 0 {
            let camera = Isometry3::from_parts(Translation3::from(*world_position), *world_orientation);
            self.view.set(buffer, camera.inverse().to_homogeneous());
            self.view_updates -= 1;
            changed = true;
        }
        if self.projection_updates > 0 {
            self.projection.set(buffer, self.compute_projection());
            self.projection_updates -= 1;
            changed = true;
        }

        if changed {
            let view_projection = self.projection.get(buffer) * self.view.get(buffer);
            let inverse = view_projection.try_inverse().unwrap_or_else(Mat4::identity);
            self.inverse_view_projection.set(buffer, inverse);
        } else {
            self.view.mark_clean(buffer);
            self.projection.mark_clean(buffer);
            self.inverse_view_projection.mark_clean(buffer);
        }
    }

    /// View matrix in `buffer`
    pub fn view_matrix(&self, buffer: BufferIndex) -> Mat4 {
        self.view.get(buffer)
    }

    /// Projection matrix in `buffer`
    pub fn projection_matrix(&self, buffer: BufferIndex) -> Mat4 {
        self.projection.get(buffer)
    }

    /// Inverse of projection * view in `buffer`
    pub fn inverse_view_projection_matrix(&self, buffer: BufferIndex) -> Mat4 {
        self.inverse_view_projection.get(buffer)
    }

    /// True if the view matrix of `buffer` was rewritten by the last update
    pub fn view_matrix_updated(&self, buffer: BufferIndex) -> bool {
        self.view.is_dirty(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_is_inverse_of_camera_transform() {
        let mut camera = CameraAttachment::perspective(1.0, 1.0, 1.0, 100.0);
        camera.update(BufferIndex::ZERO, &Vec3::new(0.0, 0.0, 10.0), &Quat::identity(), true);
        let view = camera.view_matrix(BufferIndex::ZERO);
        let origin = view.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(origin.z, -10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_matrices_written_to_both_buffers_then_stable() {
        let mut camera = CameraAttachment::for_stage(480.0, 800.0);
        let position = Vec3::new(0.0, 0.0, 50.0);
        camera.update(BufferIndex::ZERO, &position, &Quat::identity(), true);
        camera.update(BufferIndex::ONE, &position, &Quat::identity(), false);
        assert_eq!(camera.view_matrix(BufferIndex::ZERO), camera.view_matrix(BufferIndex::ONE));
        assert_eq!(camera.projection_matrix(BufferIndex::ZERO), camera.projection_matrix(BufferIndex::ONE));

        camera.update(BufferIndex::ZERO, &position, &Quat::identity(), false);
        assert!(!camera.view_matrix_updated(BufferIndex::ZERO));
    }

    #[test]
    fn test_stage_camera_fills_viewport() {
        let height = 800.0;
        let mut camera = CameraAttachment::for_stage(480.0, height);
        let distance = CameraAttachment::distance_for(height, camera.field_of_view());
        camera.update(BufferIndex::ZERO, &Vec3::new(0.0, 0.0, distance), &Quat::identity(), true);

        let mvp = camera.projection_matrix(BufferIndex::ZERO) * camera.view_matrix(BufferIndex::ZERO);
        let top = mvp * nalgebra::Vector4::new(0.0, height * 0.5, 0.0, 1.0);
        assert_relative_eq!(top.y / top.w, 1.0, epsilon = 1e-4);
    }
}
