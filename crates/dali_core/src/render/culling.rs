//! Clip-space culling of renderable bounds.
//!
//! Both tests are conservative: they only report a box as outside when
//! every corner lies beyond one of the four side planes. A box that
//! crosses clip space without a corner inside is kept.

use crate::foundation::math::{BoundingBox, Mat4, Rect, Vec3, Vec4};

fn inside_clip_space(p: &Vec4) -> bool {
    -p.w <= p.x && p.x <= p.w && -p.w <= p.y && p.y <= p.w && -p.w <= p.z && p.z <= p.w
}

fn is_outside(mvp: &Mat4, corners: &[Vec3]) -> bool {
    let origin = mvp.column(3).into_owned();
    if inside_clip_space(&origin) {
        return false;
    }

    let clip: Vec<Vec4> = corners.iter().map(|c| mvp * Vec4::new(c.x, c.y, c.z, 1.0)).collect();
    if clip.iter().any(inside_clip_space) {
        return false;
    }

    let planes: [fn(&Vec4) -> bool; 4] = [
        |p| -p.w <= p.x,
        |p| p.x <= p.w,
        |p| -p.w <= p.y,
        |p| p.y <= p.w,
    ];
    planes.iter().any(|inside| !clip.iter().any(inside))
}

/// True if the flat rectangle is entirely outside clip space
pub fn is_2d_box_outside_clip_space(mvp: &Mat4, bounds: &Rect<f32>) -> bool {
    is_outside(mvp, &bounds.corners())
}

/// True if the box is entirely outside clip space
pub fn is_3d_box_outside_clip_space(mvp: &Mat4, bounds: &BoundingBox) -> bool {
    is_outside(mvp, &bounds.corners())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_rect() -> Rect<f32> {
        Rect::new(-0.5, -0.5, 1.0, 1.0)
    }

    #[test]
    fn test_centre_inside_is_kept() {
        assert!(!is_2d_box_outside_clip_space(&Mat4::identity(), &unit_rect()));
    }

    #[test]
    fn test_corner_inside_is_kept() {
        let mvp = Mat4::new_translation(&Vec3::new(1.3, 0.0, 0.0));
        assert!(!is_2d_box_outside_clip_space(&mvp, &unit_rect()));
    }

    #[test]
    fn test_left_of_clip_space_is_culled() {
        let mvp = Mat4::new_translation(&Vec3::new(-3.0, 0.0, 0.0));
        assert!(is_2d_box_outside_clip_space(&mvp, &unit_rect()));
        let cube = BoundingBox::centered(Vec3::new(1.0, 1.0, 1.0));
        assert!(is_3d_box_outside_clip_space(&mvp, &cube));
    }

    #[test]
    fn test_above_clip_space_is_culled() {
        let mvp = Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0));
        assert!(is_2d_box_outside_clip_space(&mvp, &unit_rect()));
    }

    #[test]
    fn test_straddling_box_is_kept() {
        // Corners sit outside diagonally but the box covers clip space.
        let mvp = Mat4::new_translation(&Vec3::new(0.0, 0.0, 3.0)) * Mat4::new_scaling(10.0);
        let cube = BoundingBox::centered(Vec3::new(1.0, 1.0, 0.0));
        assert!(!is_3d_box_outside_clip_space(&mvp, &cube));
    }

    #[test]
    fn test_every_corner_inside_is_kept() {
        let mvp = Mat4::new_translation(&Vec3::new(0.0, 0.0, 5.0)) * Mat4::new_scaling(0.5);
        let cube = BoundingBox::centered(Vec3::new(1.0, 1.0, 1.0));
        assert!(!is_3d_box_outside_clip_space(&mvp, &cube));
    }
}
