//! Transform and projection helpers.
//!
//! All rotations are given in degrees. Matrices are column-major [`glam`]
//! types and are uploaded to GL without transposition.

use glam::{Mat4, Vec2, Vec3};

/// Build a model matrix.
///
/// The result applies, in order: `base`, a translation by `offset` (the
/// pivot), `scale`, rotation about Z, then Y, then X, and finally the
/// translation. In matrix form: `T · Rx · Ry · Rz · S · T(offset) · base`.
#[must_use]
pub fn model_matrix(
    translation: Vec3,
    rotation_deg: Vec3,
    scale: Vec3,
    offset: Vec3,
    base: Mat4,
) -> Mat4 {
    Mat4::from_translation(translation)
        * Mat4::from_rotation_x(rotation_deg.x.to_radians())
        * Mat4::from_rotation_y(rotation_deg.y.to_radians())
        * Mat4::from_rotation_z(rotation_deg.z.to_radians())
        * Mat4::from_scale(scale)
        * Mat4::from_translation(offset)
        * base
}

/// 2D variant of [`model_matrix`]: rotation about Z, z-scale of 1.
#[must_use]
pub fn model_matrix_2d(position: Vec2, rotation_deg: f32, scale: Vec2, offset: Vec2) -> Mat4 {
    model_matrix(
        position.extend(0.0),
        Vec3::new(0.0, 0.0, rotation_deg),
        scale.extend(1.0),
        offset.extend(0.0),
        Mat4::IDENTITY,
    )
}

/// Right-handed perspective projection with GL's `[-1, 1]` clip depth.
#[must_use]
pub fn perspective(aspect: f32, fov_deg: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_deg.to_radians(), aspect, near, far)
}

/// Right-handed orthographic projection with GL's `[-1, 1]` clip depth.
#[must_use]
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(left, right, bottom, top, near, far)
}

/// Pixel-space orthographic projection for the 2D pass.
///
/// `center_x` and `center_y` place the camera origin as a fraction of the
/// viewport: `(0.5, 0.5)` puts the origin in the middle of the screen,
/// `(0.0, 0.0)` in the bottom-left corner.
#[must_use]
pub fn projection_2d(
    width: f32,
    height: f32,
    center_x: f32,
    center_y: f32,
    near: f32,
    far: f32,
) -> Mat4 {
    ortho(
        -width * center_x,
        width * (1.0 - center_x),
        -height * center_y,
        height * (1.0 - center_y),
        near,
        far,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_vec3_near(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-4),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn offset_is_applied_before_scale_and_translation() {
        let m = model_matrix(
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::splat(2.0),
            Vec3::new(1.0, 0.0, 0.0),
            Mat4::IDENTITY,
        );
        assert_vec3_near(m.transform_point3(Vec3::ZERO), Vec3::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn rotation_z_applies_before_x() {
        // Z by 90 sends +X to +Y, then X by 90 sends +Y to +Z.
        let m = model_matrix(
            Vec3::ZERO,
            Vec3::new(90.0, 0.0, 90.0),
            Vec3::ONE,
            Vec3::ZERO,
            Mat4::IDENTITY,
        );
        assert_vec3_near(m.transform_point3(Vec3::X), Vec3::Z);
    }

    #[test]
    fn base_transform_is_applied_first() {
        let base = Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0));
        let m = model_matrix(Vec3::ZERO, Vec3::ZERO, Vec3::splat(2.0), Vec3::ZERO, base);
        assert_vec3_near(m.transform_point3(Vec3::ZERO), Vec3::new(0.0, 6.0, 0.0));
    }

    #[test]
    fn model_matrix_2d_rotates_about_z() {
        let m = model_matrix_2d(Vec2::new(10.0, 0.0), 90.0, Vec2::ONE, Vec2::ZERO);
        assert_vec3_near(m.transform_point3(Vec3::X), Vec3::new(10.0, 1.0, 0.0));
    }

    #[test]
    fn model_matrix_2d_keeps_depth() {
        let m = model_matrix_2d(Vec2::ZERO, 0.0, Vec2::new(4.0, 4.0), Vec2::ZERO);
        assert_vec3_near(
            m.transform_point3(Vec3::new(0.0, 0.0, 1.0)),
            Vec3::new(0.0, 0.0, 1.0),
        );
    }

    #[test]
    fn centered_projection_maps_viewport_edges_to_ndc() {
        let p = projection_2d(1920.0, 1080.0, 0.5, 0.5, 0.0, 10.0);
        assert_vec3_near(
            p.project_point3(Vec3::new(960.0, 540.0, -1.0)).truncate().extend(0.0),
            Vec3::new(1.0, 1.0, 0.0),
        );
        assert_vec3_near(
            p.project_point3(Vec3::new(-960.0, -540.0, -1.0)).truncate().extend(0.0),
            Vec3::new(-1.0, -1.0, 0.0),
        );
    }

    #[test]
    fn corner_projection_puts_origin_bottom_left() {
        let p = projection_2d(800.0, 600.0, 0.0, 0.0, 0.0, 10.0);
        let origin = p.project_point3(Vec3::new(0.0, 0.0, -1.0));
        assert!((origin.x + 1.0).abs() < 1e-5 && (origin.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn perspective_keeps_center_on_axis() {
        let p = perspective(16.0 / 9.0, 60.0, 0.1, 500.0);
        let ndc = p.project_point3(Vec3::new(0.0, 0.0, -10.0));
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    proptest! {
        #[test]
        fn translation_only_moves_points_by_translation(
            tx in -100.0f32..100.0, ty in -100.0f32..100.0, tz in -100.0f32..100.0,
            px in -10.0f32..10.0, py in -10.0f32..10.0, pz in -10.0f32..10.0,
        ) {
            let t = Vec3::new(tx, ty, tz);
            let p = Vec3::new(px, py, pz);
            let m = model_matrix(t, Vec3::ZERO, Vec3::ONE, Vec3::ZERO, Mat4::IDENTITY);
            prop_assert!(m.transform_point3(p).abs_diff_eq(p + t, 1e-3));
        }

        #[test]
        fn full_turn_is_identity(turns in -3i32..3) {
            #[allow(clippy::cast_precision_loss)]
            let deg = 360.0 * turns as f32;
            let m = model_matrix_2d(Vec2::ZERO, deg, Vec2::ONE, Vec2::ZERO);
            prop_assert!(m.transform_point3(Vec3::X).abs_diff_eq(Vec3::X, 1e-3));
        }
    }
}
