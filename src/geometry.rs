//! Geometry utilities for orienting content along curves.

use bevy::math::{Mat3, Quat, Vec3};

/// A local orthonormal frame built from a view (forward) direction and an up hint.
///
/// Local axes map as: X → `right`, Y → `up`, Z → `forward`. This is the
/// "look rotation" convention used by curve samples: a rotation built from
/// the frame turns local +Z onto the curve tangent.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateFrame {
    /// The forward direction (local +Z).
    pub forward: Vec3,
    /// The right direction (local +X), `up_hint × forward`.
    pub right: Vec3,
    /// The corrected up direction (local +Y), perpendicular to forward and right.
    pub up: Vec3,
}

impl CoordinateFrame {
    /// Build a frame looking along `view` with `up_hint` as the preferred up.
    ///
    /// The frame is degenerate (see [`CoordinateFrame::is_valid`]) when `view`
    /// is zero or parallel to `up_hint`.
    pub fn from_view_up(view: Vec3, up_hint: Vec3) -> Self {
        let forward = view.normalize_or_zero();
        let right = up_hint.cross(forward).normalize_or_zero();
        let up = forward.cross(right);
        Self { forward, right, up }
    }

    /// Check if this frame is valid (non-degenerate).
    pub fn is_valid(&self) -> bool {
        self.forward.length_squared() > 1e-6 && self.right.length_squared() > 1e-6
    }

    /// Convert to a rotation quaternion, identity for a degenerate frame.
    pub fn to_rotation(&self) -> Quat {
        if !self.is_valid() {
            return Quat::IDENTITY;
        }
        Quat::from_mat3(&Mat3::from_cols(self.right, self.up, self.forward))
    }

    /// Transform a local point to world space relative to an origin.
    pub fn transform_point(&self, origin: Vec3, local: Vec3) -> Vec3 {
        origin + self.right * local.x + self.up * local.y + self.forward * local.z
    }
}

/// Rotation turning local +Z onto `view` and local +Y towards `up_hint`.
pub fn look_rotation(view: Vec3, up_hint: Vec3) -> Quat {
    CoordinateFrame::from_view_up(view, up_hint).to_rotation()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_view_up_basic() {
        let frame = CoordinateFrame::from_view_up(Vec3::Z, Vec3::Y);
        assert!(frame.is_valid());
        assert!(frame.forward.abs_diff_eq(Vec3::Z, 1e-6));
        assert!(frame.up.abs_diff_eq(Vec3::Y, 1e-6));
        assert!(frame.right.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_degenerate_is_identity() {
        let frame = CoordinateFrame::from_view_up(Vec3::Y, Vec3::Y);
        assert!(!frame.is_valid());
        assert_eq!(frame.to_rotation(), Quat::IDENTITY);
    }

    #[test]
    fn test_look_rotation_maps_forward() {
        let view = Vec3::new(1.0, 0.0, 1.0).normalize();
        let rotation = look_rotation(view, Vec3::Y);
        assert!((rotation * Vec3::Z).abs_diff_eq(view, 1e-5));
        assert!((rotation * Vec3::Y).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_transform_point() {
        let frame = CoordinateFrame::from_view_up(Vec3::X, Vec3::Y);
        let origin = Vec3::new(10.0, 0.0, 0.0);
        let world = frame.transform_point(origin, Vec3::new(1.0, 2.0, 3.0));
        let expected = origin + frame.right + frame.up * 2.0 + frame.forward * 3.0;
        assert!(world.abs_diff_eq(expected, 1e-6));
    }
}
