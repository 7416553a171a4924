use std::f32::consts::FRAC_PI_2;
use std::sync::OnceLock;

use bevy::prelude::*;

use crate::geometry::look_rotation;
use crate::mesh::MeshVertex;

/// Dot product above which the tangent is considered parallel to up.
const PARALLEL_THRESHOLD: f32 = 0.01;

/// Offset added to the tangent's X when it is parallel to up.
const TANGENT_NUDGE: f32 = 0.01;

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// An evaluated point on a curve: location, orientation, scale and roll,
/// plus where it sits on the curve in time and distance.
///
/// Samples are reusable: [`CurveSample::set`] overwrites every field and
/// drops the cached rotations, so a pooled instance never leaks derived
/// state from a previous use.
#[derive(Debug, Clone, Default)]
pub struct CurveSample {
    location: Vec3,
    tangent: Vec3,
    up: Vec3,
    scale: Vec2,
    roll: f32,
    distance_in_curve: f32,
    time_in_curve: f32,

    transformed_up: OnceLock<Vec3>,
    rotation: OnceLock<Quat>,
    bent_rotation: OnceLock<Quat>,
}

impl PartialEq for CurveSample {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
            && self.tangent == other.tangent
            && self.up == other.up
            && self.scale == other.scale
            && self.roll == other.roll
            && self.distance_in_curve == other.distance_in_curve
            && self.time_in_curve == other.time_in_curve
    }
}

impl CurveSample {
    /// Create a sample. The tangent is stored as given and must be unit length.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location: Vec3,
        tangent: Vec3,
        up: Vec3,
        scale: Vec2,
        roll: f32,
        distance_in_curve: f32,
        time_in_curve: f32,
    ) -> Self {
        let mut sample = Self::default();
        sample.set(
            location,
            tangent,
            up,
            scale,
            roll,
            distance_in_curve,
            time_in_curve,
        );
        sample
    }

    /// Overwrite every field and invalidate the cached rotations.
    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &mut self,
        location: Vec3,
        tangent: Vec3,
        up: Vec3,
        scale: Vec2,
        roll: f32,
        distance_in_curve: f32,
        time_in_curve: f32,
    ) -> &mut Self {
        self.location = location;
        self.tangent = tangent;
        self.up = up;
        self.scale = scale;
        self.roll = roll;
        self.distance_in_curve = distance_in_curve;
        self.time_in_curve = time_in_curve;

        self.transformed_up = OnceLock::new();
        self.rotation = OnceLock::new();
        self.bent_rotation = OnceLock::new();
        self
    }

    /// Copy the data of `other` into this sample.
    pub fn set_from(&mut self, other: &CurveSample) -> &mut Self {
        self.set(
            other.location,
            other.tangent,
            other.up,
            other.scale,
            other.roll,
            other.distance_in_curve,
            other.time_in_curve,
        )
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    /// Unit tangent.
    pub fn tangent(&self) -> Vec3 {
        self.tangent
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Roll in degrees.
    pub fn roll(&self) -> f32 {
        self.roll
    }

    /// Arclength from the start of the curve.
    pub fn distance_in_curve(&self) -> f32 {
        self.distance_in_curve
    }

    /// Bézier time in `[0, 1]`.
    pub fn time_in_curve(&self) -> f32 {
        self.time_in_curve
    }

    /// Up vector rolled about the tangent, made perpendicular to the tangent.
    pub fn transformed_up(&self) -> Vec3 {
        *self.transformed_up.get_or_init(|| {
            let roll = Quat::from_axis_angle(self.tangent, self.roll.to_radians());
            let up = roll * self.up;
            let side = up.cross(self.tangent).normalize_or_zero();
            self.tangent.cross(side)
        })
    }

    /// Look rotation from the tangent and the transformed up.
    ///
    /// Mixing a non-zero roll with a custom up vector is not advised.
    pub fn rotation(&self) -> Quat {
        *self
            .rotation
            .get_or_init(|| look_rotation(self.tangent, self.transformed_up()))
    }

    /// Rotation applied to bent vertices: local +X follows the tangent.
    pub fn bent_rotation(&self) -> Quat {
        *self.bent_rotation.get_or_init(|| {
            let mut tangent = self.tangent;
            if (tangent.dot(self.up) - 1.0).abs() < PARALLEL_THRESHOLD {
                tangent.x += TANGENT_NUDGE;
                tangent = tangent.normalize();
            }

            let side = tangent.cross(self.up).normalize_or_zero();
            let up = side.cross(tangent);

            look_rotation(tangent, up) * Quat::from_rotation_y(-FRAC_PI_2)
        })
    }

    /// Linear interpolation between two samples; the tangent is renormalized.
    pub fn lerp(a: &CurveSample, b: &CurveSample, t: f32) -> CurveSample {
        let mut out = CurveSample::default();
        Self::lerp_into(a, b, t, &mut out);
        out
    }

    /// [`CurveSample::lerp`] writing into an existing (e.g. pooled) sample.
    pub fn lerp_into(a: &CurveSample, b: &CurveSample, t: f32, out: &mut CurveSample) {
        out.set(
            a.location.lerp(b.location, t),
            a.tangent.lerp(b.tangent, t).normalize_or_zero(),
            a.up.lerp(b.up, t),
            a.scale.lerp(b.scale, t),
            lerp(a.roll, b.roll, t),
            lerp(a.distance_in_curve, b.distance_in_curve, t),
            lerp(a.time_in_curve, b.time_in_curve, t),
        );
    }

    /// Bend a vertex expressed in the source mesh's unrolled space.
    ///
    /// The vertex's X is the distance along the curve and is consumed by the
    /// caller when choosing this sample; only its Y/Z cross-section is kept,
    /// scaled, rolled, then placed in this sample's frame.
    pub fn bend(&self, vertex: &MeshVertex) -> MeshVertex {
        let mut out = *vertex;
        self.bend_in_place(&mut out);
        out
    }

    /// [`CurveSample::bend`] writing into `out`.
    pub fn bend_into(&self, vertex: &MeshVertex, out: &mut MeshVertex) {
        *out = *vertex;
        self.bend_in_place(out);
    }

    fn bend_in_place(&self, vertex: &mut MeshVertex) {
        vertex.position *= Vec3::new(0.0, self.scale.y, self.scale.x);

        let roll = Quat::from_rotation_x(self.roll.to_radians());
        vertex.position = roll * vertex.position;
        vertex.normal = roll * vertex.normal;
        let tangent = roll * vertex.tangent.truncate();

        vertex.position.x = 0.0;

        let rotation = self.bent_rotation();
        vertex.position = rotation * vertex.position + self.location;
        vertex.normal = rotation * vertex.normal;
        vertex.tangent = (rotation * tangent).extend(vertex.tangent.w);
    }

    /// Approximate equality of every data field.
    pub fn abs_diff_eq(&self, other: &CurveSample, max_abs_diff: f32) -> bool {
        self.location.abs_diff_eq(other.location, max_abs_diff)
            && self.tangent.abs_diff_eq(other.tangent, max_abs_diff)
            && self.up.abs_diff_eq(other.up, max_abs_diff)
            && self.scale.abs_diff_eq(other.scale, max_abs_diff)
            && (self.roll - other.roll).abs() <= max_abs_diff
            && (self.distance_in_curve - other.distance_in_curve).abs() <= max_abs_diff
            && (self.time_in_curve - other.time_in_curve).abs() <= max_abs_diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_a() -> CurveSample {
        CurveSample::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::X,
            Vec3::Y,
            Vec2::ONE,
            0.0,
            0.0,
            0.0,
        )
    }

    fn sample_b() -> CurveSample {
        CurveSample::new(
            Vec3::new(5.0, 2.0, 3.0),
            Vec3::Z,
            Vec3::Y,
            Vec2::new(2.0, 3.0),
            90.0,
            4.0,
            1.0,
        )
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = sample_a();
        let b = sample_b();
        assert!(CurveSample::lerp(&a, &b, 0.0).abs_diff_eq(&a, 1e-6));
        assert!(CurveSample::lerp(&a, &b, 1.0).abs_diff_eq(&b, 1e-6));
        for t in [0.0, 0.3, 0.77, 1.0] {
            assert!(CurveSample::lerp(&a, &a, t).abs_diff_eq(&a, 1e-6));
        }
    }

    #[test]
    fn test_lerp_tangent_is_unit() {
        let a = sample_a();
        let b = sample_b();
        for i in 0..=10 {
            let s = CurveSample::lerp(&a, &b, i as f32 / 10.0);
            assert_relative_eq!(s.tangent().length(), 1.0, epsilon = 1e-5);
        }
        let mid = CurveSample::lerp(&a, &b, 0.5);
        assert_relative_eq!(mid.distance_in_curve(), 2.0);
        assert_relative_eq!(mid.roll(), 45.0);
    }

    #[test]
    fn test_set_invalidates_cache() {
        let mut sample = sample_a();
        let before = sample.rotation();
        assert!((before * Vec3::Z).abs_diff_eq(Vec3::X, 1e-5));

        sample.set(Vec3::ZERO, Vec3::Z, Vec3::Y, Vec2::ONE, 0.0, 0.0, 0.0);
        assert!((sample.rotation() * Vec3::Z).abs_diff_eq(Vec3::Z, 1e-5));
        assert!((sample.bent_rotation() * Vec3::X).abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn test_transformed_up_with_roll() {
        let sample = CurveSample::new(Vec3::ZERO, Vec3::Z, Vec3::Y, Vec2::ONE, 90.0, 0.0, 0.0);
        let up = sample.transformed_up();
        assert!(up.abs_diff_eq(Vec3::NEG_X, 1e-5));
        assert_relative_eq!(up.dot(Vec3::Z), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bent_rotation_axes() {
        let sample = sample_a();
        let rotation = sample.bent_rotation();
        assert!((rotation * Vec3::X).abs_diff_eq(Vec3::X, 1e-5));
        assert!((rotation * Vec3::Y).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_bent_rotation_tangent_parallel_to_up() {
        let sample = CurveSample::new(Vec3::ZERO, Vec3::Y, Vec3::Y, Vec2::ONE, 0.0, 0.0, 0.0);
        let rotation = sample.bent_rotation();
        assert!(rotation.is_finite());
        assert_relative_eq!(rotation.length(), 1.0, epsilon = 1e-5);
        // local +X still follows the (nudged) tangent
        assert!((rotation * Vec3::X).dot(Vec3::Y) > 0.99);
    }

    #[test]
    fn test_bend_vertex() {
        let sample = CurveSample::new(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::X,
            Vec3::Y,
            Vec2::new(2.0, 3.0),
            0.0,
            0.0,
            0.0,
        );
        let vertex = MeshVertex {
            position: Vec3::new(7.0, 1.0, 1.0),
            normal: Vec3::Y,
            tangent: Vec4::new(1.0, 0.0, 0.0, -1.0),
            uv: Vec2::new(0.25, 0.5),
        };

        let bent = sample.bend(&vertex);
        // X dropped, Y scaled by scale.y, Z by scale.x, then placed at the sample
        assert!(bent.position.abs_diff_eq(Vec3::new(10.0, 3.0, 2.0), 1e-5));
        assert!(bent.normal.abs_diff_eq(Vec3::Y, 1e-5));
        assert!(bent.tangent.abs_diff_eq(Vec4::new(1.0, 0.0, 0.0, -1.0), 1e-5));
        assert_eq!(bent.uv, vertex.uv);
    }

    #[test]
    fn test_bend_with_roll() {
        let sample = CurveSample::new(Vec3::ZERO, Vec3::X, Vec3::Y, Vec2::ONE, 90.0, 0.0, 0.0);
        let vertex = MeshVertex {
            position: Vec3::new(0.0, 1.0, 0.0),
            normal: Vec3::Y,
            ..default()
        };
        let bent = sample.bend(&vertex);
        assert!(bent.position.abs_diff_eq(Vec3::Z, 1e-5));
        assert!(bent.normal.abs_diff_eq(Vec3::Z, 1e-5));
    }
}
