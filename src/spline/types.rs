use bevy::prelude::*;

use crate::error::Result;

use super::CurveSample;

/// Anything that can be sampled by Bézier time or by arclength.
///
/// Implemented by a single [`super::CubicBezierCurve`] (time in `[0, 1]`) and
/// by a whole [`super::Spline`] (time in `[0, node_count - 1]`).
pub trait CurveSampler {
    /// Total arclength.
    fn length(&self) -> f32;

    /// Interpolated sample at Bézier time `t`.
    fn sample(&self, t: f32) -> Result<CurveSample> {
        let mut out = CurveSample::default();
        self.sample_into(t, &mut out)?;
        Ok(out)
    }

    /// Interpolated sample at arclength `distance` from the start.
    fn sample_at_distance(&self, distance: f32) -> Result<CurveSample> {
        let mut out = CurveSample::default();
        self.sample_at_distance_into(distance, &mut out)?;
        Ok(out)
    }

    /// [`CurveSampler::sample`] writing into `out`.
    fn sample_into(&self, t: f32, out: &mut CurveSample) -> Result<()>;

    /// [`CurveSampler::sample_at_distance`] writing into `out`.
    fn sample_at_distance_into(&self, distance: f32, out: &mut CurveSample) -> Result<()>;
}

/// Point on the cubic Bézier `p0, p1, p2, p3` at `t`.
pub fn cubic_bezier(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;

    p0 * mt3 + p1 * 3.0 * mt2 * t + p2 * 3.0 * mt * t2 + p3 * t3
}

/// Derivative of the cubic Bézier `p0, p1, p2, p3` at `t`.
pub fn cubic_bezier_derivative(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;

    (p1 - p0) * 3.0 * mt2 + (p2 - p1) * 6.0 * mt * t + (p3 - p2) * 3.0 * t2
}
