use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use bevy::prelude::*;

use crate::error::{Result, SplineError};
use crate::event::Event;

use super::types::{cubic_bezier, cubic_bezier_derivative, CurveSampler};
use super::{CurveSample, SplineNode};

/// Number of uniform time steps in a curve's sample table.
pub const STEP_COUNT: usize = 30;

static NEXT_CURVE_ID: AtomicU64 = AtomicU64::new(0);

/// Stable identity of a [`CubicBezierCurve`].
///
/// Survives `connect_start` / `connect_end`, so anything bound to a curve
/// stays bound while the chain around it is restructured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub struct CurveId(u64);

impl CurveId {
    fn next() -> Self {
        Self(NEXT_CURVE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct CurveBounds {
    min: Vec3,
    max: Vec3,
    points: Vec<Vec3>,
}

/// One cubic Bézier segment between two spline nodes.
///
/// The curve keeps copies of its endpoint nodes and a table of
/// `STEP_COUNT + 1` samples from which arclength queries are answered.
/// Whenever the table is rebuilt, `changed` fires with the curve's id.
#[derive(Debug)]
pub struct CubicBezierCurve {
    id: CurveId,
    n1: SplineNode,
    n2: SplineNode,
    samples: Vec<CurveSample>,
    length: f32,
    gizmo_editing: bool,
    pending_change: bool,
    bounds: OnceLock<CurveBounds>,

    /// Fired after every sample table rebuild.
    pub changed: Event<CurveId>,
}

impl CubicBezierCurve {
    /// Create a curve from `n1` to `n2` and compute its samples.
    pub fn new(n1: SplineNode, n2: SplineNode) -> Self {
        let mut curve = Self {
            id: CurveId::next(),
            n1,
            n2,
            samples: Vec::with_capacity(STEP_COUNT + 1),
            length: 0.0,
            gizmo_editing: false,
            pending_change: false,
            bounds: OnceLock::new(),
            changed: Event::new(),
        };
        curve.compute_samples();
        curve
    }

    pub fn id(&self) -> CurveId {
        self.id
    }

    /// Start node.
    pub fn n1(&self) -> &SplineNode {
        &self.n1
    }

    /// End node.
    pub fn n2(&self) -> &SplineNode {
        &self.n2
    }

    /// Arclength, the sum of the distances between consecutive samples.
    pub fn length(&self) -> f32 {
        self.length
    }

    /// The sample table, ordered by time and distance.
    pub fn samples(&self) -> &[CurveSample] {
        &self.samples
    }

    /// Replace the start node and recompute.
    pub fn connect_start(&mut self, n1: SplineNode) {
        self.n1 = n1;
        self.compute_samples();
    }

    /// Replace the end node and recompute.
    pub fn connect_end(&mut self, n2: SplineNode) {
        self.n2 = n2;
        self.compute_samples();
    }

    /// The third control point: the end node's mirrored handle.
    pub fn inverse_direction(&self) -> Vec3 {
        self.n2.inv_direction()
    }

    fn control_points(&self) -> (Vec3, Vec3, Vec3, Vec3) {
        (
            self.n1.position,
            self.n1.direction,
            self.inverse_direction(),
            self.n2.position,
        )
    }

    /// Point on the curve at time `t` in `[0, 1]`.
    pub fn location(&self, t: f32) -> Vec3 {
        let (p0, p1, p2, p3) = self.control_points();
        cubic_bezier(p0, p1, p2, p3, t)
    }

    /// Unit tangent at time `t`.
    ///
    /// Where the derivative vanishes (a handle sitting on its node) the
    /// chord direction is used instead.
    pub fn tangent(&self, t: f32) -> Vec3 {
        let (p0, p1, p2, p3) = self.control_points();
        cubic_bezier_derivative(p0, p1, p2, p3, t)
            .try_normalize()
            .or_else(|| (p3 - p0).try_normalize())
            .unwrap_or(Vec3::X)
    }

    fn up(&self, t: f32) -> Vec3 {
        self.n1.up.lerp(self.n2.up, t)
    }

    fn scale(&self, t: f32) -> Vec2 {
        self.n1.scale.lerp(self.n2.scale, t)
    }

    fn roll(&self, t: f32) -> f32 {
        self.n1.roll + (self.n2.roll - self.n1.roll) * t
    }

    /// Rebuild the sample table and length, then notify listeners.
    pub fn compute_samples(&mut self) {
        self.samples.resize_with(STEP_COUNT + 1, CurveSample::default);
        self.length = 0.0;

        let mut previous = self.location(0.0);
        for i in 0..=STEP_COUNT {
            let t = i as f32 / STEP_COUNT as f32;
            let location = self.location(t);
            self.length += previous.distance(location);
            previous = location;

            let (tangent, up, scale, roll) = (self.tangent(t), self.up(t), self.scale(t), self.roll(t));
            let length = self.length;
            self.samples[i].set(location, tangent, up, scale, roll, length, t);
        }

        self.bounds = OnceLock::new();
        self.notify_changed();
    }

    fn notify_changed(&mut self) {
        if self.gizmo_editing {
            self.pending_change = true;
        } else {
            self.changed.invoke(&self.id);
        }
    }

    pub fn is_gizmo_editing(&self) -> bool {
        self.gizmo_editing
    }

    /// Hold back `changed` while an interactive edit is in progress.
    ///
    /// Recomputation still happens on every edit; only the notification is
    /// deferred, and a single one is sent when editing ends.
    pub fn set_gizmo_editing(&mut self, editing: bool) {
        if self.gizmo_editing == editing {
            return;
        }
        self.gizmo_editing = editing;
        if !editing && self.pending_change {
            self.pending_change = false;
            self.changed.invoke(&self.id);
        }
    }

    fn bounds(&self) -> &CurveBounds {
        self.bounds.get_or_init(|| {
            let points: Vec<Vec3> = self.samples.iter().map(CurveSample::location).collect();
            let (min, max) = points
                .iter()
                .fold((Vec3::MAX, Vec3::MIN), |(min, max), p| (min.min(*p), max.max(*p)));
            CurveBounds { min, max, points }
        })
    }

    /// Axis-aligned bounds of the sample locations, as `(min, max)`.
    pub fn bounding(&self) -> (Vec3, Vec3) {
        let bounds = self.bounds();
        (bounds.min, bounds.max)
    }

    /// Sample locations.
    pub fn points(&self) -> &[Vec3] {
        &self.bounds().points
    }
}

/// Interpolate between the samples bracketing `key`.
///
/// `samples` must be sorted by `key_of`, and `key` must lie within the
/// table's range.
pub(crate) fn lerp_bracketing(
    samples: &[CurveSample],
    key: f32,
    key_of: impl Fn(&CurveSample) -> f32,
    out: &mut CurveSample,
) {
    let next_index = samples
        .partition_point(|s| key_of(s) < key)
        .min(samples.len() - 1);
    let previous_index = next_index.saturating_sub(1);
    let (previous, next) = (&samples[previous_index], &samples[next_index]);

    let span = key_of(next) - key_of(previous);
    let t = if span > 0.0 {
        (key - key_of(previous)) / span
    } else {
        0.0
    };
    CurveSample::lerp_into(previous, next, t, out);
}

impl CurveSampler for CubicBezierCurve {
    fn length(&self) -> f32 {
        self.length
    }

    fn sample_into(&self, t: f32, out: &mut CurveSample) -> Result<()> {
        if !(0.0..=1.0).contains(&t) {
            return Err(SplineError::TimeOutOfRange { value: t, max: 1.0 });
        }
        lerp_bracketing(&self.samples, t, CurveSample::time_in_curve, out);
        Ok(())
    }

    fn sample_at_distance_into(&self, distance: f32, out: &mut CurveSample) -> Result<()> {
        if !(0.0..=self.length).contains(&distance) {
            return Err(SplineError::DistanceOutOfRange {
                value: distance,
                length: self.length,
            });
        }
        lerp_bracketing(&self.samples, distance, CurveSample::distance_in_curve, out);
        Ok(())
    }
}
