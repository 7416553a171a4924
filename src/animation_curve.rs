//! Keyframed scalar curves, evaluated with cubic Hermite interpolation.
//!
//! Used by [`crate::mesh::MeshBender`] to scale the height of bent vertices
//! along the fill.

use bevy::prelude::*;

/// A key on an [`AnimationCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct Keyframe {
    /// Key time.
    pub time: f32,
    /// Value at `time`.
    pub value: f32,
    /// Slope arriving at the key.
    pub in_tangent: f32,
    /// Slope leaving the key.
    pub out_tangent: f32,
}

impl Keyframe {
    /// Create a key with flat tangents.
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }

    /// Set both tangents.
    pub fn with_tangents(mut self, in_tangent: f32, out_tangent: f32) -> Self {
        self.in_tangent = in_tangent;
        self.out_tangent = out_tangent;
        self
    }
}

/// A piecewise Hermite curve through time-sorted keys.
///
/// Outside the key range the curve holds the first/last value.
#[derive(Debug, Clone, PartialEq, Default, Reflect)]
pub struct AnimationCurve {
    keys: Vec<Keyframe>,
}

impl AnimationCurve {
    /// Create a curve from keys in any order.
    pub fn new(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// A constant line at `value` between `time_start` and `time_end`.
    pub fn constant(time_start: f32, time_end: f32, value: f32) -> Self {
        Self::linear(time_start, value, time_end, value)
    }

    /// A straight line from (`time_start`, `value_start`) to (`time_end`, `value_end`).
    pub fn linear(time_start: f32, value_start: f32, time_end: f32, value_end: f32) -> Self {
        if time_start == time_end {
            return Self::new(vec![Keyframe::new(time_start, value_start)]);
        }

        let tangent = (value_end - value_start) / (time_end - time_start);
        Self::new(vec![
            Keyframe::new(time_start, value_start).with_tangents(0.0, tangent),
            Keyframe::new(time_end, value_end).with_tangents(tangent, 0.0),
        ])
    }

    /// An ease-in and out curve from (`time_start`, `value_start`) to (`time_end`, `value_end`).
    pub fn ease_in_out(time_start: f32, value_start: f32, time_end: f32, value_end: f32) -> Self {
        if time_start == time_end {
            return Self::new(vec![Keyframe::new(time_start, value_start)]);
        }

        Self::new(vec![
            Keyframe::new(time_start, value_start),
            Keyframe::new(time_end, value_end),
        ])
    }

    /// The constant curve 1 over `[0, 1]`.
    pub fn one() -> Self {
        Self::constant(0.0, 1.0, 1.0)
    }

    /// The curve keys, sorted by time.
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Add a key, keeping the keys sorted.
    pub fn add_key(&mut self, key: Keyframe) {
        let index = self.keys.partition_point(|k| k.time <= key.time);
        self.keys.insert(index, key);
    }

    /// Evaluate the curve at `time`. An empty curve evaluates to 0.
    pub fn evaluate(&self, time: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        let index = self.keys.partition_point(|k| k.time <= time);
        let k0 = self.keys[index - 1];
        let k1 = self.keys[index];

        let dt = k1.time - k0.time;
        if dt <= f32::EPSILON {
            return k1.value;
        }

        let s = (time - k0.time) / dt;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * k0.value + h10 * dt * k0.out_tangent + h01 * k1.value + h11 * dt * k1.in_tangent
    }
}
