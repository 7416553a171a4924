use bevy::prelude::*;

use crate::error::{Result, SplineError};

use super::{Spline, SplineNode};

/// Keeps a spline's node directions smooth automatically.
///
/// Attach next to a [`Spline`]; whenever the spline changes, every node's
/// direction is recomputed from its neighbours.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct SplineSmoother {
    /// How far handles reach, as a share of the average distance to the
    /// neighbouring nodes. Useful values lie in `[0, 0.5]`.
    pub curvature: f32,
}

impl Default for SplineSmoother {
    fn default() -> Self {
        Self { curvature: 0.3 }
    }
}

impl SplineSmoother {
    /// Set the curvature.
    pub fn with_curvature(mut self, curvature: f32) -> Self {
        self.curvature = curvature;
        self
    }
}

/// Smoothed direction for node `index`.
///
/// The handle points along the difference of the unit vectors from the
/// previous node and towards the next one, with a length of `curvature`
/// times the average distance to those neighbours.
pub fn smoothed_direction(nodes: &[SplineNode], index: usize, curvature: f32) -> Vec3 {
    let position = nodes[index].position;
    let mut dir = Vec3::ZERO;
    let mut average_magnitude = 0.0;

    if index > 0 {
        let to_previous = position - nodes[index - 1].position;
        average_magnitude += to_previous.length();
        dir += to_previous.normalize_or_zero();
    }
    if index + 1 < nodes.len() {
        let to_next = position - nodes[index + 1].position;
        average_magnitude += to_next.length();
        dir -= to_next.normalize_or_zero();
    }
    average_magnitude *= 0.5;

    position + dir.normalize_or_zero() * average_magnitude * curvature
}

/// Smooth node `index` and its two neighbours.
pub fn smooth_around(spline: &mut Spline, index: usize, curvature: f32) -> Result<()> {
    let len = spline.nodes().len();
    if index >= len {
        return Err(SplineError::NodeIndexOutOfRange { index, len });
    }
    let start = index.saturating_sub(1);
    let end = (index + 1).min(len - 1);
    for i in start..=end {
        let direction = smoothed_direction(spline.nodes(), i, curvature);
        spline.set_node_direction(i, direction)?;
    }
    Ok(())
}

/// Smooth every node of the spline, first to last.
pub fn smooth_all(spline: &mut Spline, curvature: f32) -> Result<()> {
    for i in 0..spline.nodes().len() {
        let direction = smoothed_direction(spline.nodes(), i, curvature);
        spline.set_node_direction(i, direction)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn corner() -> Spline {
        Spline::from_nodes(vec![
            SplineNode::new(Vec3::ZERO, Vec3::ZERO),
            SplineNode::new(Vec3::new(4.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0)),
            SplineNode::new(Vec3::new(4.0, 0.0, 4.0), Vec3::new(4.0, 0.0, 4.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_interior_direction() {
        let spline = corner();
        let direction = smoothed_direction(spline.nodes(), 1, 0.5);
        // bisects the corner, reaching half the average neighbour distance
        let handle = direction - spline.nodes()[1].position;
        assert!(handle.normalize().abs_diff_eq(Vec3::new(1.0, 0.0, 1.0).normalize(), 1e-5));
        assert_relative_eq!(handle.length(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_end_direction() {
        let spline = corner();
        let direction = smoothed_direction(spline.nodes(), 0, 0.3);
        // single neighbour: the magnitude is still halved
        assert!(direction.abs_diff_eq(Vec3::new(0.6, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_smooth_all_updates_curves() {
        let mut spline = corner();
        let before = spline.length();
        smooth_all(&mut spline, 0.3).unwrap();
        assert_ne!(spline.length(), before);
        for (i, node) in spline.nodes().iter().enumerate() {
            assert_eq!(node.direction, smoothed_direction(spline.nodes(), i, 0.3));
            assert_ne!(node.direction, node.position);
        }
    }

    #[test]
    fn test_smooth_around_bounds() {
        let mut spline = corner();
        smooth_around(&mut spline, 2, 0.3).unwrap();
        assert_eq!(spline.nodes()[0].direction, Vec3::ZERO);
        assert_ne!(spline.nodes()[1].direction, spline.nodes()[1].position);
        assert!(smooth_around(&mut spline, 7, 0.3).is_err());
    }
}
