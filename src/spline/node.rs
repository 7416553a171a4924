use bevy::prelude::*;

/// A spline control point: a position and a direction control point.
///
/// `direction` is not a unit vector but the absolute position of the
/// outgoing Bézier handle. The handle feeding the previous curve is the
/// mirror image, [`SplineNode::inv_direction`], which keeps two curves that
/// share this node C1-continuous.
///
/// Nodes are plain data and the only state a spline needs to persist:
/// curves, samples and bent meshes are all rebuilt from them.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Default)]
pub struct SplineNode {
    /// Node position.
    pub position: Vec3,
    /// Outgoing handle position.
    pub direction: Vec3,
    /// Up vector used to orient bent content at this node.
    pub up: Vec3,
    /// Cross-section scale applied to bent content (x = width, y = height).
    pub scale: Vec2,
    /// Roll around the curve, in degrees.
    pub roll: f32,
}

impl Default for SplineNode {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::ZERO,
            up: Vec3::Y,
            scale: Vec2::ONE,
            roll: 0.0,
        }
    }
}

impl SplineNode {
    /// Create a node with default up, scale and roll.
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction,
            ..default()
        }
    }

    /// Set the up vector.
    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up;
        self
    }

    /// Set the cross-section scale.
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Set the roll in degrees.
    pub fn with_roll(mut self, roll: f32) -> Self {
        self.roll = roll;
        self
    }

    /// The mirrored handle, `2 * position - direction`.
    pub fn inv_direction(&self) -> Vec3 {
        self.position * 2.0 - self.direction
    }

    /// Place the direction so that the mirrored handle lands on `inv_direction`.
    pub fn set_inv_direction(&mut self, inv_direction: Vec3) {
        self.direction = self.position * 2.0 - inv_direction;
    }

    /// Copy every transform field from `other`.
    pub fn copy_transform(&mut self, other: &SplineNode) {
        *self = *other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inv_direction() {
        let mut node = SplineNode::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(node.inv_direction(), Vec3::new(1.0, 0.0, -2.0));

        node.set_inv_direction(Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(node.direction, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(node.inv_direction(), Vec3::ZERO);
    }

    #[test]
    fn test_defaults() {
        let node = SplineNode::new(Vec3::ONE, Vec3::ONE);
        assert_eq!(node.up, Vec3::Y);
        assert_eq!(node.scale, Vec2::ONE);
        assert_eq!(node.roll, 0.0);
    }
}
