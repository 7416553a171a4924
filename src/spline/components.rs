use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use bevy::prelude::*;

use crate::error::{Result, SplineError};
use crate::event::Event;

use super::types::CurveSampler;
use super::{CubicBezierCurve, CurveId, CurveSample, SplineNode};

/// Slack allowed when a distance lands just past a curve's end.
const CURVE_LENGTH_SNAP: f32 = 0.0001;

static NEXT_SPLINE_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a [`Spline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub struct SplineId(u64);

impl SplineId {
    fn next() -> Self {
        Self(NEXT_SPLINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// How the node list of a spline changed.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeListChange {
    /// A node was appended at `index`.
    Added { index: usize },
    /// A node was inserted at `index`.
    Inserted { index: usize },
    /// The node at `index` was removed.
    Removed { index: usize, node: SplineNode },
    /// The whole list was replaced.
    Reset,
}

#[derive(Debug, Clone)]
struct SplineBounds {
    min: Vec3,
    max: Vec3,
    points: Vec<Vec3>,
}

/// A curved line made of oriented nodes.
///
/// Each pair of consecutive nodes is joined by a [`CubicBezierCurve`]. The
/// spline owns both lists: node edits go through it so that the (at most
/// two) curves touching a node are re-pointed, the total length is kept in
/// sync and listeners are told.
///
/// Curves are patched in place when nodes are added, inserted or removed,
/// so a curve keeps its [`CurveId`] as long as neither of its own endpoints
/// is removed.
#[derive(Component, Debug)]
pub struct Spline {
    id: SplineId,
    nodes: Vec<SplineNode>,
    curves: Vec<CubicBezierCurve>,
    length: f32,
    is_loop: bool,
    gizmo_editing: bool,
    pending_change: bool,
    bounds: OnceLock<SplineBounds>,

    /// Fired after any curve of the spline changed.
    pub curve_changed: Event<SplineId>,
    /// Fired after nodes were added, inserted, removed or replaced.
    pub node_list_changed: Event<NodeListChange>,
}

impl Default for Spline {
    /// A short two-node spline, visible as soon as it is spawned.
    fn default() -> Self {
        Self::build(vec![
            SplineNode::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, -3.0)),
            SplineNode::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 3.0)),
        ])
    }
}

impl Spline {
    /// Create a spline through `nodes`. At least two nodes are required.
    pub fn from_nodes(nodes: Vec<SplineNode>) -> Result<Self> {
        if nodes.len() < 2 {
            return Err(SplineError::NotEnoughNodes(nodes.len()));
        }
        Ok(Self::build(nodes))
    }

    fn build(nodes: Vec<SplineNode>) -> Self {
        let curves = Self::create_curves(&nodes);
        let length = curves.iter().map(CubicBezierCurve::length).sum();
        Self {
            id: SplineId::next(),
            nodes,
            curves,
            length,
            is_loop: false,
            gizmo_editing: false,
            pending_change: false,
            bounds: OnceLock::new(),
            curve_changed: Event::new(),
            node_list_changed: Event::new(),
        }
    }

    fn create_curves(nodes: &[SplineNode]) -> Vec<CubicBezierCurve> {
        nodes
            .windows(2)
            .map(|pair| CubicBezierCurve::new(pair[0], pair[1]))
            .collect()
    }

    pub fn id(&self) -> SplineId {
        self.id
    }

    pub fn nodes(&self) -> &[SplineNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&SplineNode> {
        self.nodes.get(index)
    }

    /// Curves, `curves()[i]` joining node `i` to node `i + 1`.
    pub fn curves(&self) -> &[CubicBezierCurve] {
        &self.curves
    }

    /// Mutable access to a curve, to subscribe to its `changed` event.
    ///
    /// Node edits must go through the spline, never through the curve.
    pub fn curve_mut(&mut self, index: usize) -> Option<&mut CubicBezierCurve> {
        self.curves.get_mut(index)
    }

    pub fn curve_by_id(&self, id: CurveId) -> Option<&CubicBezierCurve> {
        self.curves.iter().find(|curve| curve.id() == id)
    }

    /// Length in world units, the sum of the curve lengths.
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    /// Replace every node and rebuild all curves.
    pub fn set_nodes(&mut self, nodes: Vec<SplineNode>) -> Result<()> {
        if nodes.len() < 2 {
            return Err(SplineError::NotEnoughNodes(nodes.len()));
        }
        self.nodes = nodes;
        self.curves = Self::create_curves(&self.nodes);
        if self.gizmo_editing {
            self.curves.iter_mut().for_each(|curve| curve.set_gizmo_editing(true));
        }
        debug!("spline {:?}: rebuilt {} curves", self.id, self.curves.len());

        self.node_list_changed.invoke(&NodeListChange::Reset);
        self.update_loop_binding();
        self.after_curve_changed();
        Ok(())
    }

    /// Append a node at the end of the spline.
    pub fn add_node(&mut self, node: SplineNode) {
        let previous = self.nodes[self.nodes.len() - 1];
        self.nodes.push(node);
        self.curves.push(self.new_curve(previous, node));

        self.node_list_changed.invoke(&NodeListChange::Added {
            index: self.nodes.len() - 1,
        });
        self.update_loop_binding();
        self.after_curve_changed();
    }

    /// Insert a node between `index - 1` and `index`.
    ///
    /// The curve ending at the old node `index` is re-pointed at the new node
    /// and a new curve joins the new node to the old one.
    pub fn insert_node(&mut self, index: usize, node: SplineNode) -> Result<()> {
        if index == 0 {
            return Err(SplineError::InsertAtStart);
        }
        if index >= self.nodes.len() {
            return Err(SplineError::NodeIndexOutOfRange {
                index,
                len: self.nodes.len(),
            });
        }

        let next = self.nodes[index];
        self.nodes.insert(index, node);
        self.curves[index - 1].connect_end(node);
        let curve = self.new_curve(node, next);
        self.curves.insert(index, curve);

        self.node_list_changed.invoke(&NodeListChange::Inserted { index });
        self.update_loop_binding();
        self.after_curve_changed();
        Ok(())
    }

    /// Remove the node at `index`. A spline keeps at least two nodes.
    ///
    /// Removing an interior node re-points the previous curve at the next
    /// node and drops the curve that started at the removed node.
    pub fn remove_node(&mut self, index: usize) -> Result<SplineNode> {
        let len = self.nodes.len();
        if len <= 2 {
            return Err(SplineError::NotEnoughNodes(len));
        }
        if index >= len {
            return Err(SplineError::NodeIndexOutOfRange { index, len });
        }

        let last = index == len - 1;
        let to_remove = if last { index - 1 } else { index };
        if index != 0 && !last {
            let next = self.nodes[index + 1];
            self.curves[index - 1].connect_end(next);
        }

        let node = self.nodes.remove(index);
        self.curves.remove(to_remove);

        self.node_list_changed
            .invoke(&NodeListChange::Removed { index, node });
        self.update_loop_binding();
        self.after_curve_changed();
        Ok(node)
    }

    /// Append a node past the end, continuing along the last tangent.
    ///
    /// The new node sits half an average curve length beyond the last node
    /// and keeps its handle. Up, scale and roll start from their defaults.
    /// Returns the new node's index.
    pub fn append_node(&mut self) -> usize {
        let index = self.nodes.len() - 1;
        let node = self.extended_node(index, self.curves[index - 1].tangent(1.0));
        self.add_node(node);
        index + 1
    }

    /// Add a node right after `index`, continuing along the spline tangent
    /// at that node. Returns the new node's index.
    pub fn insert_node_after(&mut self, index: usize) -> Result<usize> {
        let len = self.nodes.len();
        if index >= len {
            return Err(SplineError::NodeIndexOutOfRange { index, len });
        }
        if index == len - 1 {
            return Ok(self.append_node());
        }

        let node = self.extended_node(index, self.curves[index].tangent(0.0));
        self.insert_node(index + 1, node)?;
        Ok(index + 1)
    }

    fn extended_node(&self, index: usize, tangent: Vec3) -> SplineNode {
        let from = self.nodes[index];
        let offset = tangent * (self.length / self.nodes.len() as f32 / 2.0);
        SplineNode::new(from.position + offset, from.direction + offset)
    }

    /// Edit the node at `index` in place.
    ///
    /// The curves touching the node (and, on a loop, the mirrored node) are
    /// recomputed. An edit that leaves the node unchanged notifies nobody.
    pub fn edit_node(&mut self, index: usize, edit: impl FnOnce(&mut SplineNode)) -> Result<()> {
        let len = self.nodes.len();
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(SplineError::NodeIndexOutOfRange { index, len })?;

        let before = *node;
        edit(node);
        if *node == before {
            return Ok(());
        }

        self.forward_node(index);
        if self.is_loop {
            if index == 0 {
                self.nodes[len - 1] = self.nodes[0];
                self.forward_node(len - 1);
            } else if index == len - 1 {
                self.nodes[0] = self.nodes[len - 1];
                self.forward_node(0);
            }
        }
        self.after_curve_changed();
        Ok(())
    }

    /// Replace the node at `index`.
    pub fn set_node(&mut self, index: usize, node: SplineNode) -> Result<()> {
        self.edit_node(index, |n| *n = node)
    }

    pub fn set_node_position(&mut self, index: usize, position: Vec3) -> Result<()> {
        self.edit_node(index, |n| n.position = position)
    }

    pub fn set_node_direction(&mut self, index: usize, direction: Vec3) -> Result<()> {
        self.edit_node(index, |n| n.direction = direction)
    }

    /// Make the last node mirror the first one, or stop doing so.
    pub fn set_loop(&mut self, is_loop: bool) {
        if self.is_loop == is_loop {
            return;
        }
        self.is_loop = is_loop;
        if self.update_loop_binding() {
            self.after_curve_changed();
        }
    }

    /// Copy the first node onto the last one when looping. Returns whether
    /// anything changed.
    fn update_loop_binding(&mut self) -> bool {
        let last = self.nodes.len() - 1;
        if !self.is_loop || self.nodes[last] == self.nodes[0] {
            return false;
        }
        let first = self.nodes[0];
        self.nodes[last].copy_transform(&first);
        self.forward_node(last);
        true
    }

    /// Push node `index` to the curves that end and start at it.
    fn forward_node(&mut self, index: usize) {
        let node = self.nodes[index];
        if index > 0 {
            self.curves[index - 1].connect_end(node);
        }
        if let Some(curve) = self.curves.get_mut(index) {
            curve.connect_start(node);
        }
    }

    fn new_curve(&self, n1: SplineNode, n2: SplineNode) -> CubicBezierCurve {
        let mut curve = CubicBezierCurve::new(n1, n2);
        curve.set_gizmo_editing(self.gizmo_editing);
        curve
    }

    fn after_curve_changed(&mut self) {
        self.length = self.curves.iter().map(CubicBezierCurve::length).sum();
        self.bounds = OnceLock::new();
        if self.gizmo_editing {
            self.pending_change = true;
        } else {
            self.curve_changed.invoke(&self.id);
        }
    }

    pub fn is_gizmo_editing(&self) -> bool {
        self.gizmo_editing
    }

    /// Batch edits: while editing, neither the curves nor the spline send
    /// change notifications. Ending the batch sends one of each.
    pub fn set_gizmo_editing(&mut self, editing: bool) {
        if self.gizmo_editing == editing {
            return;
        }
        self.gizmo_editing = editing;
        for curve in &mut self.curves {
            curve.set_gizmo_editing(editing);
        }
        if !editing && self.pending_change {
            self.pending_change = false;
            self.curve_changed.invoke(&self.id);
        }
    }

    /// Index of the curve holding spline time `t`, in `[0, node_count - 1]`.
    ///
    /// The last node maps to the end of the last curve.
    pub fn node_index_for_time(&self, t: f32) -> Result<usize> {
        let max = (self.nodes.len() - 1) as f32;
        if !(0.0..=max).contains(&t) {
            return Err(SplineError::TimeOutOfRange { value: t, max });
        }
        Ok((t.floor() as usize).min(self.curves.len() - 1))
    }

    /// The curve holding spline time `t`.
    pub fn curve_at(&self, t: f32) -> Result<&CubicBezierCurve> {
        Ok(&self.curves[self.node_index_for_time(t)?])
    }

    /// Every curve sample, in order. Shared endpoints appear twice.
    pub fn samples(&self) -> impl Iterator<Item = &CurveSample> {
        self.curves.iter().flat_map(|curve| curve.samples())
    }

    fn bounds(&self) -> &SplineBounds {
        self.bounds.get_or_init(|| {
            let points: Vec<Vec3> = self.samples().map(CurveSample::location).collect();
            let (min, max) = points
                .iter()
                .fold((Vec3::MAX, Vec3::MIN), |(min, max), p| (min.min(*p), max.max(*p)));
            SplineBounds { min, max, points }
        })
    }

    /// Axis-aligned bounds of all sample locations, as `(min, max)`.
    pub fn bounding(&self) -> (Vec3, Vec3) {
        let bounds = self.bounds();
        (bounds.min, bounds.max)
    }

    /// All sample locations, in order.
    pub fn points(&self) -> &[Vec3] {
        &self.bounds().points
    }
}

impl CurveSampler for Spline {
    fn length(&self) -> f32 {
        self.length
    }

    fn sample_into(&self, t: f32, out: &mut CurveSample) -> Result<()> {
        let index = self.node_index_for_time(t)?;
        let local = (t - index as f32).clamp(0.0, 1.0);
        self.curves[index].sample_into(local, out)
    }

    fn sample_at_distance_into(&self, distance: f32, out: &mut CurveSample) -> Result<()> {
        if !(0.0..=self.length).contains(&distance) {
            return Err(SplineError::DistanceOutOfRange {
                value: distance,
                length: self.length,
            });
        }

        let mut remaining = distance;
        for curve in &self.curves {
            let length = curve.length();
            if remaining > length && remaining < length + CURVE_LENGTH_SNAP {
                remaining = length;
            }
            if remaining <= length {
                return curve.sample_at_distance_into(remaining, out);
            }
            remaining -= length;
        }

        // float drift between the cached total and the per-curve lengths
        match self.curves.last() {
            Some(curve) => curve.sample_at_distance_into(curve.length(), out),
            None => Err(SplineError::NotEnoughNodes(self.nodes.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::ErrorKind;
    use crate::event::Listening;
    use approx::assert_relative_eq;

    /// Three straight unit-speed curves along X: 0..3, 3..6, 6..9.
    fn straight_spline(count: usize) -> Spline {
        let nodes = (0..count)
            .map(|i| {
                let x = i as f32 * 3.0;
                SplineNode::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0))
            })
            .collect();
        Spline::from_nodes(nodes).unwrap()
    }

    fn curve_length_sum(spline: &Spline) -> f32 {
        spline.curves().iter().map(CubicBezierCurve::length).sum()
    }

    #[test]
    fn test_from_nodes_requires_two() {
        let err = Spline::from_nodes(vec![SplineNode::default()]).unwrap_err();
        assert_eq!(err, SplineError::NotEnoughNodes(1));
    }

    #[test]
    fn test_default_spline() {
        let spline = Spline::default();
        assert_eq!(spline.nodes().len(), 2);
        assert_eq!(spline.curves().len(), 1);
        assert_eq!(spline.nodes()[1].direction, Vec3::new(10.0, 0.0, 3.0));
        assert!(spline.length() > 5.0);
    }

    #[test]
    fn test_length_is_sum_of_curves() {
        let mut spline = straight_spline(4);
        assert_relative_eq!(spline.length(), 9.0, epsilon = 1e-4);

        spline.set_node_position(1, Vec3::new(3.0, 2.0, 0.0)).unwrap();
        spline.add_node(SplineNode::new(Vec3::new(12.0, 0.0, 0.0), Vec3::new(13.0, 0.0, 0.0)));
        spline.insert_node(2, SplineNode::new(Vec3::new(4.5, 1.0, 0.0), Vec3::new(5.0, 1.0, 0.0))).unwrap();
        spline.remove_node(0).unwrap();
        assert_relative_eq!(spline.length(), curve_length_sum(&spline));
        assert_eq!(spline.curves().len(), spline.nodes().len() - 1);
    }

    #[test]
    fn test_curves_join_consecutive_nodes() {
        let mut spline = straight_spline(4);
        spline.insert_node(2, SplineNode::new(Vec3::new(4.5, 1.0, 0.0), Vec3::new(5.0, 1.0, 0.0))).unwrap();
        spline.remove_node(3).unwrap();
        for (i, curve) in spline.curves().iter().enumerate() {
            assert_eq!(curve.n1(), &spline.nodes()[i]);
            assert_eq!(curve.n2(), &spline.nodes()[i + 1]);
        }
    }

    #[test]
    fn test_structural_edits_keep_curve_identity() {
        let mut spline = straight_spline(4);
        let ids: Vec<CurveId> = spline.curves().iter().map(CubicBezierCurve::id).collect();

        spline.insert_node(1, SplineNode::new(Vec3::new(1.5, 1.0, 0.0), Vec3::new(2.0, 1.0, 0.0))).unwrap();
        assert_eq!(spline.curves()[0].id(), ids[0]);
        assert_eq!(spline.curves()[2].id(), ids[1]);
        assert_eq!(spline.curves()[3].id(), ids[2]);

        // removing the inserted node drops the curve that started at it
        spline.remove_node(1).unwrap();
        let after: Vec<CurveId> = spline.curves().iter().map(CubicBezierCurve::id).collect();
        assert_eq!(after, ids);

        spline.remove_node(3).unwrap();
        assert_eq!(spline.curves().len(), 2);
        assert_eq!(spline.curves()[1].id(), ids[1]);

        spline.add_node(SplineNode::new(Vec3::new(9.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(spline.curves()[0].id(), ids[0]);
        assert_eq!(spline.curves()[1].id(), ids[1]);
    }

    #[test]
    fn test_invalid_structural_edits() {
        let mut spline = straight_spline(2);
        let err = spline.remove_node(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let err = spline.insert_node(0, SplineNode::default()).unwrap_err();
        assert_eq!(err, SplineError::InsertAtStart);

        let err = spline.insert_node(2, SplineNode::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);

        let mut spline = straight_spline(3);
        assert!(spline.remove_node(3).is_err());
        assert_eq!(spline.nodes().len(), 3);
    }

    #[test]
    fn test_sample_by_time() {
        let spline = straight_spline(4);
        let sample = spline.sample(1.5).unwrap();
        assert!(sample.location().abs_diff_eq(Vec3::new(4.5, 0.0, 0.0), 1e-4));

        let end = spline.sample(3.0).unwrap();
        assert!(end.location().abs_diff_eq(Vec3::new(9.0, 0.0, 0.0), 1e-4));
        assert_eq!(spline.node_index_for_time(3.0).unwrap(), 2);
        assert_eq!(spline.node_index_for_time(2.0).unwrap(), 2);
        assert_eq!(spline.curve_at(0.3).unwrap().id(), spline.curves()[0].id());

        for t in [-0.1, 3.01] {
            assert_eq!(spline.sample(t).unwrap_err().kind(), ErrorKind::OutOfRange);
        }
    }

    #[test]
    fn test_sample_at_distance() {
        let spline = straight_spline(4);
        let sample = spline.sample_at_distance(4.0).unwrap();
        assert!(sample.location().abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-3));

        let start = spline.sample_at_distance(0.0).unwrap();
        assert!(start.location().abs_diff_eq(Vec3::ZERO, 1e-5));
        let end = spline.sample_at_distance(spline.length()).unwrap();
        assert!(end.location().abs_diff_eq(Vec3::new(9.0, 0.0, 0.0), 1e-3));

        assert!(spline.sample_at_distance(1e-4).is_ok());
        assert!(spline.sample_at_distance(spline.length() - 1e-4).is_ok());
        assert_eq!(
            spline.sample_at_distance(-1e-3).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
        assert!(spline.sample_at_distance(spline.length() + 1e-3).is_err());
    }

    #[test]
    fn test_edit_node_forwards_to_curves() {
        let mut spline = straight_spline(3);
        let moved = Vec3::new(3.0, 5.0, 0.0);
        spline.set_node_position(1, moved).unwrap();
        assert_eq!(spline.curves()[0].n2().position, moved);
        assert_eq!(spline.curves()[1].n1().position, moved);
        assert!(spline.sample(1.0).unwrap().location().abs_diff_eq(moved, 1e-4));

        assert!(spline.set_node_position(5, moved).is_err());
    }

    #[test]
    fn test_loop_binding() {
        let mut spline = straight_spline(3);
        spline.set_loop(true);
        assert_eq!(spline.nodes()[2], spline.nodes()[0]);

        let moved = Vec3::new(1.0, 2.0, 3.0);
        spline.set_node_position(0, moved).unwrap();
        assert_eq!(spline.nodes()[2].position, moved);
        assert_eq!(spline.curves()[1].n2().position, moved);

        let moved_back = Vec3::new(-1.0, 0.0, 0.0);
        spline.edit_node(2, |n| {
            n.position = moved_back;
            n.roll = 30.0;
        })
        .unwrap();
        assert_eq!(spline.nodes()[0].position, moved_back);
        assert_eq!(spline.nodes()[0].roll, 30.0);
        assert_eq!(spline.curves()[0].n1().position, moved_back);

        spline.set_loop(false);
        spline.set_node_position(0, Vec3::ZERO).unwrap();
        assert_eq!(spline.nodes()[2].position, moved_back);
    }

    #[test]
    fn test_curve_changed_events() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut spline = straight_spline(3);
        let counter = hits.clone();
        spline.curve_changed.add_listener(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
            Listening::Keep
        });

        spline.set_node_position(1, Vec3::Y).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        // unchanged edits notify nobody
        spline.set_node_position(1, Vec3::Y).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        spline.set_gizmo_editing(true);
        for i in 0..5 {
            spline.set_node_position(1, Vec3::Y * i as f32 * 2.0).unwrap();
        }
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        spline.set_gizmo_editing(false);
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_node_list_events() {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let mut spline = straight_spline(3);
        let log = changes.clone();
        spline.node_list_changed.add_listener(move |change| {
            log.lock().unwrap().push(change.clone());
            Listening::Keep
        });

        spline.add_node(SplineNode::new(Vec3::X * 9.0, Vec3::X * 10.0));
        spline.insert_node(1, SplineNode::default()).unwrap();
        let removed = spline.remove_node(1).unwrap();
        spline.set_nodes(vec![SplineNode::default(), SplineNode::new(Vec3::X, Vec3::X)]).unwrap();

        let changes = changes.lock().unwrap();
        assert_eq!(
            *changes,
            vec![
                NodeListChange::Added { index: 3 },
                NodeListChange::Inserted { index: 1 },
                NodeListChange::Removed { index: 1, node: removed },
                NodeListChange::Reset,
            ]
        );
    }

    #[test]
    fn test_append_and_insert_after() {
        let mut spline = straight_spline(2);
        let index = spline.append_node();
        assert_eq!(index, 2);
        // half the average curve length past the last node, along +X
        assert!(spline.nodes()[2].position.abs_diff_eq(Vec3::new(3.75, 0.0, 0.0), 1e-3));

        let index = spline.insert_node_after(0).unwrap();
        assert_eq!(index, 1);
        assert_eq!(spline.nodes().len(), 4);
        assert!(spline.nodes()[1].position.x > 0.0);
        assert!(spline.insert_node_after(9).is_err());
    }

    #[test]
    fn test_appended_node_has_default_frame() {
        let mut spline = straight_spline(2);
        spline
            .edit_node(1, |n| {
                n.up = Vec3::Z;
                n.scale = Vec2::splat(3.0);
                n.roll = 45.0;
            })
            .unwrap();

        let index = spline.append_node();
        let appended = spline.nodes()[index];
        assert_eq!(appended.up, Vec3::Y);
        assert_eq!(appended.scale, Vec2::ONE);
        assert_eq!(appended.roll, 0.0);
        // the handle keeps its offset from the node
        let last = spline.nodes()[1];
        assert!((appended.direction - appended.position).abs_diff_eq(last.direction - last.position, 1e-5));

        let inserted_index = spline.insert_node_after(0).unwrap();
        let inserted = spline.nodes()[inserted_index];
        assert_eq!(inserted.roll, 0.0);
        assert_eq!(inserted.scale, Vec2::ONE);
    }

    #[test]
    fn test_bounding_and_points() {
        let mut spline = straight_spline(3);
        let (min, max) = spline.bounding();
        assert!(min.abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(max.abs_diff_eq(Vec3::new(6.0, 0.0, 0.0), 1e-4));
        assert_eq!(spline.points().len(), spline.samples().count());

        // handle moves with the node, so the last curve rises monotonically
        let raised = Vec3::new(6.0, 4.0, 0.0);
        spline
            .edit_node(2, |n| {
                n.position = raised;
                n.direction = raised + Vec3::X;
            })
            .unwrap();
        let (_, max) = spline.bounding();
        assert_relative_eq!(max.y, 4.0, epsilon = 1e-4);
        assert!(spline.points().iter().all(|p| p.y <= 4.0 + 1e-4));

        // a handle left behind overshoots the node
        spline.set_node_direction(2, Vec3::new(7.0, 0.0, 0.0)).unwrap();
        let (_, max) = spline.bounding();
        assert!(max.y > 4.0);
    }
}
