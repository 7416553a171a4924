use std::collections::hash_map::Entry;
use std::collections::HashMap;

use bevy::{
    prelude::*,
    mesh::{Indices, PrimitiveTopology},
};

use crate::animation_curve::AnimationCurve;
use crate::error::{Result, SplineError};
use crate::event::DirtyFlag;
use crate::pool::Pool;
use crate::spline::{CubicBezierCurve, CurveId, CurveSample, CurveSampler, Spline, SplineId};

use super::{MeshVertex, SourceMesh};

/// How the source mesh is laid along the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum FillingMode {
    /// Place the mesh once, at its own scale. Vertices past the end of a
    /// curve are dropped; on a spline they wrap around to its start.
    Once,
    /// Repeat the mesh at its own scale as many times as it fits, then
    /// squeeze one last copy into the remaining space.
    Repeat,
    /// Stretch the mesh along X to fill the interval exactly.
    #[default]
    StretchToInterval,
}

/// Vertical alignment applied to the source mesh before bending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum HeightAlign {
    /// Keep source heights.
    #[default]
    None,
    /// Put the bottom of the height range on the curve.
    Bottom,
    /// Put the top of the height range on the curve.
    Top,
}

/// What a bender is bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Interval {
    Curve(CurveId),
    Spline { spline: SplineId, start: f32, end: f32 },
}

/// The curve or spline handed to [`MeshBender::compute`].
#[derive(Debug, Clone, Copy)]
pub enum BendTarget<'a> {
    Curve(&'a CubicBezierCurve),
    Spline(&'a Spline),
}

impl<'a> From<&'a CubicBezierCurve> for BendTarget<'a> {
    fn from(curve: &'a CubicBezierCurve) -> Self {
        Self::Curve(curve)
    }
}

impl<'a> From<&'a Spline> for BendTarget<'a> {
    fn from(spline: &'a Spline) -> Self {
        Self::Spline(spline)
    }
}

/// Output buffers of a bend pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BentMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl BentMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.tangents.clear();
        self.uvs.clear();
        self.indices.clear();
    }

    fn push(&mut self, vertex: MeshVertex) {
        self.positions.push(vertex.position);
        self.normals.push(vertex.normal);
        self.tangents.push(vertex.tangent);
        self.uvs.push(vertex.uv);
    }

    /// Build a Bevy triangle-list mesh from the buffers.
    pub fn to_mesh(&self) -> Mesh {
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();
        let normals: Vec<[f32; 3]> = self.normals.iter().map(|n| n.to_array()).collect();
        let tangents: Vec<[f32; 4]> = self.tangents.iter().map(|t| t.to_array()).collect();
        let uvs: Vec<[f32; 2]> = self.uvs.iter().map(|uv| uv.to_array()).collect();

        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_TANGENT, tangents);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        mesh.insert_indices(Indices::U32(self.indices.clone()));

        mesh
    }
}

/// Memoization key of a bend pass. Each filling mode has its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SampleKey {
    Distance(u32),
    Tile(usize, u32),
    Rate(u32),
}

/// Deforms a [`SourceMesh`] along a curve, or along an interval of a spline.
///
/// The source's X axis is laid along the curve's arclength; Y and Z become
/// the cross-section, oriented by the curve samples. Output is cached until
/// the bender's settings change or its target reports a change; call
/// [`MeshBender::compute_if_needed`] once per tick.
#[derive(Debug)]
pub struct MeshBender {
    source: Option<SourceMesh>,
    mode: FillingMode,
    offset: f32,
    height_range: Vec2,
    height_align: HeightAlign,
    height_curve: Option<AnimationCurve>,
    interval: Option<Interval>,
    dirty: DirtyFlag,
    cache: HashMap<SampleKey, CurveSample>,
    pool: Pool<CurveSample>,
    result: BentMesh,
}

impl Default for MeshBender {
    fn default() -> Self {
        Self {
            source: None,
            mode: FillingMode::default(),
            offset: 0.0,
            height_range: Vec2::new(0.0, 1.0),
            height_align: HeightAlign::default(),
            height_curve: None,
            interval: None,
            dirty: DirtyFlag::default(),
            cache: HashMap::new(),
            pool: Pool::new(),
            result: BentMesh::default(),
        }
    }
}

impl MeshBender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source mesh.
    pub fn with_source(mut self, source: SourceMesh) -> Self {
        self.set_source(source);
        self
    }

    /// Set the filling mode.
    pub fn with_mode(mut self, mode: FillingMode) -> Self {
        self.set_mode(mode);
        self
    }

    /// Set the offset along the curve used by `Once` and `Repeat`.
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.set_offset(offset);
        self
    }

    /// Set the height range, as ratios of the source height.
    pub fn with_height_range(mut self, min: f32, max: f32) -> Result<Self> {
        self.set_height_range(min, max)?;
        Ok(self)
    }

    /// Set the height alignment.
    pub fn with_height_align(mut self, align: HeightAlign) -> Self {
        self.set_height_align(align);
        self
    }

    /// Scale bent heights by `curve`, keyed on the position along the fill.
    pub fn with_height_curve(mut self, curve: AnimationCurve) -> Self {
        self.set_height_curve(Some(curve));
        self
    }

    pub fn source(&self) -> Option<&SourceMesh> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: SourceMesh) {
        self.source = Some(source);
        self.dirty.set();
    }

    pub fn mode(&self) -> FillingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FillingMode) {
        if self.mode != mode {
            self.mode = mode;
            self.dirty.set();
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
        self.dirty.set();
    }

    pub fn height_range(&self) -> Vec2 {
        self.height_range
    }

    /// Restrict source heights to `[min, max]`, as ratios of the source's
    /// Y extent. `(0, 1)` keeps the whole mesh.
    pub fn set_height_range(&mut self, min: f32, max: f32) -> Result<()> {
        if !(min.is_finite() && max.is_finite() && min <= max) {
            return Err(SplineError::InvalidHeightRange { min, max });
        }
        self.height_range = Vec2::new(min, max);
        self.dirty.set();
        Ok(())
    }

    pub fn height_align(&self) -> HeightAlign {
        self.height_align
    }

    pub fn set_height_align(&mut self, align: HeightAlign) {
        if self.height_align != align {
            self.height_align = align;
            self.dirty.set();
        }
    }

    pub fn height_curve(&self) -> Option<&AnimationCurve> {
        self.height_curve.as_ref()
    }

    pub fn set_height_curve(&mut self, curve: Option<AnimationCurve>) {
        self.height_curve = curve;
        self.dirty.set();
    }

    /// Bend along `curve`. The bender recomputes whenever the curve changes.
    pub fn set_interval(&mut self, curve: &mut CubicBezierCurve) {
        let interval = Interval::Curve(curve.id());
        if self.interval == Some(interval) {
            return;
        }
        self.dirty.detach();
        self.dirty.subscribe(&mut curve.changed);
        self.interval = Some(interval);
        self.dirty.set();
    }

    /// Bend along the part of `spline` between `start` and `end`.
    ///
    /// An `end` of 0 means the end of the spline. The bender recomputes
    /// whenever any curve of the spline changes.
    pub fn set_interval_on_spline(&mut self, spline: &mut Spline, start: f32, end: f32) -> Result<()> {
        let length = spline.length();
        if !(0.0..length).contains(&start) {
            return Err(SplineError::InvalidIntervalStart { start, length });
        }
        if end.is_nan() || (end != 0.0 && end <= start) || end > length {
            return Err(SplineError::InvalidIntervalEnd { start, end, length });
        }

        let interval = Interval::Spline {
            spline: spline.id(),
            start,
            end,
        };
        if self.interval == Some(interval) {
            return Ok(());
        }
        self.dirty.detach();
        self.dirty.subscribe(&mut spline.curve_changed);
        self.interval = Some(interval);
        self.dirty.set();
        Ok(())
    }

    /// Whether the next [`MeshBender::compute_if_needed`] will rebuild.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_set()
    }

    /// Force a rebuild on the next [`MeshBender::compute_if_needed`].
    pub fn set_dirty(&mut self) {
        self.dirty.set();
    }

    /// The last computed mesh.
    pub fn mesh(&self) -> &BentMesh {
        &self.result
    }

    /// Rebuild if anything changed since the last pass.
    ///
    /// Returns the new mesh, or `None` when nothing needed rebuilding.
    pub fn compute_if_needed<'t>(&mut self, target: impl Into<BendTarget<'t>>) -> Result<Option<&BentMesh>> {
        if !self.dirty.is_set() {
            return Ok(None);
        }
        self.compute(target).map(Some)
    }

    /// Bend the source mesh along `target`.
    ///
    /// `target` must be what the interval was set on: the curve itself (or
    /// the spline holding it) for a curve interval, the spline for a spline
    /// interval.
    pub fn compute<'t>(&mut self, target: impl Into<BendTarget<'t>>) -> Result<&BentMesh> {
        self.dirty.take();
        self.result.clear();

        let target = self.resolve(target.into())?;
        let source = self.source.as_ref().ok_or(SplineError::MissingSource)?;

        let mut pass = BendPass {
            target,
            layering: Layering::new(source, self.height_range, self.height_align, self.height_curve.as_ref()),
            cache: &mut self.cache,
            pool: &mut self.pool,
            out: &mut self.result,
        };
        let outcome = match self.mode {
            FillingMode::Once => pass.fill_once(source, self.offset),
            FillingMode::Repeat => pass.fill_repeat(source, self.offset),
            FillingMode::StretchToInterval => pass.fill_stretch(source),
        };
        self.pool.put_all(self.cache.drain().map(|(_, sample)| sample));

        if let Err(err) = outcome {
            self.result.clear();
            return Err(err);
        }
        debug!(
            "bent {} vertices ({:?}, {} triangles)",
            self.result.vertex_count(),
            self.mode,
            self.result.indices.len() / 3
        );
        Ok(&self.result)
    }

    fn resolve<'t>(&self, target: BendTarget<'t>) -> Result<Resolved<'t>> {
        let interval = self.interval.ok_or(SplineError::MissingInterval)?;
        match (interval, target) {
            (Interval::Curve(id), BendTarget::Curve(curve)) if curve.id() == id => Ok(Resolved::Curve(curve)),
            (Interval::Curve(id), BendTarget::Spline(spline)) => spline
                .curve_by_id(id)
                .map(Resolved::Curve)
                .ok_or(SplineError::CurveNotFound(id.get())),
            (Interval::Spline { spline: id, start, end }, BendTarget::Spline(spline)) if spline.id() == id => {
                Ok(Resolved::Spline { spline, start, end })
            }
            _ => Err(SplineError::TargetMismatch),
        }
    }
}

/// A bend target checked against the bender's interval.
#[derive(Debug, Clone, Copy)]
enum Resolved<'t> {
    Curve(&'t CubicBezierCurve),
    Spline { spline: &'t Spline, start: f32, end: f32 },
}

impl Resolved<'_> {
    fn interval_length(&self) -> f32 {
        match *self {
            Self::Curve(curve) => curve.length(),
            Self::Spline { spline, start, end } => {
                let end = if end == 0.0 { spline.length() } else { end };
                (end - start).max(0.0)
            }
        }
    }

    /// Where a `Once` vertex lands, or `None` when it falls past the end of
    /// a curve. Negative distances are kept and fail when sampled.
    fn once_distance(&self, distance: f32) -> Option<f32> {
        match *self {
            Self::Curve(curve) => (distance <= curve.length()).then_some(distance),
            Self::Spline { spline, start, .. } => Some(wrap(start + distance, spline.length())),
        }
    }

    /// Where a `Repeat` vertex lands. On a curve, only float drift past the
    /// end is absorbed; anything further fails when sampled.
    fn repeat_distance(&self, distance: f32) -> f32 {
        match *self {
            Self::Curve(curve) => {
                let length = curve.length();
                if distance > length && distance <= length + length_tolerance(length) {
                    length
                } else {
                    distance
                }
            }
            Self::Spline { spline, start, .. } => wrap(start + distance, spline.length()),
        }
    }

    /// Where a `StretchToInterval` vertex at `rate` along the source lands.
    fn stretch_distance(&self, rate: f32) -> f32 {
        match *self {
            Self::Curve(curve) => (curve.length() * rate).min(curve.length()),
            Self::Spline { spline, start, .. } => {
                let distance = start + self.interval_length() * rate;
                if distance > spline.length() {
                    debug!(
                        "distance {distance} past spline length {} (interval start {start})",
                        spline.length()
                    );
                    spline.length()
                } else {
                    distance
                }
            }
        }
    }

    fn sample_into(&self, distance: f32, out: &mut CurveSample) -> Result<()> {
        match self {
            Self::Curve(curve) => curve.sample_at_distance_into(distance, out),
            Self::Spline { spline, .. } => spline.sample_at_distance_into(distance, out),
        }
    }
}

/// Accumulated float error allowed past the end of a curve of `length`.
fn length_tolerance(length: f32) -> f32 {
    1e-4 + length * 1e-5
}

/// Wrap `distance` into `(0, length]`, keeping 0 at 0.
fn wrap(distance: f32, length: f32) -> f32 {
    if length <= 0.0 {
        return 0.0;
    }
    if (0.0..=length).contains(&distance) {
        return distance;
    }
    let wrapped = distance.rem_euclid(length);
    if wrapped == 0.0 && distance > 0.0 {
        length
    } else {
        wrapped
    }
}

/// Position of `vertex` along the source, in `[0, 1]`.
fn distance_rate(vertex: &MeshVertex, source: &SourceMesh) -> f32 {
    if source.length() == 0.0 {
        0.0
    } else {
        (vertex.position.x - source.min_x()).abs() / source.length()
    }
}

fn fill_ratio(distance: f32, interval_length: f32) -> f32 {
    if interval_length > 0.0 {
        (distance / interval_length).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Height clamp and alignment applied before bending, height curve after.
struct Layering<'a> {
    y_low: f32,
    y_high: f32,
    align_offset: f32,
    height_curve: Option<&'a AnimationCurve>,
}

impl<'a> Layering<'a> {
    fn new(source: &SourceMesh, range: Vec2, align: HeightAlign, height_curve: Option<&'a AnimationCurve>) -> Self {
        let y_low = source.min_y() + range.x * source.length_y();
        let y_high = source.min_y() + range.y * source.length_y();
        let align_offset = match align {
            HeightAlign::None => 0.0,
            HeightAlign::Bottom => -y_low,
            HeightAlign::Top => -y_high,
        };
        Self {
            y_low,
            y_high,
            align_offset,
            height_curve,
        }
    }

    fn prepare(&self, vertex: &MeshVertex) -> MeshVertex {
        let mut vertex = *vertex;
        vertex.position.y = vertex.position.y.max(self.y_low).min(self.y_high) + self.align_offset;
        vertex
    }

    fn scale_height(&self, vertex: &mut MeshVertex, sample: &CurveSample, ratio: f32) {
        let Some(curve) = self.height_curve else {
            return;
        };
        let up = sample.bent_rotation() * Vec3::Y;
        let height = (vertex.position - sample.location()).dot(up);
        vertex.position += up * height * (curve.evaluate(ratio) - 1.0);
    }
}

/// State of one `compute` call.
struct BendPass<'a, 't> {
    target: Resolved<'t>,
    layering: Layering<'a>,
    cache: &'a mut HashMap<SampleKey, CurveSample>,
    pool: &'a mut Pool<CurveSample>,
    out: &'a mut BentMesh,
}

impl BendPass<'_, '_> {
    /// Bend one vertex with the (memoized) sample at `distance` and append it.
    fn emit(&mut self, vertex: &MeshVertex, key: SampleKey, distance: f32, ratio: f32) -> Result<()> {
        let sample = match self.cache.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut sample = self.pool.get();
                if let Err(err) = self.target.sample_into(distance, &mut sample) {
                    self.pool.put(sample);
                    return Err(err);
                }
                entry.insert(sample)
            }
        };

        let mut bent = sample.bend(&self.layering.prepare(vertex));
        self.layering.scale_height(&mut bent, sample, ratio);
        self.out.push(bent);
        Ok(())
    }

    fn fill_once(&mut self, source: &SourceMesh, offset: f32) -> Result<()> {
        let interval_length = self.target.interval_length();
        let mut remap: Vec<Option<u32>> = Vec::with_capacity(source.vertices().len());

        for vertex in source.vertices() {
            let distance = vertex.position.x - source.min_x() + offset;
            let Some(on_target) = self.target.once_distance(distance) else {
                remap.push(None);
                continue;
            };
            remap.push(Some(self.out.vertex_count() as u32));
            let ratio = fill_ratio(distance, interval_length);
            self.emit(vertex, SampleKey::Distance(distance.to_bits()), on_target, ratio)?;
        }

        if remap.iter().all(Option::is_some) {
            self.out.indices.extend_from_slice(source.triangles());
            return Ok(());
        }

        // vertices past the end of the curve are gone, and so are their faces
        for triangle in source.triangles().chunks_exact(3) {
            let mapped: Option<Vec<u32>> = triangle
                .iter()
                .map(|&i| remap.get(i as usize).copied().flatten())
                .collect();
            if let Some(mapped) = mapped {
                self.out.indices.extend(mapped);
            }
        }
        Ok(())
    }

    fn fill_repeat(&mut self, source: &SourceMesh, offset: f32) -> Result<()> {
        let interval_length = self.target.interval_length();
        // full tiles that fit between the offset and the end of the interval
        let repetition_count = if source.length() > 0.0 {
            ((interval_length - offset).max(0.0) / source.length()).floor() as usize
        } else {
            0
        };

        let vertex_count = source.vertices().len() as u32;
        for i in 0..=repetition_count as u32 {
            self.out
                .indices
                .extend(source.triangles().iter().map(|&t| t + vertex_count * i));
        }

        let mut tile_offset = offset;
        for i in 0..repetition_count {
            for vertex in source.vertices() {
                let distance = vertex.position.x - source.min_x() + tile_offset;
                let on_target = self.target.repeat_distance(distance);
                let ratio = fill_ratio(distance, interval_length);
                self.emit(vertex, SampleKey::Tile(i, distance.to_bits()), on_target, ratio)?;
            }
            tile_offset += source.length();
        }

        // one last copy squeezed into what is left
        let remaining = (interval_length - tile_offset).max(0.0);
        for vertex in source.vertices() {
            let distance = tile_offset + distance_rate(vertex, source) * remaining;
            let on_target = self.target.repeat_distance(distance);
            let ratio = fill_ratio(distance, interval_length);
            self.emit(vertex, SampleKey::Tile(repetition_count, distance.to_bits()), on_target, ratio)?;
        }
        Ok(())
    }

    fn fill_stretch(&mut self, source: &SourceMesh) -> Result<()> {
        for vertex in source.vertices() {
            let rate = distance_rate(vertex, source);
            let on_target = self.target.stretch_distance(rate);
            self.emit(vertex, SampleKey::Rate(rate.to_bits()), on_target, rate)?;
        }
        self.out.indices.extend_from_slice(source.triangles());
        Ok(())
    }
}
