use bevy::prelude::*;

use crate::animation_curve::AnimationCurve;
use crate::error::Result;
use crate::event::DirtyFlag;
use crate::spline::Spline;
use crate::SplineBendSettings;

use super::{FillingMode, HeightAlign, MeshBender, MeshData, SourceMesh};

/// The part of a spline a [`SplineMeshBender`] follows.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum BendInterval {
    /// A single curve, by index along the spline.
    Curve(usize),
    /// A distance range; an `end` of 0 means the end of the spline.
    Spline { start: f32, end: f32 },
}

impl Default for BendInterval {
    fn default() -> Self {
        Self::Spline { start: 0.0, end: 0.0 }
    }
}

/// Bends a source mesh along a spline entity.
#[derive(Component, Debug)]
pub struct SplineMeshBender {
    /// The spline entity to follow.
    pub spline: Entity,
    /// The mesh to bend.
    pub source_mesh: Handle<Mesh>,
    /// Applied to the source mesh before bending.
    pub source_transform: Transform,
    pub interval: BendInterval,
    bender: MeshBender,
    loaded: Option<(AssetId<Mesh>, Transform)>,
    bound: Option<(Entity, BendInterval)>,
    /// Raised when the bound spline's node list changes.
    nodes_changed: DirtyFlag,
}

impl SplineMeshBender {
    pub fn new(spline: Entity, source_mesh: Handle<Mesh>) -> Self {
        Self {
            spline,
            source_mesh,
            source_transform: Transform::IDENTITY,
            interval: BendInterval::default(),
            bender: MeshBender::new(),
            loaded: None,
            bound: None,
            nodes_changed: DirtyFlag::new(false),
        }
    }

    /// Set the followed interval.
    pub fn with_interval(mut self, interval: BendInterval) -> Self {
        self.interval = interval;
        self
    }

    /// Transform the source before bending.
    pub fn with_source_transform(mut self, transform: Transform) -> Self {
        self.source_transform = transform;
        self
    }

    /// Set the filling mode.
    pub fn with_mode(mut self, mode: FillingMode) -> Self {
        self.bender.set_mode(mode);
        self
    }

    /// Set the offset along the interval.
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.bender.set_offset(offset);
        self
    }

    /// Keep only the source heights in `[min, max]`, as ratios of its height.
    pub fn with_height_range(mut self, min: f32, max: f32) -> Result<Self> {
        self.bender.set_height_range(min, max)?;
        Ok(self)
    }

    pub fn with_height_align(mut self, align: HeightAlign) -> Self {
        self.bender.set_height_align(align);
        self
    }

    pub fn with_height_curve(mut self, curve: AnimationCurve) -> Self {
        self.bender.set_height_curve(Some(curve));
        self
    }

    pub fn bender(&self) -> &MeshBender {
        &self.bender
    }

    /// Mutable access to the bender. Setters mark it for a rebuild.
    pub fn bender_mut(&mut self) -> &mut MeshBender {
        &mut self.bender
    }
}

/// Read source mesh assets into their benders once they are loaded.
pub fn load_bender_sources(meshes: Res<Assets<Mesh>>, mut benders: Query<(Entity, &mut SplineMeshBender)>) {
    for (entity, mut bender) in &mut benders {
        let id = bender.source_mesh.id();
        let transform = bender.source_transform;
        if bender.loaded == Some((id, transform)) {
            continue;
        }

        let Some(mesh) = meshes.get(id) else {
            continue;
        };
        let Some(data) = MeshData::from_mesh(mesh) else {
            warn!("source mesh of bender {entity} has no Float32x3 positions");
            continue;
        };

        let source = SourceMesh::new(data)
            .rotate(transform.rotation)
            .scale_res(transform.scale)
            .translate(transform.translation);
        bender.bender.set_source(source);
        bender.loaded = Some((id, transform));
    }
}

/// Subscribe benders to their spline, or rebind them when their interval,
/// their spline or the spline's node list changed.
///
/// Curves are addressed by index, so nodes added, inserted, removed or
/// replaced can move a bender onto another curve.
pub fn bind_bender_intervals(
    mut benders: Query<(Entity, &mut SplineMeshBender)>,
    mut splines: Query<&mut Spline>,
) {
    for (entity, mut bender) in &mut benders {
        let bender = &mut *bender;
        let binding = (bender.spline, bender.interval);
        if bender.bound == Some(binding) && !bender.nodes_changed.take() {
            continue;
        }

        let Ok(mut spline) = splines.get_mut(bender.spline) else {
            continue;
        };
        // subscribing does not change the spline's shape
        let spline = spline.bypass_change_detection();

        bender.nodes_changed.detach();
        bender.nodes_changed.take();
        bender.nodes_changed.subscribe(&mut spline.node_list_changed);

        let bound = match binding.1 {
            BendInterval::Curve(index) => match spline.curve_mut(index) {
                Some(curve) => {
                    bender.bender.set_interval(curve);
                    true
                }
                None => {
                    warn!("bender {entity}: spline has no curve {index}");
                    false
                }
            },
            BendInterval::Spline { start, end } => match bender.bender.set_interval_on_spline(spline, start, end) {
                Ok(()) => true,
                Err(err) => {
                    warn!("bender {entity}: {err}");
                    false
                }
            },
        };
        // a failed binding is retried only after the interval or spline changes
        bender.bound = Some(binding);
        if bound {
            debug!("bender {entity} bound to {:?}", binding.1);
        }
    }
}

/// Rebuild the meshes of benders whose spline or settings changed.
pub fn update_bent_meshes(
    mut commands: Commands,
    settings: Res<SplineBendSettings>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut benders: Query<(Entity, &mut SplineMeshBender)>,
    splines: Query<&Spline>,
) {
    if !settings.enabled {
        return;
    }

    for (entity, mut bender) in &mut benders {
        if bender.loaded.is_none() {
            continue;
        }
        let Ok(spline) = splines.get(bender.spline) else {
            continue;
        };

        let bent = match bender.bender.compute_if_needed(spline) {
            Ok(Some(bent)) => bent,
            Ok(None) => continue,
            Err(err) => {
                warn!("failed to bend mesh for {entity}: {err}");
                continue;
            }
        };

        let handle = meshes.add(bent.to_mesh());
        commands.entity(entity).insert(Mesh3d(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::source::tests::strip;
    use crate::spline::SplineNode;
    use crate::SplineBendPlugin;
    use bevy::mesh::{Indices, PrimitiveTopology};

    fn strip_mesh() -> Mesh {
        let data = strip(2.0, 2);
        let positions: Vec<[f32; 3]> = data.positions.iter().map(|p| p.to_array()).collect();
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_indices(Indices::U32(data.indices));
        mesh
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Mesh>()
            .add_plugins(SplineBendPlugin);
        app
    }

    #[test]
    fn test_bent_mesh_follows_spline() {
        let mut app = app();
        let source = app.world_mut().resource_mut::<Assets<Mesh>>().add(strip_mesh());
        let spline = app.world_mut().spawn(Spline::default()).id();
        let bender = app
            .world_mut()
            .spawn(SplineMeshBender::new(spline, source).with_mode(FillingMode::StretchToInterval))
            .id();

        app.update();
        let first = app.world().get::<Mesh3d>(bender).map(|m| m.0.id());
        assert!(first.is_some());

        // no change, no rebuild
        app.update();
        assert_eq!(app.world().get::<Mesh3d>(bender).map(|m| m.0.id()), first);

        app.world_mut()
            .get_mut::<Spline>(spline)
            .unwrap()
            .set_node(1, SplineNode::new(Vec3::new(10.0, 2.0, 0.0), Vec3::new(10.0, 2.0, 3.0)))
            .unwrap();
        app.update();
        assert_ne!(app.world().get::<Mesh3d>(bender).map(|m| m.0.id()), first);
    }

    #[test]
    fn test_curve_bender_rebinds_after_node_reset() {
        let mut app = app();
        let source = app.world_mut().resource_mut::<Assets<Mesh>>().add(strip_mesh());
        let spline = app.world_mut().spawn(Spline::default()).id();
        let bender = app
            .world_mut()
            .spawn(SplineMeshBender::new(spline, source).with_interval(BendInterval::Curve(0)))
            .id();

        app.update();
        let first = app.world().get::<Mesh3d>(bender).map(|m| m.0.id());
        assert!(first.is_some());

        // every curve is rebuilt with a new id
        app.world_mut()
            .get_mut::<Spline>(spline)
            .unwrap()
            .set_nodes(vec![
                SplineNode::new(Vec3::ZERO, Vec3::X),
                SplineNode::new(Vec3::new(0.0, 0.0, 6.0), Vec3::new(1.0, 0.0, 6.0)),
            ])
            .unwrap();
        app.update();

        let second = app.world().get::<Mesh3d>(bender).map(|m| m.0.id());
        assert!(second.is_some());
        assert_ne!(second, first);
        let world = app.world();
        let bent = world.get::<SplineMeshBender>(bender).unwrap().bender().mesh();
        assert!(bent.positions.iter().any(|p| p.z > 3.0));
    }

    #[test]
    fn test_disabled_settings_skip_bending() {
        let mut app = app();
        app.world_mut().resource_mut::<SplineBendSettings>().enabled = false;
        let source = app.world_mut().resource_mut::<Assets<Mesh>>().add(strip_mesh());
        let spline = app.world_mut().spawn(Spline::default()).id();
        let bender = app.world_mut().spawn(SplineMeshBender::new(spline, source)).id();

        app.update();
        assert!(app.world().get::<Mesh3d>(bender).is_none());
    }

    #[test]
    fn test_missing_curve_is_skipped() {
        let mut app = app();
        let source = app.world_mut().resource_mut::<Assets<Mesh>>().add(strip_mesh());
        let spline = app.world_mut().spawn(Spline::default()).id();
        let bender = app
            .world_mut()
            .spawn(SplineMeshBender::new(spline, source).with_interval(BendInterval::Curve(4)))
            .id();

        app.update();
        assert!(app.world().get::<Mesh3d>(bender).is_none());
    }
}
