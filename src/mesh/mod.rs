mod bender;
mod source;
mod systems;

pub use bender::*;
pub use source::*;
pub use systems::*;

use bevy::prelude::*;

use crate::spline::SplinePlugin;

/// Plugin that bends source meshes along spline entities.
///
/// Spawn a [`SplineMeshBender`] pointing at a [`crate::spline::Spline`]
/// entity and at a source mesh asset. The bent mesh is inserted on the same
/// entity as a [`Mesh3d`] and rebuilt whenever the spline or the bender
/// settings change.
///
/// # Source mesh layout
///
/// The source's X axis is laid along the spline. Y is the height above the
/// curve and Z its width, oriented by each sample's up vector and roll:
///
/// ```text
///        Y (up)
///        │
///        │   ┌──────────────┐
///        │   │              │
///        └───┼──────────────┼────► X (along the spline)
///           ╱
///          ╱
///         Z (width)
/// ```
///
/// Rotate the source with [`SplineMeshBender::with_source_transform`] if it
/// was authored along another axis.
///
/// # Usage
///
/// ```ignore
/// use bevy_spline_bend::prelude::*;
///
/// fn setup(mut commands: Commands, asset_server: Res<AssetServer>) {
///     let spline = commands.spawn(Spline::default()).id();
///
///     commands.spawn((
///         SplineMeshBender::new(spline, asset_server.load("rail.glb#Mesh0/Primitive0"))
///             .with_mode(FillingMode::Repeat)
///             .with_interval(BendInterval::Spline { start: 0.0, end: 0.0 }),
///         MeshMaterial3d(material),
///     ));
/// }
/// ```
pub struct SplineMeshPlugin;

impl Plugin for SplineMeshPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<SplinePlugin>() {
            app.add_plugins(SplinePlugin);
        }

        app.register_type::<FillingMode>()
            .register_type::<HeightAlign>()
            .register_type::<BendInterval>()
            .add_systems(
                Update,
                (load_bender_sources, bind_bender_intervals, update_bent_meshes)
                    .chain()
                    .after(crate::spline::smooth_splines),
            );
    }
}
