//! # bevy_spline_bend
//!
//! Cubic Bézier splines with arclength sampling, and a mesh bender that
//! deforms source meshes along them.
//!
//! ## Features
//!
//! - Chains of cubic Bézier curves with per-node up vector, scale and roll
//! - Sampling by Bézier time or by distance along the curve
//! - Loop splines, automatic smoothing
//! - Mesh bending along a curve or a spline interval, with `Once`,
//!   `Repeat` and `StretchToInterval` filling modes
//! - Lazy rebuilds: benders only recompute when their spline changes
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_spline_bend::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(SplineBendPlugin)
//!         .add_systems(Startup, setup)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
//!     let spline = commands
//!         .spawn((
//!             Spline::from_nodes(vec![
//!                 SplineNode::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)),
//!                 SplineNode::new(Vec3::new(8.0, 0.0, 4.0), Vec3::new(8.0, 0.0, 8.0)),
//!             ])
//!             .unwrap(),
//!             SplineSmoother::default(),
//!         ))
//!         .id();
//!
//!     let rail = meshes.add(Cuboid::new(1.0, 0.2, 0.5));
//!     commands.spawn(SplineMeshBender::new(spline, rail).with_mode(FillingMode::Repeat));
//! }
//! ```
//!
//! ## Plugins
//!
//! - [`SplinePlugin`]: type registration and spline smoothing (required)
//! - [`SplineMeshPlugin`]: bends meshes along spline entities
//! - [`SplineBendPlugin`]: both of the above
//!
//! ## Using the core without the ECS
//!
//! [`spline::Spline`], [`spline::CubicBezierCurve`] and
//! [`mesh::MeshBender`] are plain types; bend a mesh directly with
//! [`mesh::MeshBender::compute`] and turn the result into a Bevy mesh with
//! [`mesh::BentMesh::to_mesh`].

pub mod animation_curve;
pub mod error;
pub mod event;
pub mod geometry;
pub mod mesh;
pub mod pool;
pub mod spline;

use bevy::prelude::*;

pub use error::{ErrorKind, SplineError};
pub use mesh::SplineMeshPlugin;
pub use spline::SplinePlugin;

/// Global switches for the plugin systems.
///
/// ```ignore
/// fn freeze(mut settings: ResMut<SplineBendSettings>) {
///     settings.enabled = false; // keep the last bent meshes
/// }
/// ```
#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct SplineBendSettings {
    /// Rebuild bent meshes when their spline changes.
    pub enabled: bool,
    /// Run [`spline::SplineSmoother`]s.
    pub smoothing_enabled: bool,
}

impl Default for SplineBendSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            smoothing_enabled: true,
        }
    }
}

/// Adds every plugin of the crate.
pub struct SplineBendPlugin;

impl Plugin for SplineBendPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<SplinePlugin>() {
            app.add_plugins(SplinePlugin);
        }
        if !app.is_plugin_added::<SplineMeshPlugin>() {
            app.add_plugins(SplineMeshPlugin);
        }
        app.register_type::<SplineBendSettings>();
    }
}

/// Convenient re-exports of commonly used types.
pub mod prelude {
    pub use crate::animation_curve::{AnimationCurve, Keyframe};
    pub use crate::error::{ErrorKind, SplineError};
    pub use crate::mesh::{
        BendInterval, BendTarget, BentMesh, FillingMode, HeightAlign, MeshBender, MeshData, MeshVertex,
        SourceMesh, SplineMeshBender, SplineMeshPlugin,
    };
    pub use crate::spline::{
        CubicBezierCurve, CurveSample, CurveSampler, NodeListChange, Spline, SplineNode, SplinePlugin,
        SplineSmoother,
    };
    pub use crate::{SplineBendPlugin, SplineBendSettings};
}
