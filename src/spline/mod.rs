mod components;
mod curve;
mod node;
mod sample;
mod smoother;
mod types;

pub use components::*;
pub use curve::*;
pub use node::*;
pub use sample::*;
pub use smoother::*;
pub use types::*;

use bevy::prelude::*;

use crate::SplineBendSettings;

/// Plugin that registers spline types for reflection and keeps smoothed
/// splines up to date.
pub struct SplinePlugin;

impl Plugin for SplinePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SplineBendSettings>()
            .register_type::<SplineNode>()
            .register_type::<CurveId>()
            .register_type::<SplineId>()
            .register_type::<SplineSmoother>()
            .add_systems(Update, smooth_splines);
    }
}

/// Re-smooth splines whose nodes moved, or whose smoother was just added or
/// tweaked.
pub fn smooth_splines(
    settings: Res<SplineBendSettings>,
    mut splines: Query<(Entity, &mut Spline, Ref<SplineSmoother>)>,
) {
    if !settings.smoothing_enabled {
        return;
    }

    for (entity, mut spline, smoother) in &mut splines {
        if !spline.is_changed() && !smoother.is_changed() {
            continue;
        }

        // smoothing edits the spline itself; don't let that trigger another pass
        if let Err(err) = smooth_all(spline.bypass_change_detection(), smoother.curvature) {
            warn!("failed to smooth spline {entity}: {err}");
        }
    }
}
