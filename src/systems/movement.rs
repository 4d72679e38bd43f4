//! Movement system - advances every path driver and writes positions.

use crate::components::*;
use crate::path::PathDriver;
use crate::registry::PositionSnapshot;
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// System that advances trajectories.
///
/// Anchored and homing paths read other entities through the start-of-tick
/// [`PositionSnapshot`], so update order within the tick doesn't matter.
pub fn path_system(
    dt: Res<DeltaTime>,
    registry: Res<PositionSnapshot>,
    mut query: Query<(&mut PathDriver, &mut Position), Without<Despawn>>,
) {
    let delta = dt.0;
    for (mut driver, mut pos) in query.iter_mut() {
        pos.0 = driver.advance(delta, &*registry);
    }
}
