//! Lifetime systems - timers, cooldown decay, death and despawning.

use crate::components::*;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;
use log::trace;

/// System that counts down despawn timers and marks expired entities.
pub fn despawn_timer_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    mut query: Query<(Entity, &mut DespawnTimer), Without<Despawn>>,
) {
    let delta = dt.0;
    for (entity, mut timer) in query.iter_mut() {
        if timer.tick(delta) {
            commands.entity(entity).insert(Despawn);
        }
    }
}

/// System that decays every pierce bullet's per-target cooldowns.
pub fn pierce_cooldown_system(dt: Res<DeltaTime>, mut query: Query<&mut PierceCooldown>) {
    let delta = dt.0;
    for mut cooldown in query.iter_mut() {
        cooldown.decay(delta);
    }
}

/// System that marks enemies with no health left for despawn. The player is
/// never despawned here; losing a life is the caller's concern.
pub fn enemy_death_system(
    mut commands: Commands,
    query: Query<(Entity, &Health), (With<Enemy>, Without<Despawn>)>,
) {
    for (entity, health) in query.iter() {
        if !health.is_alive() {
            commands.entity(entity).insert(Despawn);
        }
    }
}

/// System that removes every entity marked for despawn.
pub fn despawn_system(mut commands: Commands, query: Query<Entity, With<Despawn>>) {
    for entity in query.iter() {
        trace!("despawning {entity:?}");
        commands.entity(entity).despawn();
    }
}
