//! Collectible system - pickup activation, homing toward the player, and
//! pickup on contact.
//!
//! Two grids are rebuilt every tick: one sized to the largest collectible
//! hitbox (contact checks) and one sized to the largest activation radius
//! (proximity checks, usually much wider so items drift toward the player
//! before touching). Neither cell size drops below the default collision
//! cell.
//!
//! Activating an item swaps its path for a homing trajectory toward the
//! player and disables its despawn timer so it can't expire mid-approach.
//! An activated item touching the player is picked up.

use crate::components::*;
use crate::config::SimConfig;
use crate::path::PathDriver;
use crate::spatial::SpatialHashGrid;
use crate::trajectory::{Homing, Segment, TimeFunction};
use bevy_ecs::prelude::*;
use glam::Vec2;
use log::debug;

/// Speed an activated item launches toward the player at.
const COLLECT_INITIAL_SPEED: f32 = 600.0;
/// Speed the approach settles to.
const COLLECT_CRUISE_SPEED: f32 = 300.0;
/// Time after activation at which the cruise speed is reached.
const COLLECT_SETTLE_TIME: f32 = 0.4;
/// Homing strength of an activated item.
const COLLECT_HOMING_STRENGTH: f32 = 0.35;

/// The two collectible grids.
#[derive(Resource, Debug)]
pub struct CollectibleGrids {
    pub hitbox: SpatialHashGrid<Entity>,
    pub activation: SpatialHashGrid<Entity>,
}

impl CollectibleGrids {
    pub fn new(config: &SimConfig) -> Self {
        let cell_size = config.default_cell_size();
        Self {
            hitbox: SpatialHashGrid::new(config.map_width, config.map_height, cell_size),
            activation: SpatialHashGrid::new(config.map_width, config.map_height, cell_size),
        }
    }
}

/// An item collected by the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupEvent {
    pub collectible: Entity,
    pub player: Entity,
    pub kind: CollectibleKind,
    pub value: u32,
}

/// Pickups, accumulated until drained by the caller.
#[derive(Resource, Debug, Default)]
pub struct PickupEvents(pub Vec<PickupEvent>);

/// Two-segment approach speed: a fast launch easing down to the cruise
/// speed, then constant.
pub fn collect_speed_profile() -> TimeFunction {
    TimeFunction::Piecewise(vec![
        Segment {
            start: 0.0,
            function: TimeFunction::Decay {
                initial: COLLECT_INITIAL_SPEED,
                target: COLLECT_CRUISE_SPEED,
                settle_time: COLLECT_SETTLE_TIME,
            },
        },
        Segment {
            start: COLLECT_SETTLE_TIME,
            function: TimeFunction::Constant(COLLECT_CRUISE_SPEED),
        },
    ])
}

/// System that rebuilds both collectible grids.
pub fn collectible_grid_update_system(
    config: Res<SimConfig>,
    mut grids: ResMut<CollectibleGrids>,
    query: Query<(Entity, &Position, &Hitbox, &Collectible), Without<Despawn>>,
) {
    let CollectibleGrids { hitbox, activation } = &mut *grids;
    let min_cell = config.default_cell_size();

    let (largest_hitbox, largest_activation) = query.iter().fold(
        (0.0f32, 0.0f32),
        |(h, a), (_, _, hb, item)| (h.max(hb.radius), a.max(item.activation_radius)),
    );
    if largest_hitbox > 0.0 {
        hitbox.resize((2.0 * largest_hitbox).max(min_cell));
    }
    if largest_activation > 0.0 {
        activation.resize(largest_activation.max(min_cell));
    }

    hitbox.clear();
    activation.clear();
    for (entity, pos, hb, item) in query.iter() {
        hitbox.insert(entity, hb.offset, hb.radius, pos.0);
        activation.insert(entity, hb.offset, item.activation_radius, pos.0);
    }
}

/// System that activates and collects items near the player.
pub fn collectible_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    grids: Res<CollectibleGrids>,
    mut pickups: ResMut<PickupEvents>,
    players: Query<(Entity, &Position, &Hitbox), With<Player>>,
    mut items: Query<
        (
            Entity,
            &Position,
            &Hitbox,
            &mut Collectible,
            Option<&mut DespawnTimer>,
            Option<&mut PathDriver>,
        ),
        Without<Despawn>,
    >,
) {
    let mut collected = Vec::new();

    for (player, player_pos, player_hitbox) in players.iter() {
        let player_center = player_hitbox.center(player_pos.0);

        let mut candidates =
            grids
                .hitbox
                .nearby_objects(player_hitbox.offset, player_hitbox.radius, player_pos.0);
        grids.activation.extend_nearby(
            &mut candidates,
            player_hitbox.offset,
            player_hitbox.radius,
            player_pos.0,
        );
        candidates.sort_unstable();
        candidates.dedup();

        for candidate in candidates {
            if collected.contains(&candidate) {
                continue;
            }
            let Ok((entity, pos, hitbox, mut item, timer, driver)) = items.get_mut(candidate)
            else {
                continue;
            };

            let touching = player_hitbox.overlaps(player_pos.0, hitbox, pos.0);
            if touching && item.activated {
                pickups.0.push(PickupEvent {
                    collectible: entity,
                    player,
                    kind: item.kind,
                    value: item.value,
                });
                commands.entity(entity).insert(Despawn);
                collected.push(entity);
                continue;
            }
            if item.activated {
                continue;
            }

            let reach = item.activation_radius + player_hitbox.radius;
            let in_range = hitbox.center(pos.0).distance_squared(player_center) <= reach * reach;
            let triggered = match item.trigger {
                ActivationTrigger::Proximity => in_range || touching,
                ActivationTrigger::Contact => touching,
            };
            if !triggered {
                continue;
            }

            debug!("collectible {entity:?} activated by {player:?}");
            item.activated = true;
            if let Some(mut timer) = timer {
                timer.enabled = false;
            }
            let to_player = player_pos.0 - pos.0;
            let heading = if to_player.length_squared() > f32::EPSILON {
                to_player.y.atan2(to_player.x)
            } else {
                0.0
            };
            let homing = Homing::new(
                pos.0,
                heading,
                player,
                collect_speed_profile(),
                COLLECT_HOMING_STRENGTH,
                config.max_physics_step,
            );
            match driver {
                Some(mut driver) => driver.replace_now(homing, pos.0, 0.0),
                None => {
                    commands
                        .entity(entity)
                        .insert(PathDriver::new(homing, pos.0));
                }
            }
        }
    }
}
