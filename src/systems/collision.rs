//! Collision system - bullets against the player and enemies.
//!
//! ## Broad Phase
//!
//! Two grids are rebuilt every tick:
//! - **default** - cells sized to a fraction of the larger map dimension.
//!   Anything whose hitbox fits in one cell goes here; cheap for the many
//!   small bullets.
//! - **large** - cells twice the largest player/enemy hitbox radius, never
//!   smaller than a default cell (tiny hitboxes would otherwise blow up the
//!   bucket count). Oversized hitboxes go here, and the player and every
//!   enemy are always inserted here as well, so no bullet can miss them
//!   because of a cell-size mismatch.
//!
//! Each bullet queries both grids and de-duplicates the candidates.
//!
//! ## Narrow Phase
//!
//! Exact circle-circle test: `distance(centres) <= r1 + r2`.
//!
//! ## Gather / Apply
//!
//! Finding contacts only reads positions and the grids, so it can run in
//! parallel (`--features parallel`). Applying them - damage, pierce
//! cooldowns, despawns - runs sequentially in bullet order.
//!
//! ## Pairing
//!
//! Player bullets hit enemies, enemy bullets hit the player. Nothing else
//! collides here; pickups are handled by the collectible system.

use crate::components::*;
use crate::config::SimConfig;
use crate::spatial::SpatialHashGrid;
use bevy_ecs::prelude::*;
use glam::Vec2;
use log::trace;
use std::collections::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The two collision grids.
#[derive(Resource, Debug)]
pub struct CollisionGrids {
    pub default: SpatialHashGrid<Entity>,
    pub large: SpatialHashGrid<Entity>,
}

impl CollisionGrids {
    pub fn new(config: &SimConfig) -> Self {
        let cell_size = config.default_cell_size();
        Self {
            default: SpatialHashGrid::new(config.map_width, config.map_height, cell_size),
            large: SpatialHashGrid::new(config.map_width, config.map_height, cell_size),
        }
    }
}

/// One applied hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub bullet: Entity,
    pub target: Entity,
    pub attack_id: u32,
    pub attack_pattern_id: u32,
    pub source: Option<Entity>,
    pub amount: f32,
}

/// Hits and bullet despawns, accumulated until drained by the caller.
#[derive(Resource, Debug, Default)]
pub struct CollisionEvents {
    pub damage: Vec<DamageEvent>,
    pub despawned: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy)]
struct TargetData {
    position: Vec2,
    hitbox: Hitbox,
    side: Side,
}

/// Bullet data extracted for the gather phase.
#[derive(Debug, Clone, Copy)]
struct Shot {
    bullet: Entity,
    position: Vec2,
    hitbox: Hitbox,
    hits: Side,
}

/// System that rebuilds both collision grids from current positions.
pub fn collision_grid_update_system(
    mut grids: ResMut<CollisionGrids>,
    query: Query<
        (Entity, &Position, &Hitbox, Has<Player>, Has<Enemy>),
        (Without<Collectible>, Without<Despawn>),
    >,
) {
    let CollisionGrids { default, large } = &mut *grids;
    let default_cell = default.cell_size();

    let largest = query
        .iter()
        .filter(|(_, _, _, is_player, is_enemy)| *is_player || *is_enemy)
        .map(|(_, _, hitbox, _, _)| hitbox.radius)
        .fold(0.0f32, f32::max);
    if largest > 0.0 {
        large.resize((2.0 * largest).max(default_cell));
    }

    default.clear();
    large.clear();
    for (entity, pos, hitbox, is_player, is_enemy) in query.iter() {
        let fits_default = hitbox.radius * 2.0 <= default_cell;
        if fits_default {
            default.insert(entity, hitbox.offset, hitbox.radius, pos.0);
        }
        if !fits_default || is_player || is_enemy {
            large.insert(entity, hitbox.offset, hitbox.radius, pos.0);
        }
    }
}

/// System that resolves bullet hits.
///
/// ## Data Access
/// - Reads: CollisionGrids, Position, Hitbox, Bullet, AttachedEntities
/// - Writes: Health, PierceCooldown, CollisionEvents; inserts Despawn
pub fn collision_system(
    mut commands: Commands,
    grids: Res<CollisionGrids>,
    mut events: ResMut<CollisionEvents>,
    mut bullets: Query<
        (
            Entity,
            &Position,
            &Hitbox,
            &Bullet,
            Has<PlayerBullet>,
            Has<EnemyBullet>,
            Option<&mut PierceCooldown>,
            Option<&AttachedEntities>,
        ),
        Without<Despawn>,
    >,
    targets: Query<
        (Entity, &Position, &Hitbox, Has<Player>),
        (Or<(With<Player>, With<Enemy>)>, Without<Despawn>),
    >,
    mut healths: Query<&mut Health>,
) {
    // GATHER PHASE: read-only contact search.
    let grids = &*grids;
    let target_data: HashMap<Entity, TargetData> = targets
        .iter()
        .map(|(entity, pos, hitbox, is_player)| {
            let side = if is_player { Side::Player } else { Side::Enemy };
            (
                entity,
                TargetData {
                    position: pos.0,
                    hitbox: *hitbox,
                    side,
                },
            )
        })
        .collect();

    let shots: Vec<Shot> = bullets
        .iter()
        .filter_map(|(entity, pos, hitbox, _, is_player_bullet, is_enemy_bullet, _, _)| {
            let hits = if is_player_bullet {
                Side::Enemy
            } else if is_enemy_bullet {
                Side::Player
            } else {
                return None;
            };
            if hitbox.disabled {
                return None;
            }
            Some(Shot {
                bullet: entity,
                position: pos.0,
                hitbox: *hitbox,
                hits,
            })
        })
        .collect();

    #[cfg(feature = "parallel")]
    let contacts: Vec<Vec<Entity>> = shots
        .par_iter()
        .map(|shot| find_contacts(shot, grids, &target_data))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let contacts: Vec<Vec<Entity>> = shots
        .iter()
        .map(|shot| find_contacts(shot, grids, &target_data))
        .collect();

    // APPLY PHASE: sequential, in bullet order.
    // Bullets destroyed earlier in this pass (directly or as attachments)
    // take no further part this tick.
    let mut destroyed: HashSet<Entity> = HashSet::new();
    for (shot, hits) in shots.iter().zip(contacts) {
        if hits.is_empty() || destroyed.contains(&shot.bullet) {
            continue;
        }
        let Ok((_, _, _, bullet, _, _, mut cooldown, attached)) = bullets.get_mut(shot.bullet)
        else {
            continue;
        };
        let bullet = *bullet;
        let mut fresh_cooldown: Option<PierceCooldown> = None;

        for target in hits {
            if let OnCollision::Pierce { .. } = bullet.on_collision {
                let cooling = cooldown.as_deref().is_some_and(|c| c.is_cooling(target))
                    || fresh_cooldown.as_ref().is_some_and(|c| c.is_cooling(target));
                if cooling {
                    continue;
                }
            }

            if let Ok(mut health) = healths.get_mut(target) {
                health.damage(bullet.damage);
            }
            trace!("{:?} hit {target:?} for {}", shot.bullet, bullet.damage);
            events.damage.push(DamageEvent {
                bullet: shot.bullet,
                target,
                attack_id: bullet.attack_id,
                attack_pattern_id: bullet.attack_pattern_id,
                source: bullet.source,
                amount: bullet.damage,
            });

            match bullet.on_collision {
                OnCollision::Pierce { reset_time } => match cooldown.as_deref_mut() {
                    Some(c) => c.register(target, reset_time),
                    None => fresh_cooldown
                        .get_or_insert_with(PierceCooldown::default)
                        .register(target, reset_time),
                },
                OnCollision::DestroySelf => {
                    commands.entity(shot.bullet).insert(Despawn);
                    destroyed.insert(shot.bullet);
                    events.despawned.push(shot.bullet);
                    break;
                }
                OnCollision::DestroyWithChildren => {
                    commands.entity(shot.bullet).insert(Despawn);
                    destroyed.insert(shot.bullet);
                    events.despawned.push(shot.bullet);
                    for child in attached.map(|a| a.0.as_slice()).unwrap_or_default() {
                        if destroyed.contains(child) {
                            continue;
                        }
                        if let Some(mut child_commands) = commands.get_entity(*child) {
                            child_commands.try_insert(Despawn);
                            destroyed.insert(*child);
                            events.despawned.push(*child);
                        }
                    }
                    break;
                }
            }
        }

        if let Some(new_cooldown) = fresh_cooldown {
            commands.entity(shot.bullet).insert(new_cooldown);
        }
    }
}

/// Valid targets touching `shot`, in entity order. Pure; safe to call in
/// parallel.
fn find_contacts(
    shot: &Shot,
    grids: &CollisionGrids,
    targets: &HashMap<Entity, TargetData>,
) -> Vec<Entity> {
    let mut candidates = grids.default.nearby_objects(
        shot.hitbox.offset,
        shot.hitbox.radius,
        shot.position,
    );
    grids.large.extend_nearby(
        &mut candidates,
        shot.hitbox.offset,
        shot.hitbox.radius,
        shot.position,
    );
    candidates.sort_unstable();
    candidates.dedup();
    candidates.retain(|candidate| {
        targets.get(candidate).is_some_and(|target| {
            target.side == shot.hits
                && !target.hitbox.disabled
                && shot
                    .hitbox
                    .overlaps(shot.position, &target.hitbox, target.position)
        })
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::lifetime::{despawn_system, pierce_cooldown_system};
    use crate::systems::movement::DeltaTime;

    fn collision_world() -> World {
        let mut world = World::new();
        let config = SimConfig {
            map_width: 200.0,
            map_height: 200.0,
            default_grid_divisions: 20,
            ..Default::default()
        };
        world.insert_resource(CollisionGrids::new(&config));
        world.insert_resource(CollisionEvents::default());
        world.insert_resource(DeltaTime(0.2));
        world.insert_resource(config);
        world
    }

    fn collision_schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                pierce_cooldown_system,
                collision_grid_update_system,
                collision_system,
                despawn_system,
            )
                .chain(),
        );
        schedule
    }

    fn bullet(damage: f32, on_collision: OnCollision) -> Bullet {
        Bullet {
            attack_id: 3,
            attack_pattern_id: 9,
            source: None,
            damage,
            on_collision,
        }
    }

    #[test]
    fn test_enemy_bullet_hits_player_once() {
        let mut world = collision_world();
        let player = world
            .spawn((Player, Position::new(100.0, 100.0), Hitbox::new(3.0), Health::new(100.0)))
            .id();
        let shot = world
            .spawn((
                EnemyBullet,
                Position::new(104.0, 100.0),
                Hitbox::new(2.0),
                bullet(10.0, OnCollision::DestroySelf),
            ))
            .id();

        collision_schedule().run(&mut world);

        let events = world.resource::<CollisionEvents>();
        assert_eq!(events.damage.len(), 1);
        assert_eq!(events.damage[0].amount, 10.0);
        assert_eq!(events.damage[0].target, player);
        assert_eq!(events.damage[0].attack_id, 3);
        assert_eq!(events.despawned, vec![shot]);

        assert!(world.get::<Bullet>(shot).is_none());
        assert_eq!(world.get::<Health>(player).unwrap().current, 90.0);
    }

    #[test]
    fn test_bullets_ignore_their_own_side() {
        let mut world = collision_world();
        world.spawn((Player, Position::new(50.0, 50.0), Hitbox::new(3.0), Health::new(100.0)));
        world.spawn((Enemy, Position::new(150.0, 150.0), Hitbox::new(10.0), Health::new(100.0)));
        let friendly = world
            .spawn((
                PlayerBullet,
                Position::new(50.0, 50.0),
                Hitbox::new(2.0),
                bullet(5.0, OnCollision::DestroySelf),
            ))
            .id();
        let hostile = world
            .spawn((
                EnemyBullet,
                Position::new(150.0, 150.0),
                Hitbox::new(2.0),
                bullet(5.0, OnCollision::DestroySelf),
            ))
            .id();

        collision_schedule().run(&mut world);

        assert!(world.resource::<CollisionEvents>().damage.is_empty());
        assert!(world.get::<Bullet>(friendly).is_some());
        assert!(world.get::<Bullet>(hostile).is_some());
    }

    #[test]
    fn test_disabled_hitbox_is_skipped() {
        let mut world = collision_world();
        let mut hitbox = Hitbox::new(3.0);
        hitbox.disabled = true;
        world.spawn((Player, Position::new(100.0, 100.0), hitbox, Health::new(100.0)));
        world.spawn((
            EnemyBullet,
            Position::new(100.0, 100.0),
            Hitbox::new(2.0),
            bullet(10.0, OnCollision::DestroySelf),
        ));

        collision_schedule().run(&mut world);
        assert!(world.resource::<CollisionEvents>().damage.is_empty());
    }

    #[test]
    fn test_pierce_respects_cooldown() {
        let mut world = collision_world();
        let enemy = world
            .spawn((Enemy, Position::new(100.0, 100.0), Hitbox::new(8.0), Health::new(100.0)))
            .id();
        let shot = world
            .spawn((
                PlayerBullet,
                Position::new(100.0, 100.0),
                Hitbox::new(2.0),
                bullet(1.0, OnCollision::Pierce { reset_time: 0.5 }),
                PierceCooldown::default(),
            ))
            .id();

        let mut schedule = collision_schedule();
        let mut hits_per_tick = Vec::new();
        for _ in 0..4 {
            schedule.run(&mut world);
            hits_per_tick.push(world.resource_mut::<CollisionEvents>().damage.drain(..).count());
        }

        // Hit, cooling at 0.3, cooling at 0.1, expired at -0.1: hit again.
        assert_eq!(hits_per_tick, vec![1, 0, 0, 1]);
        assert!(world.get::<Bullet>(shot).is_some());
        assert_eq!(world.get::<Health>(enemy).unwrap().current, 98.0);
    }

    #[test]
    fn test_pierce_hits_every_target_in_one_tick() {
        let mut world = collision_world();
        for x in [95.0, 105.0] {
            world.spawn((Enemy, Position::new(x, 100.0), Hitbox::new(6.0), Health::new(50.0)));
        }
        world.spawn((
            PlayerBullet,
            Position::new(100.0, 100.0),
            Hitbox::new(2.0),
            bullet(4.0, OnCollision::Pierce { reset_time: 1.0 }),
        ));

        collision_schedule().run(&mut world);
        assert_eq!(world.resource::<CollisionEvents>().damage.len(), 2);

        // The cooldown map was attached on first contact.
        let mut query = world.query::<&PierceCooldown>();
        assert_eq!(query.single(&world).len(), 2);
    }

    #[test]
    fn test_destroying_bullet_stops_after_first_hit() {
        let mut world = collision_world();
        for x in [95.0, 105.0] {
            world.spawn((Enemy, Position::new(x, 100.0), Hitbox::new(6.0), Health::new(50.0)));
        }
        world.spawn((
            PlayerBullet,
            Position::new(100.0, 100.0),
            Hitbox::new(2.0),
            bullet(4.0, OnCollision::DestroySelf),
        ));

        collision_schedule().run(&mut world);
        assert_eq!(world.resource::<CollisionEvents>().damage.len(), 1);
    }

    #[test]
    fn test_destroy_with_children_takes_attachments() {
        let mut world = collision_world();
        world.spawn((Enemy, Position::new(100.0, 100.0), Hitbox::new(6.0), Health::new(50.0)));
        let trail = world.spawn(Position::new(90.0, 100.0)).id();
        let shot = world
            .spawn((
                PlayerBullet,
                Position::new(100.0, 100.0),
                Hitbox::new(2.0),
                bullet(4.0, OnCollision::DestroyWithChildren),
                AttachedEntities(vec![trail]),
            ))
            .id();

        collision_schedule().run(&mut world);
        assert!(world.get::<Position>(shot).is_none());
        assert!(world.get::<Position>(trail).is_none());
    }

    #[test]
    fn test_attached_bullet_destroyed_with_parent_deals_no_damage() {
        let mut world = collision_world();
        let enemy = world
            .spawn((Enemy, Position::new(100.0, 100.0), Hitbox::new(6.0), Health::new(50.0)))
            .id();
        // Same archetype for both, so the parent is visited first.
        let parent = world
            .spawn((
                PlayerBullet,
                Position::new(100.0, 100.0),
                Hitbox::new(2.0),
                bullet(5.0, OnCollision::DestroyWithChildren),
                AttachedEntities(Vec::new()),
            ))
            .id();
        let child = world
            .spawn((
                PlayerBullet,
                Position::new(102.0, 100.0),
                Hitbox::new(2.0),
                bullet(5.0, OnCollision::DestroySelf),
                AttachedEntities(Vec::new()),
            ))
            .id();
        world.get_mut::<AttachedEntities>(parent).unwrap().0.push(child);

        collision_schedule().run(&mut world);

        let events = world.resource::<CollisionEvents>();
        assert_eq!(events.damage.len(), 1);
        assert_eq!(events.damage[0].bullet, parent);
        assert_eq!(events.despawned, vec![parent, child]);
        assert_eq!(world.get::<Health>(enemy).unwrap().current, 45.0);
        assert!(world.get::<Bullet>(child).is_none());
    }

    #[test]
    fn test_tiny_hitboxes_keep_large_grid_coarse() {
        let mut world = collision_world();
        world.spawn((Player, Position::new(100.0, 100.0), Hitbox::new(0.05), Health::new(10.0)));
        world.spawn((Enemy, Position::new(50.0, 50.0), Hitbox::new(0.05), Health::new(10.0)));

        collision_schedule().run(&mut world);

        let grids = world.resource::<CollisionGrids>();
        assert_eq!(grids.large.cell_size(), grids.default.cell_size());
        assert_eq!(grids.large.dimensions(), grids.default.dimensions());
    }

    #[test]
    fn test_large_enemy_found_from_distant_cell() {
        let mut world = collision_world();
        // Default cells are 10 units; this boss spans many of them and lives
        // in the large grid only.
        let boss = world
            .spawn((Enemy, Position::new(100.0, 100.0), Hitbox::new(40.0), Health::new(500.0)))
            .id();
        world.spawn((
            PlayerBullet,
            Position::new(100.0, 62.0),
            Hitbox::new(2.0),
            bullet(7.0, OnCollision::DestroySelf),
        ));

        collision_schedule().run(&mut world);
        let events = world.resource::<CollisionEvents>();
        assert_eq!(events.damage.len(), 1);
        assert_eq!(events.damage[0].target, boss);
        assert_eq!(world.resource::<CollisionGrids>().large.cell_size(), 80.0);
    }
}
