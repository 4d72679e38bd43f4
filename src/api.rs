//! Public API for the simulation.
//!
//! This module provides the main interface for a game shell (or tooling) to
//! drive the simulation core.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 60 Hz). When
//! `step(dt)` is called, the simulation accumulates time and runs fixed
//! updates as needed. At most `max_steps_per_update` fixed updates run per
//! call; if the caller falls further behind, the surplus is dropped rather
//! than simulated with a larger timestep.
//!
//! ## Tick
//!
//! Each fixed update runs one strictly ordered chain: paths advance, grids
//! are rebuilt, collisions and pickups resolve, marked entities despawn.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::path::{PathChange, PathDriver};
use crate::registry::{registry_snapshot_system, PositionSnapshot};
use crate::systems::*;
use crate::trajectory::{Homing, MovablePoint, TimeFunction};
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use glam::Vec2;
use log::warn;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Spawning players, enemies, bullets and collectibles
/// - Stepping the simulation forward
/// - Queuing path changes
/// - Reading events and snapshots
///
/// ## Events
///
/// Damage events, collision despawns and pickups accumulate across fixed
/// updates and are never discarded by the simulation. A caller that steps
/// without calling `drain_damage_events`, `drain_collision_despawns` and
/// `drain_pickups` keeps every event in memory; drain once per frame.
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a simulation world with the default configuration.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create a simulation world with a custom configuration.
    pub fn with_config(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(PositionSnapshot::default());
        world.insert_resource(CollisionGrids::new(&config));
        world.insert_resource(CollectibleGrids::new(&config));
        world.insert_resource(CollisionEvents::default());
        world.insert_resource(PickupEvents::default());
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                registry_snapshot_system,
                path_system,
                despawn_timer_system,
                pierce_cooldown_system,
                collision_grid_update_system,
                collision_system,
                collectible_grid_update_system,
                collectible_system,
                enemy_death_system,
                despawn_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    /// Step the simulation forward by `dt` seconds of wall-clock time.
    pub fn step(&mut self, dt: f32) {
        let (fixed_dt, max_steps) = {
            let config = self.config();
            (config.fixed_timestep, config.max_steps_per_update)
        };

        self.time_accumulator += dt;
        let mut steps = 0;
        while self.time_accumulator >= fixed_dt {
            if steps == max_steps {
                warn!(
                    "simulation behind by {:.3}s, dropping the surplus",
                    self.time_accumulator
                );
                self.time_accumulator %= fixed_dt;
                break;
            }
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
            steps += 1;
        }
    }

    /// Run a single fixed timestep update.
    fn fixed_update(&mut self, dt: f32) {
        self.world.resource_mut::<DeltaTime>().0 = dt;
        self.schedule.run(&mut self.world);
        self.tick += 1;
        self.time += dt;
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for external systems. Must not be used while a
    /// tick is running.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn spawn_player(&mut self, at: Vec2, radius: f32, health: f32) -> Entity {
        self.world
            .spawn((Player, Position(at), Hitbox::new(radius), Health::new(health)))
            .id()
    }

    pub fn spawn_enemy(
        &mut self,
        at: Vec2,
        radius: f32,
        health: f32,
        path: impl Into<MovablePoint>,
    ) -> Entity {
        self.world
            .spawn((
                Enemy,
                Position(at),
                Hitbox::new(radius),
                Health::new(health),
                PathDriver::new(path, at),
            ))
            .id()
    }

    pub fn spawn_player_bullet(
        &mut self,
        at: Vec2,
        radius: f32,
        bullet: Bullet,
        path: impl Into<MovablePoint>,
    ) -> Entity {
        let entity = self.spawn_bullet(at, radius, bullet, path.into());
        self.world.entity_mut(entity).insert(PlayerBullet);
        entity
    }

    pub fn spawn_enemy_bullet(
        &mut self,
        at: Vec2,
        radius: f32,
        bullet: Bullet,
        path: impl Into<MovablePoint>,
    ) -> Entity {
        let entity = self.spawn_bullet(at, radius, bullet, path.into());
        self.world.entity_mut(entity).insert(EnemyBullet);
        entity
    }

    fn spawn_bullet(&mut self, at: Vec2, radius: f32, bullet: Bullet, path: MovablePoint) -> Entity {
        let mut entity = self.world.spawn(BulletBundle {
            position: Position(at),
            hitbox: Hitbox::new(radius),
            bullet,
            path: PathDriver::new(path, at),
        });
        if let OnCollision::Pierce { .. } = bullet.on_collision {
            entity.insert(PierceCooldown::default());
        }
        entity.id()
    }

    pub fn spawn_collectible(
        &mut self,
        at: Vec2,
        radius: f32,
        item: Collectible,
        lifetime: f32,
        path: impl Into<MovablePoint>,
    ) -> Entity {
        self.world
            .spawn(CollectibleBundle {
                position: Position(at),
                hitbox: Hitbox::new(radius),
                collectible: item,
                timer: DespawnTimer::new(lifetime),
                path: PathDriver::new(path, at),
            })
            .id()
    }

    /// Make `child` despawn together with `parent` when `parent` is destroyed
    /// with [`OnCollision::DestroyWithChildren`].
    pub fn attach(&mut self, parent: Entity, child: Entity) {
        let mut parent = self.world.entity_mut(parent);
        match parent.get_mut::<AttachedEntities>() {
            Some(mut attached) => attached.0.push(child),
            None => {
                parent.insert(AttachedEntities(vec![child]));
            }
        }
    }

    /// Homing trajectory bound to this world's physics step.
    pub fn homing(
        &self,
        from: Vec2,
        heading: f32,
        target: Entity,
        speed: TimeFunction,
        strength: f32,
    ) -> Homing {
        Homing::new(
            from,
            heading,
            target,
            speed,
            strength,
            self.config().max_physics_step,
        )
    }

    /// Queue a path change on `entity`. Returns false if it has no path.
    pub fn queue_path_change(&mut self, entity: Entity, change: PathChange) -> bool {
        match self.world.get_mut::<PathDriver>(entity) {
            Some(mut driver) => {
                driver.queue(change);
                true
            }
            None => false,
        }
    }

    pub fn position(&self, entity: Entity) -> Option<Vec2> {
        self.world.get::<Position>(entity).map(|p| p.0)
    }

    /// Where `entity` was `seconds` ago along its path.
    pub fn position_seconds_ago(&self, entity: Entity, seconds: f32) -> Option<Vec2> {
        let driver = self.world.get::<PathDriver>(entity)?;
        let registry = self.world.resource::<PositionSnapshot>();
        Some(driver.position_seconds_ago(seconds, registry))
    }

    pub fn health(&self, entity: Entity) -> Option<f32> {
        self.world.get::<Health>(entity).map(|h| h.current)
    }

    /// Take every hit recorded since the last call.
    pub fn drain_damage_events(&mut self) -> Vec<DamageEvent> {
        std::mem::take(&mut self.world.resource_mut::<CollisionEvents>().damage)
    }

    /// Take every bullet (and attachment) despawned by a hit since the last
    /// call.
    pub fn drain_collision_despawns(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.world.resource_mut::<CollisionEvents>().despawned)
    }

    /// Take every pickup recorded since the last call.
    pub fn drain_pickups(&mut self) -> Vec<PickupEvent> {
        std::mem::take(&mut self.world.resource_mut::<PickupEvents>().0)
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
