//! Read-only snapshot of the simulation state.
//!
//! The `Snapshot` struct is what a renderer or tooling reads after a tick;
//! nothing outside the tick mutates entity state.

use crate::components::*;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// What an entity is, as far as a renderer cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy,
    PlayerBullet,
    EnemyBullet,
    Collectible,
    Other,
}

/// Snapshot of a single positioned entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: u64,
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    /// Hitbox radius, zero for entities without one.
    pub radius: f32,
    /// Current health, for the player and enemies.
    pub health: Option<f32>,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// Every positioned entity, ordered by id.
    pub entities: Vec<EntitySnapshot>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut query = world.query::<(
            Entity,
            &Position,
            Option<&Hitbox>,
            Option<&Health>,
            Has<Player>,
            Has<Enemy>,
            Has<PlayerBullet>,
            Has<EnemyBullet>,
            Has<Collectible>,
        )>();

        let mut entities: Vec<EntitySnapshot> = query
            .iter(world)
            .map(
                |(entity, pos, hitbox, health, player, enemy, player_bullet, enemy_bullet, item)| {
                    let kind = if player {
                        EntityKind::Player
                    } else if enemy {
                        EntityKind::Enemy
                    } else if player_bullet {
                        EntityKind::PlayerBullet
                    } else if enemy_bullet {
                        EntityKind::EnemyBullet
                    } else if item {
                        EntityKind::Collectible
                    } else {
                        EntityKind::Other
                    };
                    EntitySnapshot {
                        id: entity.to_bits(),
                        kind,
                        x: pos.0.x,
                        y: pos.0.y,
                        radius: hitbox.map_or(0.0, |h| h.radius),
                        health: health.map(|h| h.current),
                    }
                },
            )
            .collect();
        entities.sort_by_key(|e| e.id);

        Self {
            tick,
            time,
            entities,
        }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a snapshot from a JSON string.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}
