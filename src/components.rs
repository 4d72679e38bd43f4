//! ECS Components for the bullet-hell simulation core.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position on the playfield. The origin is the top-left map corner.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }
}

/// Circular hitbox, offset from the entity's position.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub radius: f32,
    pub offset: Vec2,
    /// Disabled hitboxes never take part in collisions (e.g., during
    /// respawn invulnerability).
    pub disabled: bool,
}

impl Hitbox {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            offset: Vec2::ZERO,
            disabled: false,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// World-space centre of the hitbox for an entity at `position`.
    #[inline]
    pub fn center(&self, position: Vec2) -> Vec2 {
        position + self.offset
    }

    /// Exact circle-circle test: touching counts as overlapping.
    #[inline]
    pub fn overlaps(&self, position: Vec2, other: &Hitbox, other_position: Vec2) -> bool {
        let reach = self.radius + other.radius;
        self.center(position)
            .distance_squared(other.center(other_position))
            <= reach * reach
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// The player ship.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// An enemy. Enemies and the player are always tracked by the large-object
/// collision grid.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Enemy;

/// Bullet fired by the player; collides with enemies.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PlayerBullet;

/// Bullet fired by an enemy; collides with the player.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct EnemyBullet;

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Health of the player or an enemy.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// What happens to a bullet when it strikes a valid target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OnCollision {
    /// Despawn the bullet and every entity attached to it.
    DestroyWithChildren,
    /// Despawn only the bullet.
    DestroySelf,
    /// Survive the hit; the same target can't be struck again until
    /// `reset_time` seconds have passed.
    Pierce { reset_time: f32 },
}

impl Default for OnCollision {
    fn default() -> Self {
        Self::DestroySelf
    }
}

/// Damage-dealing projectile with attribution back to its source.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Bullet {
    pub attack_id: u32,
    pub attack_pattern_id: u32,
    /// Enemy that fired the bullet, if any.
    pub source: Option<Entity>,
    pub damage: f32,
    pub on_collision: OnCollision,
}

/// Per-target cooldowns of a pierce bullet.
///
/// Entries decay every tick and are never removed, even when the target
/// despawns.
#[derive(Component, Debug, Clone, Default)]
pub struct PierceCooldown {
    remaining: HashMap<Entity, f32>,
}

impl PierceCooldown {
    pub fn is_cooling(&self, target: Entity) -> bool {
        self.remaining.get(&target).is_some_and(|t| *t > 0.0)
    }

    pub fn register(&mut self, target: Entity, reset_time: f32) {
        self.remaining.insert(target, reset_time);
    }

    pub fn decay(&mut self, dt: f32) {
        for remaining in self.remaining.values_mut() {
            *remaining -= dt;
        }
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Entities that are despawned together with this one
/// (see [`OnCollision::DestroyWithChildren`]).
#[derive(Component, Debug, Clone, Default)]
pub struct AttachedEntities(pub Vec<Entity>);

// ============================================================================
// LIFETIME COMPONENTS
// ============================================================================

/// Marks an entity for removal at the end of the tick.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Despawn;

/// Counts down to an automatic despawn.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DespawnTimer {
    pub remaining: f32,
    pub enabled: bool,
}

impl DespawnTimer {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds,
            enabled: true,
        }
    }

    /// Advance the timer, returning true once it has expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.enabled {
            return false;
        }
        self.remaining -= dt;
        self.remaining <= 0.0
    }
}

// ============================================================================
// COLLECTIBLE COMPONENTS
// ============================================================================

/// Kind of pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectibleKind {
    Power,
    Point,
    Life,
    Bomb,
}

/// What triggers a collectible to start homing toward the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationTrigger {
    /// The player entering the activation radius.
    Proximity,
    /// The player's hitbox touching the collectible's hitbox.
    Contact,
}

/// An item the player picks up.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Collectible {
    pub kind: CollectibleKind,
    pub value: u32,
    pub activation_radius: f32,
    pub trigger: ActivationTrigger,
    /// Set once the item is homing toward the player.
    pub activated: bool,
}

impl Collectible {
    pub fn new(kind: CollectibleKind, value: u32, activation_radius: f32) -> Self {
        Self {
            kind,
            value,
            activation_radius,
            trigger: ActivationTrigger::Proximity,
            activated: false,
        }
    }

    pub fn with_trigger(mut self, trigger: ActivationTrigger) -> Self {
        self.trigger = trigger;
        self
    }
}

// ============================================================================
// BUNDLES
// ============================================================================

/// Bundle for spawning a bullet entity.
#[derive(Bundle)]
pub struct BulletBundle {
    pub position: Position,
    pub hitbox: Hitbox,
    pub bullet: Bullet,
    pub path: crate::path::PathDriver,
}

/// Bundle for spawning a collectible entity.
#[derive(Bundle)]
pub struct CollectibleBundle {
    pub position: Position,
    pub hitbox: Hitbox,
    pub collectible: Collectible,
    pub timer: DespawnTimer,
    pub path: crate::path::PathDriver,
}
