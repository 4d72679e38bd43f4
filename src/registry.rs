//! Read-only view of the entity registry used by trajectory evaluation.
//!
//! Entity-anchored and homing trajectories need the positions of other
//! entities. They receive them through [`EntityRegistry`] instead of holding a
//! reference to the world, so evaluation stays explicit about its tick-scoped
//! input.

use crate::components::Position;
use bevy_ecs::prelude::*;
use glam::Vec2;
use std::collections::HashMap;

/// Position lookup by entity id.
pub trait EntityRegistry {
    /// Current position of `entity`, or `None` if it is no longer valid.
    fn position(&self, entity: Entity) -> Option<Vec2>;

    fn contains(&self, entity: Entity) -> bool {
        self.position(entity).is_some()
    }
}

/// Registry with no entities. Evaluating anchored trajectories against it
/// always hits the invalid-entity fallback.
impl EntityRegistry for () {
    fn position(&self, _entity: Entity) -> Option<Vec2> {
        None
    }
}

impl EntityRegistry for HashMap<Entity, Vec2> {
    fn position(&self, entity: Entity) -> Option<Vec2> {
        self.get(&entity).copied()
    }
}

/// Direct lookup, for preview tooling that owns the world outright.
impl EntityRegistry for World {
    fn position(&self, entity: Entity) -> Option<Vec2> {
        self.get::<Position>(entity).map(|p| p.0)
    }
}

/// Positions of every entity at the start of the tick.
///
/// Rebuilt by [`registry_snapshot_system`] before any path advances, so every
/// trajectory in a tick sees the same registry state regardless of update
/// order.
#[derive(Resource, Debug, Default)]
pub struct PositionSnapshot {
    positions: HashMap<Entity, Vec2>,
}

impl PositionSnapshot {
    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn insert(&mut self, entity: Entity, position: Vec2) {
        self.positions.insert(entity, position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl EntityRegistry for PositionSnapshot {
    fn position(&self, entity: Entity) -> Option<Vec2> {
        self.positions.get(&entity).copied()
    }
}

/// System that captures the positions of every live entity.
pub fn registry_snapshot_system(
    mut snapshot: ResMut<PositionSnapshot>,
    query: Query<(Entity, &Position)>,
) {
    snapshot.clear();
    for (entity, pos) in query.iter() {
        snapshot.insert(entity, pos.0);
    }
}
