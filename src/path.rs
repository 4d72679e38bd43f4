//! Path driver: owns an entity's active trajectory and advances it.

use crate::registry::EntityRegistry;
use crate::trajectory::MovablePoint;
use bevy_ecs::prelude::*;
use glam::Vec2;
use std::collections::VecDeque;

/// How many retired trajectories are kept for "seconds ago" queries.
const PREVIOUS_PATH_CAPACITY: usize = 3;

/// A queued request to switch trajectories.
#[derive(Debug, Clone)]
pub struct PathChange {
    /// Elapsed time on the current path at which the switch happens.
    pub trigger_time: f32,
    pub point: MovablePoint,
    /// Added to the new path's starting elapsed time. Positive values make
    /// the new path catch up, negative values hold it at its start.
    pub time_lag: f32,
}

impl PathChange {
    pub fn new(trigger_time: f32, point: MovablePoint) -> Self {
        Self {
            trigger_time,
            point,
            time_lag: 0.0,
        }
    }

    pub fn with_time_lag(mut self, time_lag: f32) -> Self {
        self.time_lag = time_lag;
        self
    }
}

/// A trajectory that has been switched away from.
#[derive(Debug, Clone)]
struct RetiredPath {
    point: MovablePoint,
    reference: Vec2,
    started_at: f32,
    ended_at: f32,
}

/// Drives one entity along its trajectory.
#[derive(Component, Debug, Clone)]
pub struct PathDriver {
    point: MovablePoint,
    /// Where the current path began; relative trajectories offset from it.
    reference: Vec2,
    /// Elapsed time on the current path.
    elapsed: f32,
    /// Elapsed time the current path had at the moment of the switch (its
    /// time lag). `elapsed - started_at` is wall time spent on this path.
    started_at: f32,
    pending: VecDeque<PathChange>,
    previous: VecDeque<RetiredPath>,
}

impl PathDriver {
    pub fn new(point: impl Into<MovablePoint>, reference: Vec2) -> Self {
        Self {
            point: point.into(),
            reference,
            elapsed: 0.0,
            started_at: 0.0,
            pending: VecDeque::new(),
            previous: VecDeque::with_capacity(PREVIOUS_PATH_CAPACITY),
        }
    }

    pub fn point(&self) -> &MovablePoint {
        &self.point
    }

    pub fn reference(&self) -> Vec2 {
        self.reference
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    /// Queue a path change. Changes apply in the order they were queued.
    pub fn queue(&mut self, change: PathChange) {
        self.pending.push_back(change);
    }

    /// Switch to `point` right away, starting from `reference`. Pending
    /// changes are kept and now count against the new path's clock.
    pub fn replace_now(&mut self, point: impl Into<MovablePoint>, reference: Vec2, time_lag: f32) {
        self.retire(reference, self.elapsed, point.into(), time_lag);
    }

    /// Advance by `dt` seconds, applying any due path changes, and return the
    /// new position.
    pub fn advance<R: EntityRegistry + ?Sized>(&mut self, dt: f32, registry: &R) -> Vec2 {
        self.elapsed += dt;
        loop {
            let due = matches!(self.pending.front(), Some(c) if c.trigger_time <= self.elapsed);
            if !due {
                break;
            }
            let Some(change) = self.pending.pop_front() else {
                break;
            };
            let switch_at = change.trigger_time.max(0.0);
            let handover = self.point.compute(self.reference, switch_at, registry);
            let overshoot = self.elapsed - change.trigger_time;
            self.retire(handover, change.trigger_time, change.point, change.time_lag);
            self.elapsed = overshoot + change.time_lag;
        }
        self.point
            .compute(self.reference, self.elapsed.max(0.0), registry)
    }

    /// Current position without advancing.
    pub fn position<R: EntityRegistry + ?Sized>(&self, registry: &R) -> Vec2 {
        self.point
            .sample(self.reference, self.elapsed.max(0.0), registry)
    }

    /// Where the entity was `seconds` ago, walking back into retired paths
    /// when the current one is younger than that. Beyond the retained
    /// history the oldest known start is returned.
    pub fn position_seconds_ago<R: EntityRegistry + ?Sized>(
        &self,
        seconds: f32,
        registry: &R,
    ) -> Vec2 {
        let on_current = self.elapsed - self.started_at;
        if seconds <= on_current || self.previous.is_empty() {
            let time = (self.elapsed - seconds).max(0.0);
            return self.point.sample(self.reference, time, registry);
        }

        let mut remaining = seconds - on_current;
        let mut oldest = None;
        for retired in self.previous.iter().rev() {
            let span = retired.ended_at - retired.started_at;
            if remaining <= span {
                let time = (retired.ended_at - remaining).max(0.0);
                return retired.point.sample(retired.reference, time, registry);
            }
            remaining -= span;
            oldest = Some(retired);
        }
        oldest.map_or(self.reference, |r| {
            r.point
                .sample(r.reference, r.started_at.max(0.0), registry)
        })
    }

    fn retire(&mut self, reference: Vec2, ended_at: f32, point: MovablePoint, time_lag: f32) {
        let old = std::mem::replace(&mut self.point, point);
        if self.previous.len() == PREVIOUS_PATH_CAPACITY {
            self.previous.pop_front();
        }
        self.previous.push_back(RetiredPath {
            point: old,
            reference: self.reference,
            started_at: self.started_at,
            ended_at,
        });
        self.reference = reference;
        self.elapsed = time_lag;
        self.started_at = time_lag;
    }
}
