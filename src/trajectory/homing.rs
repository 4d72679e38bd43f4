//! Homing trajectories.
//!
//! A homing path can't be recomputed from scratch for an arbitrary time: the
//! heading at each step depends on the previous heading and on where the
//! target was at that moment. [`Homing`] therefore integrates forward one
//! physics step at a time and keeps a short cache of past positions to answer
//! "where was I a moment ago" queries.
//!
//! [`HomingStandalone`] is the registry-free preview form. It flies a straight
//! line between two points and has no stateful `evaluate` at all.

use super::time_function::TimeFunction;
use crate::error::HomingError;
use crate::registry::EntityRegistry;
use bevy_ecs::entity::Entity;
use glam::Vec2;
use log::warn;
use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

/// Slack allowed on the step bound for accumulated float error.
const STEP_EPSILON: f32 = 1e-4;

/// Stateful homing trajectory. Returns absolute positions.
#[derive(Debug, Clone)]
pub struct Homing {
    target: Entity,
    speed: TimeFunction,
    /// Fraction of the angular gap to the target closed per evaluation, in
    /// (0, 1].
    strength: f32,
    max_step: f32,
    lifespan: f32,
    heading: f32,
    last_time: f32,
    /// Time-ordered samples, never older than `max_step` behind `last_time`.
    /// Always holds at least one sample.
    cache: VecDeque<(f32, Vec2)>,
}

impl Homing {
    /// Start homing from `start` at time zero, initially flying along
    /// `heading` (radians).
    pub fn new(
        start: Vec2,
        heading: f32,
        target: Entity,
        speed: TimeFunction,
        strength: f32,
        max_step: f32,
    ) -> Self {
        let mut cache = VecDeque::with_capacity(4);
        cache.push_back((0.0, start));
        Self {
            target,
            speed,
            strength: strength.clamp(f32::EPSILON, 1.0),
            max_step,
            lifespan: f32::INFINITY,
            heading,
            last_time: 0.0,
            cache,
        }
    }

    /// Move the origin sample to `time` instead of zero.
    pub fn with_start_time(mut self, time: f32) -> Self {
        let start = self.latest_position();
        self.cache.clear();
        self.cache.push_back((time, start));
        self.last_time = time;
        self
    }

    pub fn with_lifespan(mut self, lifespan: f32) -> Self {
        self.lifespan = lifespan;
        self
    }

    pub fn lifespan(&self) -> f32 {
        self.lifespan
    }

    pub fn target(&self) -> Entity {
        self.target
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn last_evaluated_time(&self) -> f32 {
        self.last_time
    }

    /// Cached `(time, position)` samples, oldest first.
    pub fn cached_samples(&self) -> impl Iterator<Item = &(f32, Vec2)> {
        self.cache.iter()
    }

    pub fn latest_position(&self) -> Vec2 {
        self.cache.back().map_or(Vec2::ZERO, |(_, p)| *p)
    }

    /// Absolute position at `time`.
    ///
    /// Forward calls advance the path; backward calls read the cache; a call
    /// at the last evaluated time returns the latest position unchanged.
    /// Anomalies are logged and produce a zero-displacement result.
    pub fn evaluate<R: EntityRegistry + ?Sized>(&mut self, time: f32, registry: &R) -> Vec2 {
        match self.try_evaluate(time, registry) {
            Ok(position) => position,
            Err(err) => {
                warn!("homing evaluation at t={time}: {err}");
                self.latest_position()
            }
        }
    }

    /// Like [`Homing::evaluate`] but reports anomalies. On error the path has
    /// already recorded a zero-displacement sample at `time`, so the clock
    /// stays in step with the caller.
    pub fn try_evaluate<R: EntityRegistry + ?Sized>(
        &mut self,
        time: f32,
        registry: &R,
    ) -> Result<Vec2, HomingError> {
        if time < self.last_time {
            return Ok(self.recall(time));
        }
        if time == self.last_time {
            return Ok(self.latest_position());
        }

        let step = time - self.last_time;
        let position = self.latest_position();
        if step > self.max_step + STEP_EPSILON {
            self.record(time, position);
            return Err(HomingError::StepTooLarge {
                step,
                max: self.max_step,
            });
        }
        let Some(target) = registry.position(self.target) else {
            self.record(time, position);
            return Err(HomingError::InvalidTarget(self.target));
        };

        let to_target = target - position;
        if to_target.length_squared() > f32::EPSILON {
            let bearing = to_target.y.atan2(to_target.x);
            self.heading = blend_angle(self.heading, bearing, self.strength);
        }
        let next = position + Vec2::from_angle(self.heading) * self.speed.value(time) * step;
        self.record(time, next);
        Ok(next)
    }

    /// Position at a time at or before the last evaluation. Never mutates.
    pub fn recall(&self, time: f32) -> Vec2 {
        let index = self.cache.partition_point(|(t, _)| *t < time);
        match (index.checked_sub(1).and_then(|i| self.cache.get(i)), self.cache.get(index)) {
            (_, Some((t, p))) if *t == time => *p,
            (Some((t0, p0)), Some((t1, p1))) => {
                let alpha = (time - t0) / (t1 - t0);
                p0.lerp(*p1, alpha)
            }
            // Older than anything cached: the oldest sample is the closest
            // available answer.
            (None, Some((_, p))) => *p,
            (Some((_, p)), None) => *p,
            (None, None) => Vec2::ZERO,
        }
    }

    fn record(&mut self, time: f32, position: Vec2) {
        self.cache.push_back((time, position));
        self.last_time = time;
        let horizon = time - self.max_step;
        while self.cache.len() > 1 && self.cache.front().is_some_and(|(t, _)| *t < horizon) {
            self.cache.pop_front();
        }
    }
}

/// Turn `from` toward `to` by `strength` of the shortest angular gap.
fn blend_angle(from: f32, to: f32, strength: f32) -> f32 {
    let gap = (to - from + PI).rem_euclid(TAU) - PI;
    (from + gap * strength + PI).rem_euclid(TAU) - PI
}

/// Registry-free straight-line homing preview, flying from `start` toward a
/// fixed point. Returns absolute positions.
#[derive(Debug, Clone)]
pub struct HomingStandalone {
    start: Vec2,
    direction: Vec2,
    speed: TimeFunction,
    lifespan: f32,
}

impl HomingStandalone {
    pub fn new(start: Vec2, target: Vec2, speed: TimeFunction, lifespan: f32) -> Self {
        Self {
            start,
            direction: (target - start).normalize_or_zero(),
            speed,
            lifespan,
        }
    }

    pub fn lifespan(&self) -> f32 {
        self.lifespan
    }

    pub fn position_at(&self, time: f32) -> Vec2 {
        self.start + self.direction * self.speed.integrate(0.0, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn registry_with(target: Entity, at: Vec2) -> HashMap<Entity, Vec2> {
        let mut registry = HashMap::new();
        registry.insert(target, at);
        registry
    }

    #[test]
    fn test_backward_query_interpolates_between_samples() {
        let target = Entity::from_raw(1);
        let registry = registry_with(target, Vec2::new(1000.0, 0.0));
        let mut homing = Homing::new(
            Vec2::ZERO,
            0.0,
            target,
            TimeFunction::Constant(10.0),
            1.0,
            1.0,
        )
        .with_start_time(1.0);

        let at_two = homing.evaluate(2.0, &registry);
        assert!((at_two - Vec2::new(10.0, 0.0)).length() < 0.001);

        let halfway = homing.evaluate(1.5, &registry);
        assert!((halfway - Vec2::new(5.0, 0.0)).length() < 0.001);
        // Backward queries leave the clock alone.
        assert_eq!(homing.last_evaluated_time(), 2.0);
        assert_eq!(homing.evaluate(1.0, &registry), Vec2::ZERO);
    }

    #[test]
    fn test_cache_never_older_than_one_step() {
        let target = Entity::from_raw(1);
        let registry = registry_with(target, Vec2::new(50.0, 80.0));
        let dt = 1.0 / 60.0;
        let max_step = 1.0 / 30.0;
        let mut homing = Homing::new(
            Vec2::ZERO,
            0.0,
            target,
            TimeFunction::Constant(30.0),
            0.2,
            max_step,
        );

        for i in 1..=120 {
            let now = dt * i as f32;
            homing.evaluate(now, &registry);
            assert!(homing
                .cached_samples()
                .all(|(t, _)| *t >= now - max_step - 1e-6));
        }
        assert!(homing.cached_samples().count() <= 3);
    }

    #[test]
    fn test_same_time_does_not_extrapolate() {
        let target = Entity::from_raw(1);
        let registry = registry_with(target, Vec2::new(0.0, 100.0));
        let mut homing = Homing::new(
            Vec2::ZERO,
            0.0,
            target,
            TimeFunction::Constant(10.0),
            0.5,
            0.1,
        );
        let first = homing.evaluate(0.1, &registry);
        let heading = homing.heading();
        assert_eq!(homing.evaluate(0.1, &registry), first);
        assert_eq!(homing.heading(), heading);
    }

    #[test]
    fn test_turns_the_short_way_around() {
        // Heading just below +π, target bearing just above -π: the short turn
        // crosses the ±π seam rather than sweeping through zero.
        let from = PI - 0.1;
        let to = -PI + 0.1;
        let blended = blend_angle(from, to, 0.5);
        assert!((blended.abs() - PI).abs() < 0.001);
    }

    #[test]
    fn test_full_strength_flies_straight_at_target() {
        let target = Entity::from_raw(1);
        let registry = registry_with(target, Vec2::new(0.0, 100.0));
        let mut homing = Homing::new(
            Vec2::ZERO,
            0.0,
            target,
            TimeFunction::Constant(10.0),
            1.0,
            0.1,
        );
        let p = homing.evaluate(0.1, &registry);
        assert!((p - Vec2::new(0.0, 1.0)).length() < 0.001);
    }

    #[test]
    fn test_invalid_target_gives_zero_displacement() {
        let target = Entity::from_raw(1);
        let empty: HashMap<Entity, Vec2> = HashMap::new();
        let mut homing = Homing::new(
            Vec2::new(3.0, 4.0),
            0.0,
            target,
            TimeFunction::Constant(10.0),
            1.0,
            0.1,
        );
        assert_eq!(
            homing.try_evaluate(0.05, &empty),
            Err(HomingError::InvalidTarget(target))
        );
        assert_eq!(homing.evaluate(0.1, &empty), Vec2::new(3.0, 4.0));
        assert_eq!(homing.last_evaluated_time(), 0.1);
    }

    #[test]
    fn test_oversized_step_is_recoverable() {
        let target = Entity::from_raw(1);
        let registry = registry_with(target, Vec2::new(100.0, 0.0));
        let mut homing = Homing::new(
            Vec2::ZERO,
            0.0,
            target,
            TimeFunction::Constant(10.0),
            1.0,
            0.1,
        );
        assert!(matches!(
            homing.try_evaluate(1.0, &registry),
            Err(HomingError::StepTooLarge { .. })
        ));
        // Back in step: the next forward call advances normally.
        let p = homing.evaluate(1.1, &registry);
        assert!((p - Vec2::new(1.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_standalone_flies_straight_line() {
        let preview = HomingStandalone::new(
            Vec2::ZERO,
            Vec2::new(3.0, 4.0),
            TimeFunction::Constant(5.0),
            2.0,
        );
        assert!((preview.position_at(1.0) - Vec2::new(3.0, 4.0)).length() < 0.001);
        assert!((preview.position_at(2.0) - Vec2::new(6.0, 8.0)).length() < 0.001);
    }
}
