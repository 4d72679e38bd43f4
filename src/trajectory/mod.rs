//! Movable points: time-parameterised position functions.
//!
//! Every variant maps an elapsed time to an absolute position. Relative
//! variants add their offset to the caller's reference point; variants that
//! return global positions ignore it.
//!
//! [`MovablePoint::compute`] is the tick-driven entry point and may advance
//! internal state (only [`Homing`] has any). [`MovablePoint::sample`] is the
//! read-only form used for "where was it" queries and for chaining the legs of
//! an [`Aggregator`].

pub mod aggregator;
pub mod homing;
pub mod time_function;

pub use aggregator::Aggregator;
pub use homing::{Homing, HomingStandalone};
pub use time_function::{Segment, TimeFunction};

use crate::registry::EntityRegistry;
use bevy_ecs::entity::Entity;
use glam::Vec2;
use log::debug;

/// Fixed offset from the reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct Stationary {
    pub offset: Vec2,
    pub lifespan: f32,
}

impl Stationary {
    pub fn new(offset: Vec2, lifespan: f32) -> Self {
        Self { offset, lifespan }
    }
}

/// Offset given in polar form, both components functions of time.
#[derive(Debug, Clone, PartialEq)]
pub struct Polar {
    pub distance: TimeFunction,
    /// Radians, measured from +x toward +y.
    pub angle: TimeFunction,
    pub lifespan: f32,
}

impl Polar {
    pub fn new(distance: TimeFunction, angle: TimeFunction, lifespan: f32) -> Self {
        Self {
            distance,
            angle,
            lifespan,
        }
    }

    /// Straight line at constant `speed` along `angle`.
    pub fn linear(speed: f32, angle: f32, lifespan: f32) -> Self {
        Self::new(
            TimeFunction::linear(0.0, speed),
            TimeFunction::Constant(angle),
            lifespan,
        )
    }

    fn offset(&self, time: f32) -> Vec2 {
        Vec2::from_angle(self.angle.value(time)) * self.distance.value(time)
    }
}

/// Bezier curve through the control points, parameterised over
/// `time / lifespan`. Control points are offsets from the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Bezier {
    pub control_points: Vec<Vec2>,
    pub lifespan: f32,
}

impl Bezier {
    pub fn new(control_points: Vec<Vec2>, lifespan: f32) -> Self {
        Self {
            control_points,
            lifespan,
        }
    }

    /// De Casteljau evaluation. Values of `u` past 1 extrapolate along the
    /// same polynomial.
    fn offset(&self, time: f32) -> Vec2 {
        let u = if self.lifespan > 0.0 {
            time / self.lifespan
        } else {
            1.0
        };
        let mut points = self.control_points.clone();
        for level in (1..points.len()).rev() {
            for i in 0..level {
                points[i] = points[i].lerp(points[i + 1], u);
            }
        }
        points.first().copied().unwrap_or(Vec2::ZERO)
    }
}

/// Follows another entity's current position.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAnchored {
    pub anchor: Entity,
    pub lifespan: f32,
}

impl EntityAnchored {
    pub fn new(anchor: Entity, lifespan: f32) -> Self {
        Self { anchor, lifespan }
    }

    /// The anchor's position. A despawned anchor leaves the path at its
    /// reference point.
    fn position<R: EntityRegistry + ?Sized>(&self, reference: Vec2, registry: &R) -> Vec2 {
        match registry.position(self.anchor) {
            Some(position) => position,
            None => {
                debug!("anchor {:?} no longer valid, holding at reference", self.anchor);
                reference
            }
        }
    }
}

/// A trajectory function.
#[derive(Debug, Clone)]
pub enum MovablePoint {
    Stationary(Stationary),
    Polar(Polar),
    Bezier(Bezier),
    Aggregator(Aggregator),
    EntityAnchored(EntityAnchored),
    Homing(Homing),
    HomingStandalone(HomingStandalone),
}

impl MovablePoint {
    /// Informational duration. Evaluation past it keeps going.
    pub fn lifespan(&self) -> f32 {
        match self {
            Self::Stationary(s) => s.lifespan,
            Self::Polar(p) => p.lifespan,
            Self::Bezier(b) => b.lifespan,
            Self::Aggregator(a) => a.lifespan(),
            Self::EntityAnchored(e) => e.lifespan,
            Self::Homing(h) => h.lifespan(),
            Self::HomingStandalone(h) => h.lifespan(),
        }
    }

    /// Whether results are already absolute, independent of the reference.
    pub fn returns_global_positions(&self) -> bool {
        match self {
            Self::Stationary(_) | Self::Polar(_) | Self::Bezier(_) => false,
            Self::Aggregator(a) => a.returns_global_positions(),
            Self::EntityAnchored(_) | Self::Homing(_) | Self::HomingStandalone(_) => true,
        }
    }

    /// Position at `time`, advancing any internal state.
    pub fn compute<R: EntityRegistry + ?Sized>(
        &mut self,
        reference: Vec2,
        time: f32,
        registry: &R,
    ) -> Vec2 {
        match self {
            Self::Homing(h) => h.evaluate(time, registry),
            Self::Aggregator(a) => a.compute(reference, time, registry),
            other => other.sample(reference, time, registry),
        }
    }

    /// Position at `time` without touching internal state. Homing paths
    /// answer from their cache.
    pub fn sample<R: EntityRegistry + ?Sized>(
        &self,
        reference: Vec2,
        time: f32,
        registry: &R,
    ) -> Vec2 {
        match self {
            Self::Stationary(s) => reference + s.offset,
            Self::Polar(p) => reference + p.offset(time),
            Self::Bezier(b) => reference + b.offset(time),
            Self::Aggregator(a) => a.sample(reference, time, registry),
            Self::EntityAnchored(e) => e.position(reference, registry),
            Self::Homing(h) => h.recall(time),
            Self::HomingStandalone(h) => h.position_at(time),
        }
    }
}

impl From<Stationary> for MovablePoint {
    fn from(value: Stationary) -> Self {
        Self::Stationary(value)
    }
}

impl From<Polar> for MovablePoint {
    fn from(value: Polar) -> Self {
        Self::Polar(value)
    }
}

impl From<Bezier> for MovablePoint {
    fn from(value: Bezier) -> Self {
        Self::Bezier(value)
    }
}

impl From<Aggregator> for MovablePoint {
    fn from(value: Aggregator) -> Self {
        Self::Aggregator(value)
    }
}

impl From<Homing> for MovablePoint {
    fn from(value: Homing) -> Self {
        Self::Homing(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_bezier_endpoints_match_control_points() {
        let bezier = MovablePoint::Bezier(Bezier::new(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(50.0, 100.0),
                Vec2::new(100.0, -40.0),
                Vec2::new(150.0, 10.0),
            ],
            2.5,
        ));
        let reference = Vec2::new(10.0, 20.0);
        assert!((bezier.sample(reference, 0.0, &()) - Vec2::new(10.0, 20.0)).length() < 0.001);
        assert!((bezier.sample(reference, 2.5, &()) - Vec2::new(160.0, 30.0)).length() < 0.001);
    }

    #[test]
    fn test_quadratic_bezier_midpoint() {
        let bezier = Bezier::new(
            vec![Vec2::ZERO, Vec2::new(10.0, 10.0), Vec2::new(20.0, 0.0)],
            1.0,
        );
        assert!((bezier.offset(0.5) - Vec2::new(10.0, 5.0)).length() < 0.001);
    }

    #[test]
    fn test_polar_keeps_evaluating_past_lifespan() {
        let mut polar = MovablePoint::Polar(Polar::linear(4.0, 0.0, 1.0));
        let p = polar.compute(Vec2::ZERO, 3.0, &());
        assert!((p - Vec2::new(12.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_anchor_follows_entity() {
        let anchor = Entity::from_raw(4);
        let mut registry = HashMap::new();
        registry.insert(anchor, Vec2::new(7.0, 8.0));
        let mut point = MovablePoint::EntityAnchored(EntityAnchored::new(anchor, 1.0));
        assert!(point.returns_global_positions());
        assert_eq!(point.compute(Vec2::ZERO, 0.5, &registry), Vec2::new(7.0, 8.0));

        registry.clear();
        assert_eq!(point.compute(Vec2::new(1.0, 1.0), 0.6, &registry), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_stationary_ignores_time() {
        let point = MovablePoint::from(Stationary::new(Vec2::new(3.0, -2.0), 1.0));
        assert_eq!(point.sample(Vec2::ONE, 100.0, &()), Vec2::new(4.0, -1.0));
        assert!(!point.returns_global_positions());
    }
}
