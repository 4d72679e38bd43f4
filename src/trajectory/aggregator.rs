//! Sequential composition of trajectories.

use super::MovablePoint;
use crate::registry::EntityRegistry;
use glam::Vec2;

#[derive(Debug, Clone)]
struct AggregatedChild {
    point: MovablePoint,
    /// Prefix sum of the lifespans of every earlier child.
    start_time: f32,
}

/// Plays its children back to back. Each child starts where the previous one
/// ended (the previous child evaluated at its own lifespan).
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    children: Vec<AggregatedChild>,
    lifespan: f32,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: impl IntoIterator<Item = MovablePoint>) -> Self {
        let mut aggregator = Self::new();
        for point in points {
            aggregator.push_back(point);
        }
        aggregator
    }

    pub fn push_back(&mut self, point: MovablePoint) {
        self.children.push(AggregatedChild {
            point,
            start_time: 0.0,
        });
        self.recompute_windows();
    }

    pub fn clear(&mut self) {
        self.children.clear();
        self.recompute_windows();
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Sum of every child's lifespan.
    pub fn lifespan(&self) -> f32 {
        self.lifespan
    }

    /// Time at which child `index` takes over.
    pub fn start_time(&self, index: usize) -> Option<f32> {
        self.children.get(index).map(|c| c.start_time)
    }

    pub fn returns_global_positions(&self) -> bool {
        !self.children.is_empty()
            && self
                .children
                .iter()
                .all(|c| c.point.returns_global_positions())
    }

    fn recompute_windows(&mut self) {
        let mut elapsed = 0.0;
        for child in &mut self.children {
            child.start_time = elapsed;
            elapsed += child.point.lifespan();
        }
        self.lifespan = elapsed;
    }

    /// Index of the last child whose window has started by `time`. Past the
    /// aggregate lifespan this stays on the last child, which extrapolates.
    fn active_index(&self, time: f32) -> usize {
        self.children
            .partition_point(|c| c.start_time <= time)
            .saturating_sub(1)
    }

    /// Where child `index` begins: every earlier child chained end to end.
    fn origin_of<R: EntityRegistry + ?Sized>(
        &self,
        index: usize,
        reference: Vec2,
        registry: &R,
    ) -> Vec2 {
        self.children[..index].iter().fold(reference, |origin, child| {
            child
                .point
                .sample(origin, child.point.lifespan(), registry)
        })
    }

    /// # Panics
    ///
    /// Panics if the aggregator has no children.
    pub fn compute<R: EntityRegistry + ?Sized>(
        &mut self,
        reference: Vec2,
        time: f32,
        registry: &R,
    ) -> Vec2 {
        assert!(!self.children.is_empty(), "evaluated an empty aggregator");
        let index = self.active_index(time);
        let origin = self.origin_of(index, reference, registry);
        let child = &mut self.children[index];
        child
            .point
            .compute(origin, time - child.start_time, registry)
    }

    /// Read-only evaluation; see [`MovablePoint::sample`].
    ///
    /// # Panics
    ///
    /// Panics if the aggregator has no children.
    pub fn sample<R: EntityRegistry + ?Sized>(
        &self,
        reference: Vec2,
        time: f32,
        registry: &R,
    ) -> Vec2 {
        assert!(!self.children.is_empty(), "evaluated an empty aggregator");
        let index = self.active_index(time);
        let origin = self.origin_of(index, reference, registry);
        let child = &self.children[index];
        child
            .point
            .sample(origin, time - child.start_time, registry)
    }
}
