//! Spatial partitioning for broad-phase collision queries.
//!
//! A uniform grid over the playfield. Objects are inserted into every cell
//! their bounding square touches, so a query only has to read the buckets its
//! own bounding square touches. Results are candidates: they can include
//! neighbours that don't actually overlap and the same object several times.
//!
//! Cell coordinates are clamped to the grid, never wrapped. Objects lying
//! entirely outside the playfield are piled into the edge cells and are not
//! guaranteed to be found by queries; everything the core tracks is expected
//! to stay on the map.

use glam::Vec2;

/// Uniform grid of buckets covering `[0, width] × [0, height]`.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid<T> {
    cell_size: f32,
    width: f32,
    height: f32,
    /// Highest valid cell coordinate on each axis. Coordinates run
    /// `0..=cells_x` so objects touching the far edge have a cell.
    cells_x: usize,
    cells_y: usize,
    buckets: Vec<Vec<T>>,
}

impl<T: Clone> SpatialHashGrid<T> {
    /// Create a grid for a `width × height` world.
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let mut grid = Self {
            cell_size: 1.0,
            width,
            height,
            cells_x: 0,
            cells_y: 0,
            buckets: Vec::new(),
        };
        grid.resize(cell_size);
        grid
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of cells along x and y.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cells_x + 1, self.cells_y + 1)
    }

    /// Change the cell size, reallocating the buckets. Entries are dropped.
    /// Does nothing if the size is unchanged.
    pub fn resize(&mut self, cell_size: f32) {
        let cell_size = cell_size.max(f32::EPSILON);
        if cell_size == self.cell_size && !self.buckets.is_empty() {
            return;
        }
        self.cell_size = cell_size;
        self.cells_x = (self.width / cell_size).ceil().max(0.0) as usize;
        self.cells_y = (self.height / cell_size).ceil().max(0.0) as usize;
        let count = (self.cells_x + 1) * (self.cells_y + 1);
        self.buckets.clear();
        self.buckets.resize_with(count, Vec::new);
    }

    /// Empty every bucket, keeping their allocations for the next tick.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    /// Insert `object` into every cell its bounding square overlaps.
    pub fn insert(&mut self, object: T, hitbox_offset: Vec2, radius: f32, position: Vec2) {
        let (x0, y0, x1, y1) = self.cell_range(position + hitbox_offset, radius);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let index = self.index(x, y);
                self.buckets[index].push(object.clone());
            }
        }
    }

    /// Everything stored in the cells the query's bounding square overlaps.
    pub fn nearby_objects(&self, hitbox_offset: Vec2, radius: f32, position: Vec2) -> Vec<T> {
        let mut results = Vec::new();
        self.extend_nearby(&mut results, hitbox_offset, radius, position);
        results
    }

    /// Like [`SpatialHashGrid::nearby_objects`] but appends to `out`.
    pub fn extend_nearby(&self, out: &mut Vec<T>, hitbox_offset: Vec2, radius: f32, position: Vec2) {
        let (x0, y0, x1, y1) = self.cell_range(position + hitbox_offset, radius);
        for y in y0..=y1 {
            for x in x0..=x1 {
                out.extend_from_slice(&self.buckets[self.index(x, y)]);
            }
        }
    }

    /// Contents of a single cell.
    pub fn cell(&self, x: usize, y: usize) -> &[T] {
        if x > self.cells_x || y > self.cells_y {
            return &[];
        }
        &self.buckets[self.index(x, y)]
    }

    /// Total number of stored entries, counting duplicates.
    pub fn total_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Cell coordinate containing `world`, clamped to the grid.
    #[inline]
    pub fn world_to_cell(&self, world: Vec2) -> (usize, usize) {
        (
            Self::clamp_axis(world.x / self.cell_size, self.cells_x),
            Self::clamp_axis(world.y / self.cell_size, self.cells_y),
        )
    }

    /// Inclusive cell rectangle covered by the bounding square of a circle.
    fn cell_range(&self, center: Vec2, radius: f32) -> (usize, usize, usize, usize) {
        let (x0, y0) = self.world_to_cell(center - Vec2::splat(radius));
        let (x1, y1) = self.world_to_cell(center + Vec2::splat(radius));
        (x0, y0, x1, y1)
    }

    #[inline]
    fn clamp_axis(cell: f32, max: usize) -> usize {
        let cell = cell.floor();
        if cell <= 0.0 || cell.is_nan() {
            0
        } else {
            (cell as usize).min(max)
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * (self.cells_x + 1) + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_insert_spanning_four_cells() {
        let mut grid = SpatialHashGrid::new(100.0, 100.0, 10.0);
        // Bounding square [5,15]×[5,15] covers cells (0,0),(1,0),(0,1),(1,1).
        grid.insert(42u32, Vec2::ZERO, 5.0, Vec2::new(10.0, 10.0));

        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(grid.cell(x, y), &[42]);
        }
        assert!(grid.cell(2, 1).is_empty());
        assert_eq!(grid.total_count(), 4);

        // Any query touching cell (1,1) finds it.
        let found = grid.nearby_objects(Vec2::ZERO, 1.0, Vec2::new(18.0, 18.0));
        assert!(found.contains(&42));
    }

    #[test]
    fn test_far_query_misses() {
        let mut grid = SpatialHashGrid::new(100.0, 100.0, 10.0);
        grid.insert(1u32, Vec2::ZERO, 2.0, Vec2::new(5.0, 5.0));
        assert!(grid
            .nearby_objects(Vec2::ZERO, 2.0, Vec2::new(80.0, 80.0))
            .is_empty());
    }

    #[test]
    fn test_hitbox_offset_shifts_cells() {
        let mut grid = SpatialHashGrid::new(100.0, 100.0, 10.0);
        grid.insert(7u32, Vec2::new(50.0, 0.0), 1.0, Vec2::new(5.0, 5.0));
        assert!(grid.cell(0, 0).is_empty());
        assert_eq!(grid.cell(5, 0), &[7]);
    }

    #[test]
    fn test_clear_keeps_structure() {
        let mut grid = SpatialHashGrid::new(100.0, 100.0, 10.0);
        grid.insert(1u32, Vec2::ZERO, 30.0, Vec2::new(50.0, 50.0));
        let dims = grid.dimensions();
        grid.clear();
        assert_eq!(grid.total_count(), 0);
        assert_eq!(grid.dimensions(), dims);
    }

    #[test]
    fn test_edges_clamp_instead_of_wrapping() {
        let mut grid = SpatialHashGrid::new(100.0, 100.0, 10.0);
        grid.insert(1u32, Vec2::ZERO, 5.0, Vec2::new(-2.0, 99.0));
        assert_eq!(grid.cell(0, 9), &[1]);
        assert_eq!(grid.cell(0, 10), &[1]);
        assert!(grid.cell(10, 9).is_empty());
    }

    #[test]
    fn test_resize_reallocates() {
        let mut grid: SpatialHashGrid<u32> = SpatialHashGrid::new(100.0, 50.0, 10.0);
        assert_eq!(grid.dimensions(), (11, 6));
        grid.resize(25.0);
        assert_eq!(grid.dimensions(), (5, 3));
    }

    proptest! {
        #[test]
        fn prop_object_found_in_exactly_its_cells(
            x in 0.0f32..200.0,
            y in 0.0f32..200.0,
            radius in 0.1f32..40.0,
            cell_size in 5.0f32..50.0,
        ) {
            let mut grid = SpatialHashGrid::new(200.0, 200.0, cell_size);
            grid.insert(1u8, Vec2::ZERO, radius, Vec2::new(x, y));

            let (x0, y0) = grid.world_to_cell(Vec2::new(x - radius, y - radius));
            let (x1, y1) = grid.world_to_cell(Vec2::new(x + radius, y + radius));
            let (nx, ny) = grid.dimensions();
            for cy in 0..ny {
                for cx in 0..nx {
                    let inside = (x0..=x1).contains(&cx) && (y0..=y1).contains(&cy);
                    prop_assert_eq!(grid.cell(cx, cy).len(), usize::from(inside));
                }
            }
            prop_assert_eq!(grid.total_count(), (x1 - x0 + 1) * (y1 - y0 + 1));
        }
    }
}
