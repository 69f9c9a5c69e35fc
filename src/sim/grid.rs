//! Spatial hash over bound particle positions
//!
//! Bound particles never move, so entries are inserted once and never
//! updated. Lookups visit the square block of cells covering a query disc.

use std::collections::HashMap;

use glam::IVec2;

use crate::vector::Vector2;

#[derive(Debug, Clone)]
pub struct SiteGrid {
    cell_size: f64,
    cells: HashMap<IVec2, Vec<u32>>,
}

impl SiteGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(f64::EPSILON),
            cells: HashMap::new(),
        }
    }

    /// Cell containing `pos` (saturates far outside the i32 range)
    #[inline]
    pub fn cell_of(&self, pos: Vector2) -> IVec2 {
        (pos / self.cell_size).floor().as_ivec2()
    }

    pub fn insert(&mut self, index: usize, pos: Vector2) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push(index as u32);
    }

    /// Indices of every entry that may lie within `radius` of `pos`
    ///
    /// Candidates still need an exact distance test.
    pub fn near(&self, pos: Vector2, radius: f64) -> impl Iterator<Item = usize> + '_ {
        let lo = self.cell_of(pos - Vector2::splat(radius));
        let hi = self.cell_of(pos + Vector2::splat(radius));
        (lo.y..=hi.y)
            .flat_map(move |y| (lo.x..=hi.x).map(move |x| IVec2::new(x, y)))
            .filter_map(move |cell| self.cells.get(&cell))
            .flat_map(|entries| entries.iter().map(|&i| i as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_of_negative_coordinates() {
        let grid = SiteGrid::new(10.0);
        assert_eq!(grid.cell_of(Vector2::new(0.0, 0.0)), IVec2::new(0, 0));
        assert_eq!(grid.cell_of(Vector2::new(-0.1, 9.9)), IVec2::new(-1, 0));
        assert_eq!(grid.cell_of(Vector2::new(25.0, -25.0)), IVec2::new(2, -3));
    }

    #[test]
    fn test_near_finds_neighbours_across_cells() {
        let mut grid = SiteGrid::new(10.0);
        grid.insert(0, Vector2::new(1.0, 1.0));
        grid.insert(1, Vector2::new(-9.0, 1.0));
        grid.insert(2, Vector2::new(55.0, 55.0));

        let mut found: Vec<usize> = grid.near(Vector2::new(0.0, 0.0), 10.0).collect();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);

        assert_eq!(grid.near(Vector2::new(55.0, 52.0), 4.0).collect::<Vec<_>>(), vec![2]);
        assert_eq!(grid.near(Vector2::new(-500.0, 0.0), 5.0).count(), 0);
    }
}
