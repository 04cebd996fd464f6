use std::ops::{Index, IndexMut};

use crate::Cell;

/// A fixed-size 2D grid addressed by [`Cell`].
///
/// Stores elements of type `T` in a flat vector using row-major order. Lookups with
/// off-board cells return `None` from [`Grid::get`]; indexing with them panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    /// Checks if the cell lies on the grid.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        self.index_of(cell).is_some()
    }

    /// Converts a cell to a flat vector index, `None` when it is off the grid.
    #[inline]
    fn index_of(&self, cell: Cell) -> Option<usize> {
        let x = usize::try_from(cell.x).ok()?;
        let y = usize::try_from(cell.y).ok()?;
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    #[inline]
    fn cell_at(&self, index: usize) -> Cell {
        Cell::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Gets an immutable reference to the value at `cell`, or `None` off the grid.
    pub fn get(&self, cell: Cell) -> Option<&T> {
        self.index_of(cell).map(|index| &self.cells[index])
    }

    /// Returns an iterator that yields `(Cell, &T)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Cell, &T)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, value)| (self.cell_at(index), value))
    }
}

impl<T> Index<Cell> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, cell: Cell) -> &Self::Output {
        match self.index_of(cell) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                cell, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Cell> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, cell: Cell) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.index_of(cell) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                cell, width, height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_rejects_off_grid_cells() {
        let grid: Grid<u8> = Grid::new(3, 2);
        assert_eq!(grid.enumerate().count(), 6);
        assert!(grid.get(Cell::new(2, 1)).is_some());
        assert!(grid.get(Cell::new(3, 0)).is_none());
        assert!(grid.get(Cell::new(0, 2)).is_none());
        assert!(grid.get(Cell::new(-1, 0)).is_none());
    }

    #[test]
    fn test_enumerate_is_row_major() {
        let mut grid: Grid<u8> = Grid::new(2, 2);
        grid[Cell::new(1, 0)] = 7;
        let cells: Vec<(Cell, u8)> = grid.enumerate().map(|(c, v)| (c, *v)).collect();
        assert_eq!(
            cells,
            vec![
                (Cell::new(0, 0), 0),
                (Cell::new(1, 0), 7),
                (Cell::new(0, 1), 0),
                (Cell::new(1, 1), 0),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_panics_off_grid() {
        let grid: Grid<u8> = Grid::new(2, 2);
        let _ = grid[Cell::new(2, 2)];
    }
}
