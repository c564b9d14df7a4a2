/// A grid coordinate, typically the active cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub cell: usize,
}

impl Cell {
    #[must_use]
    pub const fn new(row: usize, cell: usize) -> Self {
        Self { row, cell }
    }
}

/// A closed 1-D interval `[low, high]` of row or column indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub low: usize,
    pub high: usize,
}

impl Interval {
    #[must_use]
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.low <= index && index <= self.high
    }
}

/// Rectangular selection, inclusive on both ends.
///
/// Constructors normalize the corners so that `from_row <= to_row` and
/// `from_cell <= to_cell`. Two ranges are equal when their coordinates are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub from_row: usize,
    pub from_cell: usize,
    pub to_row: usize,
    pub to_cell: usize,
}

impl Range {
    #[must_use]
    pub fn new(from_row: usize, from_cell: usize, to_row: usize, to_cell: usize) -> Self {
        Self {
            from_row: from_row.min(to_row),
            from_cell: from_cell.min(to_cell),
            to_row: from_row.max(to_row),
            to_cell: from_cell.max(to_cell),
        }
    }

    #[must_use]
    pub const fn cell(row: usize, cell: usize) -> Self {
        Self {
            from_row: row,
            from_cell: cell,
            to_row: row,
            to_cell: cell,
        }
    }

    #[must_use]
    pub fn spanning(anchor: Cell, other: Cell) -> Self {
        Self::new(anchor.row, anchor.cell, other.row, other.cell)
    }

    #[must_use]
    pub fn contains(&self, row: usize, cell: usize) -> bool {
        self.rows().contains(row) && self.cells().contains(cell)
    }

    #[must_use]
    pub fn is_single_cell(&self) -> bool {
        self.from_row == self.to_row && self.from_cell == self.to_cell
    }

    #[must_use]
    pub fn rows(&self) -> Interval {
        Interval {
            low: self.from_row,
            high: self.to_row,
        }
    }

    #[must_use]
    pub fn cells(&self) -> Interval {
        Interval {
            low: self.from_cell,
            high: self.to_cell,
        }
    }

    /// The corner diagonally opposite `corner`, or `None` when `corner` is
    /// not one of this range's corners.
    #[must_use]
    pub fn opposite_corner(&self, corner: Cell) -> Option<Cell> {
        let row = if corner.row == self.from_row {
            self.to_row
        } else if corner.row == self.to_row {
            self.from_row
        } else {
            return None;
        };
        let cell = if corner.cell == self.from_cell {
            self.to_cell
        } else if corner.cell == self.to_cell {
            self.from_cell
        } else {
            return None;
        };
        Some(Cell::new(row, cell))
    }

    pub fn cells_iter(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.from_row..=self.to_row).flat_map(move |row| {
            (self.from_cell..=self.to_cell).map(move |cell| Cell::new(row, cell))
        })
    }
}
