use std::fmt;

/// Number of aligned stones needed to win.
pub const WIN_LENGTH: usize = 5;

/// The four axes scanned for a run: horizontal, vertical, and both diagonals.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    PlayerOne,
    PlayerTwo,
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::PlayerOne => 'X',
            Cell::PlayerTwo => 'O',
        }
    }
}

/// A board coordinate. Not necessarily inside the board; see [`Board::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Coord { row, col }
    }

    /// Flattened action index, `row * board_size + col`.
    pub fn to_index(self, board_size: usize) -> usize {
        self.row * board_size + self.col
    }

    /// Inverse of [`Coord::to_index`].
    pub fn from_index(index: usize, board_size: usize) -> Self {
        Coord {
            row: index / board_size,
            col: index % board_size,
        }
    }
}

impl From<(usize, usize)> for Coord {
    fn from((row, col): (usize, usize)) -> Self {
        Coord { row, col }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    OutOfBounds,
    Occupied,
}

/// Square Gomoku board stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
    stones: usize,
}

impl Board {
    /// Create a new empty board
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![Cell::Empty; size * size],
            stones: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.row < self.size && coord.col < self.size
    }

    /// Get the cell at a specific position. Panics if out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.size + col]
    }

    /// Cell at a signed position, `None` when off the board.
    fn get_signed(&self, row: isize, col: isize) -> Option<Cell> {
        if row < 0 || col < 0 || row as usize >= self.size || col as usize >= self.size {
            return None;
        }
        Some(self.get(row as usize, col as usize))
    }

    pub fn is_empty_at(&self, coord: Coord) -> bool {
        self.contains(coord) && self.get(coord.row, coord.col) == Cell::Empty
    }

    /// Place a stone on an empty in-bounds cell.
    pub fn place(&mut self, coord: Coord, cell: Cell) -> Result<(), MoveError> {
        if !self.contains(coord) {
            return Err(MoveError::OutOfBounds);
        }
        let idx = coord.to_index(self.size);
        if self.cells[idx] != Cell::Empty {
            return Err(MoveError::Occupied);
        }
        self.cells[idx] = cell;
        self.stones += 1;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
        self.stones = 0;
    }

    pub fn stone_count(&self) -> usize {
        self.stones
    }

    /// Check if the board is completely full
    pub fn is_full(&self) -> bool {
        self.stones == self.cells.len()
    }

    /// Flattened indices of every empty cell, ascending.
    pub fn empty_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == Cell::Empty)
            .map(|(i, _)| i)
            .collect()
    }

    /// All cells, row-major.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Consecutive `cell` stones starting next to `coord` along `(dr, dc)`.
    fn count_direction(&self, coord: Coord, dr: isize, dc: isize, cell: Cell) -> usize {
        let mut count = 0;
        let mut r = coord.row as isize + dr;
        let mut c = coord.col as isize + dc;
        while self.get_signed(r, c) == Some(cell) {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }

    /// Length of each axis run through `coord` if it held `cell`, regardless of
    /// what currently occupies `coord`.
    pub fn axis_runs(&self, coord: Coord, cell: Cell) -> [usize; 4] {
        let mut runs = [0; 4];
        for (run, &(dr, dc)) in runs.iter_mut().zip(DIRECTIONS.iter()) {
            *run = 1
                + self.count_direction(coord, dr, dc, cell)
                + self.count_direction(coord, -dr, -dc, cell);
        }
        runs
    }

    /// Check if the stone at `coord` completes a run of [`WIN_LENGTH`].
    pub fn check_win(&self, coord: Coord) -> bool {
        if !self.contains(coord) {
            return false;
        }
        let cell = self.get(coord.row, coord.col);
        if cell == Cell::Empty {
            return false;
        }
        self.axis_runs(coord, cell)
            .iter()
            .any(|&run| run >= WIN_LENGTH)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 0..self.size {
            write!(f, "{:>3}", col)?;
        }
        writeln!(f)?;
        for row in 0..self.size {
            write!(f, "{:>3}", row)?;
            for col in 0..self.size {
                write!(f, "{:>3}", self.get(row, col).symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
