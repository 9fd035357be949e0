use super::board::{Board, Cell};

/// Network input for one board position: two occupancy planes `[2, N, N]`,
/// flattened row-major. Plane 0 holds player one's stones, plane 1 player two's.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    board_size: usize,
    planes: Vec<f32>,
}

impl Observation {
    pub const PLANES: usize = 2;

    pub fn from_board(board: &Board) -> Self {
        let n = board.size();
        let area = n * n;
        let mut planes = vec![0.0f32; Self::PLANES * area];
        for (idx, cell) in board.cells().iter().enumerate() {
            match cell {
                Cell::PlayerOne => planes[idx] = 1.0,
                Cell::PlayerTwo => planes[area + idx] = 1.0,
                Cell::Empty => {}
            }
        }
        Observation {
            board_size: n,
            planes,
        }
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.planes
    }
}
