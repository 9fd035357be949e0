use crate::game::{Board, Cell, Coord, GomokuEnvironment, WIN_LENGTH};

/// Score of a run through a candidate cell, indexed by run length (capped at 5).
const RUN_WEIGHTS: [f64; WIN_LENGTH + 1] = [0.0, 1.0, 10.0, 100.0, 1_000.0, 100_000.0];

/// How much blocking the opponent's line is worth relative to extending our own.
const DEFENSE_WEIGHT: f64 = 0.9;

/// Rule-based move for the player whose turn it is.
///
/// Takes an immediate win, otherwise blocks the opponent's immediate win,
/// otherwise plays the cell that best extends both players' lines, preferring
/// the centre on ties. Returns `None` only on a full board.
pub fn rule_based_move(env: &GomokuEnvironment) -> Option<Coord> {
    let board = env.board();
    let own = env.current_player().to_cell();
    let opp = env.current_player().other().to_cell();
    let n = board.size();
    let candidates: Vec<Coord> = board
        .empty_cells()
        .into_iter()
        .map(|idx| Coord::from_index(idx, n))
        .collect();

    if let Some(&win) = candidates.iter().find(|&&c| completes_five(board, c, own)) {
        return Some(win);
    }
    if let Some(&block) = candidates.iter().find(|&&c| completes_five(board, c, opp)) {
        return Some(block);
    }

    let center = (n as f64 - 1.0) / 2.0;
    let mut best: Option<(Coord, f64)> = None;
    for c in candidates {
        let dr = c.row as f64 - center;
        let dc = c.col as f64 - center;
        let score = line_score(board, c, own) + DEFENSE_WEIGHT * line_score(board, c, opp)
            - 0.01 * (dr * dr + dc * dc).sqrt();
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((c, score)),
        }
    }
    best.map(|(c, _)| c)
}

fn completes_five(board: &Board, coord: Coord, cell: Cell) -> bool {
    board
        .axis_runs(coord, cell)
        .iter()
        .any(|&run| run >= WIN_LENGTH)
}

fn line_score(board: &Board, coord: Coord, cell: Cell) -> f64 {
    board
        .axis_runs(coord, cell)
        .iter()
        .map(|&run| RUN_WEIGHTS[run.min(WIN_LENGTH)])
        .sum()
}
