//! Core Gomoku game logic: board, players, observations, and the turn-based
//! environment with configuration-driven rewards.

mod board;
mod environment;
mod observation;
mod player;

pub use board::{Board, Cell, Coord, MoveError, WIN_LENGTH};
pub use environment::{
    GomokuEnvironment, InvalidMovePolicy, StepOutcome, StepResult, TerminalReason,
};
pub use observation::Observation;
pub use player::Player;
