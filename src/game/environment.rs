use std::fmt;

use crate::config::{EnvironmentConfig, RewardConfig};
use crate::error::ConfigError;

use super::board::{Board, Coord, MoveError};
use super::observation::Observation;
use super::player::Player;

/// What happens to the episode when a move targets an occupied or off-board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidMovePolicy {
    /// The episode ends immediately with `done = true`.
    #[default]
    EndEpisode,
    /// The episode continues; the same player is expected to move again.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    Win,
    Draw,
}

/// Result tag of a single `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continuing,
    Invalid,
    Terminal {
        winner: Option<Player>,
        reason: TerminalReason,
    },
}

impl StepOutcome {
    /// Human-readable message for invalid and terminal transitions.
    pub fn info(&self) -> Option<String> {
        match self {
            StepOutcome::Continuing => None,
            StepOutcome::Invalid => Some("Invalid move".to_string()),
            StepOutcome::Terminal {
                winner: Some(player),
                ..
            } => Some(format!("{player} wins")),
            StepOutcome::Terminal { winner: None, .. } => Some("Draw".to_string()),
        }
    }

    pub fn winner(&self) -> Option<Player> {
        match self {
            StepOutcome::Terminal { winner, .. } => *winner,
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepOutcome::Terminal { .. })
    }
}

/// Everything `step` reports back to the caller.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub outcome: StepOutcome,
}

/// Turn-based Gomoku environment with configuration-driven rewards.
#[derive(Debug, Clone)]
pub struct GomokuEnvironment {
    board: Board,
    current_player: Player,
    done: bool,
    rewards: RewardConfig,
    invalid_move_policy: InvalidMovePolicy,
}

impl GomokuEnvironment {
    pub fn new(
        board_size: usize,
        rewards: RewardConfig,
        invalid_move_policy: InvalidMovePolicy,
    ) -> Self {
        GomokuEnvironment {
            board: Board::new(board_size),
            current_player: Player::One,
            done: false,
            rewards,
            invalid_move_policy,
        }
    }

    /// Build an environment, loading the reward file named by the config.
    pub fn from_config(config: &EnvironmentConfig) -> Result<Self, ConfigError> {
        let rewards = RewardConfig::load_named(&config.rewards_dir, &config.rewards)?;
        Ok(Self::new(config.board_size, rewards, config.invalid_move_policy))
    }

    /// Clear the board and hand the first move to player one.
    pub fn reset(&mut self) -> Observation {
        self.board.clear();
        self.current_player = Player::One;
        self.done = false;
        self.observation()
    }

    pub fn observation(&self) -> Observation {
        Observation::from_board(&self.board)
    }

    /// Flattened indices of all empty cells, ascending.
    pub fn valid_moves(&self) -> Vec<usize> {
        self.board.empty_cells()
    }

    pub fn step(&mut self, action: Coord) -> StepResult {
        let mover = self.current_player;
        if self.done {
            return self.reject(action, None);
        }
        if let Err(err) = self.board.place(action, mover.to_cell()) {
            return self.reject(action, Some(err));
        }

        let mut reward = self.rewards.step;
        let outcome = if self.board.check_win(action) {
            reward += self.rewards.win;
            StepOutcome::Terminal {
                winner: Some(mover),
                reason: TerminalReason::Win,
            }
        } else if self.board.is_full() {
            reward += self.rewards.draw;
            StepOutcome::Terminal {
                winner: None,
                reason: TerminalReason::Draw,
            }
        } else {
            self.current_player = mover.other();
            StepOutcome::Continuing
        };
        self.done = outcome.is_terminal();

        StepResult {
            observation: self.observation(),
            reward,
            done: self.done,
            outcome,
        }
    }

    /// Invalid-move result; the board is left untouched.
    fn reject(&mut self, action: Coord, cause: Option<MoveError>) -> StepResult {
        tracing::debug!(
            player = self.current_player.number(),
            row = action.row,
            col = action.col,
            cause = ?cause,
            "invalid move"
        );
        if self.invalid_move_policy == InvalidMovePolicy::EndEpisode {
            self.done = true;
        }
        StepResult {
            observation: self.observation(),
            reward: self.rewards.invalid_move,
            done: self.done,
            outcome: StepOutcome::Invalid,
        }
    }

    /// Human-readable board dump.
    pub fn render(&self) -> String {
        format!("{}to move: {}\n", self.board, self.current_player)
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn board_size(&self) -> usize {
        self.board.size()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn move_count(&self) -> usize {
        self.board.stone_count()
    }

    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }
}

impl fmt::Display for GomokuEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
