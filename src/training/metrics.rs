use std::fs;
use std::path::Path;

use crate::error::CheckpointError;
use crate::game::Player;

pub const WIN_RATES_FILE: &str = "win_rates.json";
pub const REWARDS_FILE: &str = "rewards.json";
pub const LOSSES_FILE: &str = "losses.json";

/// How a training episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeEnd {
    Winner(Player),
    Draw,
    /// Ended by a rejected move under the `end_episode` policy.
    Invalid,
    /// Gave up after too many rejected moves under the `continue` policy.
    Aborted,
}

/// Result of a single episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeResult {
    pub end: EpisodeEnd,
    pub game_length: usize,
    /// Summed reward of the tracked learner (player one).
    pub reward: f32,
}

/// Snapshot closed at the end of a log interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSummary {
    pub episode: usize,
    pub win_rates: (f32, f32),
    pub average_loss: f32,
}

/// Training metrics owned by the trainer for one run.
///
/// Win rates are cumulative over decided games (wins plus draws), losses are
/// averaged per log interval, and rewards are kept per episode.
#[derive(Debug, Default)]
pub struct TrainingMetrics {
    wins: [usize; 2],
    draws: usize,
    invalid_endings: usize,
    aborted: usize,
    total_episodes: usize,
    total_moves: usize,
    episode_rewards: Vec<f32>,
    win_rates: Vec<(f32, f32)>,
    interval_losses: Vec<f32>,
    pending_losses: Vec<f32>,
}

impl TrainingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.total_moves += result.game_length;
        self.episode_rewards.push(result.reward);
        match result.end {
            EpisodeEnd::Winner(player) => self.wins[player.index()] += 1,
            EpisodeEnd::Draw => self.draws += 1,
            EpisodeEnd::Invalid => self.invalid_endings += 1,
            EpisodeEnd::Aborted => self.aborted += 1,
        }
    }

    pub fn record_loss(&mut self, loss: f32) {
        self.pending_losses.push(loss);
    }

    /// Cumulative `(player one, player two)` win rates over decided games.
    pub fn win_rates(&self) -> (f32, f32) {
        let decided = self.wins[0] + self.wins[1] + self.draws;
        if decided == 0 {
            return (0.0, 0.0);
        }
        (
            self.wins[0] as f32 / decided as f32,
            self.wins[1] as f32 / decided as f32,
        )
    }

    /// Mean of the losses recorded since the last closed interval, 0 if none.
    pub fn pending_average_loss(&self) -> f32 {
        if self.pending_losses.is_empty() {
            return 0.0;
        }
        self.pending_losses.iter().sum::<f32>() / self.pending_losses.len() as f32
    }

    /// Record the current win-rate pair and interval loss, then start a new interval.
    pub fn close_interval(&mut self) -> IntervalSummary {
        let summary = IntervalSummary {
            episode: self.total_episodes,
            win_rates: self.win_rates(),
            average_loss: self.pending_average_loss(),
        };
        self.win_rates.push(summary.win_rates);
        self.interval_losses.push(summary.average_loss);
        self.pending_losses.clear();
        summary
    }

    pub fn wins(&self, player: Player) -> usize {
        self.wins[player.index()]
    }

    pub fn draws(&self) -> usize {
        self.draws
    }

    pub fn invalid_endings(&self) -> usize {
        self.invalid_endings
    }

    pub fn aborted(&self) -> usize {
        self.aborted
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn average_game_length(&self) -> f32 {
        if self.total_episodes == 0 {
            return 0.0;
        }
        self.total_moves as f32 / self.total_episodes as f32
    }

    pub fn episode_rewards(&self) -> &[f32] {
        &self.episode_rewards
    }

    pub fn interval_win_rates(&self) -> &[(f32, f32)] {
        &self.win_rates
    }

    pub fn interval_losses(&self) -> &[f32] {
        &self.interval_losses
    }

    /// Write the recorded series as JSON arrays into `dir`.
    pub fn save_json(&self, dir: &Path) -> Result<(), CheckpointError> {
        fs::create_dir_all(dir)?;
        fs::write(
            dir.join(WIN_RATES_FILE),
            serde_json::to_string(&self.win_rates)?,
        )?;
        fs::write(
            dir.join(REWARDS_FILE),
            serde_json::to_string(&self.episode_rewards)?,
        )?;
        fs::write(
            dir.join(LOSSES_FILE),
            serde_json::to_string(&self.interval_losses)?,
        )?;
        Ok(())
    }
}
