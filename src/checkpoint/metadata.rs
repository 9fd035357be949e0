use serde::{Deserialize, Serialize};

use crate::ai::EpsilonSchedule;

/// DQN training state written to `training_state.json` next to the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnTrainingState {
    pub board_size: usize,
    pub epsilon: EpsilonSchedule,
    pub step_count: usize,
    pub learning_rate: f64,
    pub gamma: f32,
    pub batch_size: usize,
    pub memory_size: usize,
    pub update_target_every: usize,
}
