//! Training infrastructure: the episode-driving trainer, replay buffer, and
//! metrics collection.

pub mod metrics;
pub mod replay_buffer;
pub mod trainer;

pub use metrics::{EpisodeEnd, EpisodeResult, TrainingMetrics};
pub use replay_buffer::ReplayBuffer;
pub use trainer::{Trainer, TrainerConfig, TrainingMode};
