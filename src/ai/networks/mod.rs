//! Q-value function capability used by the agent, and its burn implementation.

mod burn_learner;
mod dqn_network;

use std::path::Path;

use crate::error::CheckpointError;
use crate::game::Observation;

pub use burn_learner::{BurnLearner, BurnQNetwork, DefaultBackend};
pub use dqn_network::{DqnNetwork, DqnNetworkConfig};

/// Forward pass: Q-value estimates for a batch of observations.
pub trait QNetwork {
    /// Number of actions, i.e. the width of each output row.
    fn action_count(&self) -> usize;

    /// Q-values for every state, flattened row-major to `[states.len(), action_count]`.
    fn predict(&self, states: &[Observation]) -> Vec<f32>;
}

/// A trainable Q-network that can hand out frozen copies of its parameters.
pub trait QLearner: QNetwork {
    /// Frozen parameter copy used as the bootstrapping target.
    type Target: QNetwork;

    /// Copy the current parameters into a new target network.
    fn snapshot(&self) -> Self::Target;

    /// One gradient step regressing `Q(states[i])[actions[i]]` onto `targets[i]`
    /// with mean-squared error. Returns the loss before the step.
    fn fit(&mut self, states: &[Observation], actions: &[usize], targets: &[f32]) -> f32;

    /// Persist the trainable parameters as `<dir>/<name>`.
    fn save(&self, dir: &Path, name: &str) -> Result<(), CheckpointError>;

    /// Restore the trainable parameters from `<dir>/<name>`.
    fn load(&mut self, dir: &Path, name: &str) -> Result<(), CheckpointError>;
}
