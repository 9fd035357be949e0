//! Agent persistence: file names and the JSON training state stored beside the
//! network weights.

mod metadata;

pub use metadata::DqnTrainingState;

/// Weights file stem for the policy network inside a model directory.
pub const POLICY_FILE: &str = "policy_network";
/// Training state file inside a model directory.
pub const TRAINING_STATE_FILE: &str = "training_state.json";
