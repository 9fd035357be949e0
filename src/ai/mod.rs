mod agent;
pub mod algorithms;
pub mod networks;
pub mod rules;
pub mod state_encoding;

pub use agent::{EpsilonSchedule, Transition, choose_action};
pub use algorithms::{DqnAgent, DqnConfig};
pub use networks::{BurnLearner, DefaultBackend, DqnNetworkConfig, QLearner, QNetwork};
pub use rules::rule_based_move;
