mod dqn;

pub use dqn::{DqnAgent, DqnConfig};

#[cfg(test)]
pub(crate) use dqn::testing;
