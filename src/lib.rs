//! # Gomoku DQN
//!
//! Deep Q-learning agents for Gomoku (five in a row on an N×N board), trained
//! either against a rule-based opponent or through self-play, with the Burn
//! ML framework on the CPU.
//!
//! ## Modules
//!
//! - [`game`] — Core game logic: board, players, observations, and the environment
//! - [`ai`] — Action selection, the DQN agent, Q-networks, and the rule-based opponent
//! - [`training`] — Episode-driving trainer, replay buffer, metrics collection
//! - [`checkpoint`] — File layout and training state of saved agents
//! - [`config`] — TOML configuration and reward tables
//! - [`error`] — Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
