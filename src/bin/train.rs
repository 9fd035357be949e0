#![recursion_limit = "256"]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gomoku_dqn::ai::{BurnLearner, DefaultBackend, DqnAgent, DqnConfig, DqnNetworkConfig};
use gomoku_dqn::config::AppConfig;
use gomoku_dqn::game::GomokuEnvironment;
use gomoku_dqn::training::{Trainer, TrainingMode};

type Agent = DqnAgent<BurnLearner<DefaultBackend>>;

/// Train a Gomoku DQN agent against the rule-based opponent or via self-play.
#[derive(Parser)]
#[command(name = "train", about = "Train a Gomoku DQN agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Training mode: rule-based or self-play
    #[arg(long)]
    mode: Option<TrainingMode>,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override board size
    #[arg(long)]
    board_size: Option<usize>,

    /// Reward configuration name (file stem inside the rewards directory)
    #[arg(long)]
    rewards: Option<String>,

    /// Root directory for saved models and metrics
    #[arg(long)]
    output: Option<PathBuf>,

    /// Seed for action selection and replay sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Continue from the models of an earlier run with the same settings
    #[arg(long)]
    resume: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    if let Some(mode) = cli.mode {
        config.training.mode = mode;
    }
    if let Some(episodes) = cli.episodes {
        config.training.num_episodes = episodes;
    }
    if let Some(board_size) = cli.board_size {
        config.environment.board_size = board_size;
    }
    if let Some(rewards) = cli.rewards {
        config.environment.rewards = rewards;
    }
    if let Some(output) = cli.output {
        config.training.output_dir = output;
    }
    if cli.seed.is_some() {
        config.dqn.seed = cli.seed;
    }
    config.validate().context("validating configuration")?;

    let mut env = GomokuEnvironment::from_config(&config.environment).with_context(|| {
        format!(
            "loading reward configuration '{}' from {}",
            config.environment.rewards,
            config.environment.rewards_dir.display()
        )
    })?;
    let board_size = config.environment.board_size;
    let mode = config.training.mode;
    let mut trainer = Trainer::new(config.training.clone(), config.environment.rewards.clone());

    let run_dir = match mode {
        TrainingMode::RuleBased => {
            let mut agent = build_agent(board_size, config.dqn.clone());
            if cli.resume {
                resume(&mut agent, &trainer.model_dir(mode, 1))?;
            }
            trainer
                .train_against_rules(&mut env, &mut agent)
                .context("training against the rule-based opponent")?
        }
        TrainingMode::SelfPlay => {
            let mut agent1 = build_agent(board_size, config.dqn.clone());
            // Distinct seeds keep the two learners from exploring in lockstep.
            let second = DqnConfig {
                seed: config.dqn.seed.map(|seed| seed.wrapping_add(1)),
                ..config.dqn.clone()
            };
            let mut agent2 = build_agent(board_size, second);
            if cli.resume {
                resume(&mut agent1, &trainer.model_dir(mode, 1))?;
                resume(&mut agent2, &trainer.model_dir(mode, 2))?;
            }
            trainer
                .train_self_play(&mut env, &mut agent1, &mut agent2)
                .context("self-play training")?
        }
    };

    let metrics = trainer.metrics();
    tracing::info!(
        path = %run_dir.display(),
        episodes = metrics.total_episodes(),
        avg_game_length = metrics.average_game_length(),
        "training complete"
    );
    Ok(())
}

fn build_agent(board_size: usize, config: DqnConfig) -> Agent {
    let network = DqnNetworkConfig::new(board_size).with_hidden_size(config.hidden_size);
    let learner = BurnLearner::new(&network, config.learning_rate, Default::default());
    DqnAgent::new(learner, board_size, config)
}

fn resume(agent: &mut Agent, model_dir: &Path) -> Result<()> {
    if !model_dir.is_dir() {
        tracing::info!(path = %model_dir.display(), "no saved model found, starting fresh");
        return Ok(());
    }
    agent
        .load_model(model_dir)
        .with_context(|| format!("loading model from {}", model_dir.display()))?;
    tracing::info!(
        path = %model_dir.display(),
        epsilon = agent.epsilon(),
        steps = agent.step_count(),
        "resumed from saved model"
    );
    Ok(())
}
