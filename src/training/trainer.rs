use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::ai::{DqnAgent, QLearner, Transition, rule_based_move};
use crate::error::TrainingError;
use crate::game::{GomokuEnvironment, Observation, Player, StepOutcome, StepResult};
use crate::training::metrics::{EpisodeEnd, EpisodeResult, TrainingMetrics};

/// Who the learner plays against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingMode {
    /// One learner as player one against the rule-based opponent.
    #[default]
    #[serde(alias = "rule_based")]
    RuleBased,
    /// Two independent learners, one per seat.
    #[serde(alias = "self_play")]
    SelfPlay,
}

impl TrainingMode {
    /// Directory under the output root holding runs of this mode.
    pub fn dir_name(self) -> &'static str {
        match self {
            TrainingMode::RuleBased => "rule_based_dqn",
            TrainingMode::SelfPlay => "self_play_dqn",
        }
    }
}

impl fmt::Display for TrainingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingMode::RuleBased => write!(f, "rule-based"),
            TrainingMode::SelfPlay => write!(f, "self-play"),
        }
    }
}

impl FromStr for TrainingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rule-based" | "rule_based" => Ok(TrainingMode::RuleBased),
            "self-play" | "self_play" => Ok(TrainingMode::SelfPlay),
            other => Err(format!(
                "unknown mode '{other}' (expected 'rule-based' or 'self-play')"
            )),
        }
    }
}

/// Trainer configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub mode: TrainingMode,
    pub num_episodes: usize,
    pub log_every: usize,
    /// Restrict learner actions to empty cells.
    pub mask_invalid_actions: bool,
    /// Rejected moves tolerated per turn under the `continue` policy.
    pub max_invalid_retries: usize,
    pub output_dir: PathBuf,
    pub model_name: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            mode: TrainingMode::RuleBased,
            num_episodes: 1000,
            log_every: 10,
            mask_invalid_actions: true,
            max_invalid_retries: 100,
            output_dir: PathBuf::from("runs"),
            model_name: "dqn_gomoku".to_string(),
        }
    }
}

/// A learner's move, kept until the opponent replies.
struct PendingMove {
    state: Observation,
    action: usize,
}

impl PendingMove {
    fn into_terminal(self, reward: f32, next_state: Observation) -> Transition {
        Transition {
            state: self.state,
            action: self.action,
            reward,
            next_state,
            done: true,
        }
    }
}

/// One learner turn, including any rejected attempts before it.
struct Turn {
    action: usize,
    result: StepResult,
    /// Reward summed over every attempt of the turn.
    reward: f32,
    aborted: bool,
}

/// Drives episodes between the environment and its players, and owns the
/// metrics of the run.
pub struct Trainer {
    config: TrainerConfig,
    run_name: String,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// `run_name` names the run directory, usually the reward configuration.
    pub fn new(config: TrainerConfig, run_name: impl Into<String>) -> Self {
        Trainer {
            config,
            run_name: run_name.into(),
            metrics: TrainingMetrics::new(),
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// `<output_dir>/<mode>/<run_name>`.
    pub fn run_dir(&self, mode: TrainingMode) -> PathBuf {
        self.config
            .output_dir
            .join(mode.dir_name())
            .join(&self.run_name)
    }

    /// Train `agent` as player one against the rule-based opponent, then save
    /// the model and metrics. Returns the run directory.
    pub fn train_against_rules<L: QLearner>(
        &mut self,
        env: &mut GomokuEnvironment,
        agent: &mut DqnAgent<L>,
    ) -> Result<PathBuf, TrainingError> {
        self.metrics = TrainingMetrics::new();
        let total = self.config.num_episodes;
        tracing::info!(
            episodes = total,
            board_size = env.board_size(),
            "starting DQN training against the rule-based opponent"
        );

        for episode in 1..=total {
            let result = self.play_against_rules(env, agent)?;
            self.finish_episode(episode, result);
            if episode % agent.update_target_every() == 0 {
                agent.update_target_network();
            }
            if episode % self.config.log_every == 0 {
                self.log_progress(agent.epsilon(), result.reward, env);
            }
        }

        let run_dir = self.run_dir(TrainingMode::RuleBased);
        let model_dir = self.model_dir(TrainingMode::RuleBased, 1);
        agent.save_model(&model_dir)?;
        tracing::info!(path = %model_dir.display(), "model saved");
        self.save_metrics(&run_dir)?;
        Ok(run_dir)
    }

    /// Train two independent agents against each other, `agent1` as player
    /// one. Saves both models and the metrics; returns the run directory.
    pub fn train_self_play<L: QLearner>(
        &mut self,
        env: &mut GomokuEnvironment,
        agent1: &mut DqnAgent<L>,
        agent2: &mut DqnAgent<L>,
    ) -> Result<PathBuf, TrainingError> {
        self.metrics = TrainingMetrics::new();
        let total = self.config.num_episodes;
        tracing::info!(
            episodes = total,
            board_size = env.board_size(),
            "starting DQN self-play training"
        );

        for episode in 1..=total {
            let result = self.play_self_play(env, agent1, agent2)?;
            self.finish_episode(episode, result);
            if episode % agent1.update_target_every() == 0 {
                agent1.update_target_network();
            }
            if episode % agent2.update_target_every() == 0 {
                agent2.update_target_network();
            }
            if episode % self.config.log_every == 0 {
                self.log_progress(agent1.epsilon(), result.reward, env);
            }
        }

        let run_dir = self.run_dir(TrainingMode::SelfPlay);
        let agent1_dir = self.model_dir(TrainingMode::SelfPlay, 1);
        agent1.save_model(&agent1_dir)?;
        tracing::info!(path = %agent1_dir.display(), "model saved");
        let agent2_dir = self.model_dir(TrainingMode::SelfPlay, 2);
        agent2.save_model(&agent2_dir)?;
        tracing::info!(path = %agent2_dir.display(), "model saved");
        self.save_metrics(&run_dir)?;
        Ok(run_dir)
    }

    /// Model directory of agent `seat` (1 or 2) inside the run directory.
    /// Rule-based runs have a single agent and ignore `seat`.
    pub fn model_dir(&self, mode: TrainingMode, seat: usize) -> PathBuf {
        let name = match mode {
            TrainingMode::RuleBased => self.config.model_name.clone(),
            TrainingMode::SelfPlay => format!("{}_agent{seat}", self.config.model_name),
        };
        self.run_dir(mode).join(name)
    }

    fn play_against_rules<L: QLearner>(
        &mut self,
        env: &mut GomokuEnvironment,
        agent: &mut DqnAgent<L>,
    ) -> Result<EpisodeResult, TrainingError> {
        let mut state = env.reset();
        let mut reward = 0.0;
        let mut last_move: Option<PendingMove> = None;

        let end = loop {
            let result = match env.current_player() {
                Player::One => {
                    let turn = self.learner_turn(env, agent, &state)?;
                    reward += turn.reward;
                    if turn.aborted {
                        break EpisodeEnd::Aborted;
                    }
                    last_move = Some(PendingMove {
                        state: state.clone(),
                        action: turn.action,
                    });
                    turn.result
                }
                Player::Two => {
                    let coord = rule_based_move(env).ok_or(TrainingError::NoRuleBasedMove)?;
                    let result = env.step(coord);
                    if let Some(credit) = closing_reward(env, &result.outcome) {
                        if let Some(pending) = last_move.take() {
                            agent.store_transition(
                                pending.into_terminal(credit, result.observation.clone()),
                            );
                            reward += credit;
                        }
                    }
                    result
                }
            };
            if let Some(end) = episode_end(&result) {
                break end;
            }
            state = result.observation;
        };

        Ok(EpisodeResult {
            end,
            game_length: env.move_count(),
            reward,
        })
    }

    fn play_self_play<L: QLearner>(
        &mut self,
        env: &mut GomokuEnvironment,
        agent1: &mut DqnAgent<L>,
        agent2: &mut DqnAgent<L>,
    ) -> Result<EpisodeResult, TrainingError> {
        let mut state = env.reset();
        let mut rewards = [0.0f32; 2];
        let mut last_moves: [Option<PendingMove>; 2] = [None, None];

        let end = loop {
            let player = env.current_player();
            let turn = match player {
                Player::One => self.learner_turn(env, agent1, &state)?,
                Player::Two => self.learner_turn(env, agent2, &state)?,
            };
            rewards[player.index()] += turn.reward;
            if turn.aborted {
                break EpisodeEnd::Aborted;
            }
            last_moves[player.index()] = Some(PendingMove {
                state: state.clone(),
                action: turn.action,
            });

            let opponent = player.other();
            if let Some(credit) = closing_reward(env, &turn.result.outcome) {
                if let Some(pending) = last_moves[opponent.index()].take() {
                    let next_state = turn.result.observation.clone();
                    let transition = pending.into_terminal(credit, next_state);
                    match opponent {
                        Player::One => agent1.store_transition(transition),
                        Player::Two => agent2.store_transition(transition),
                    }
                    rewards[opponent.index()] += credit;
                }
            }

            if let Some(end) = episode_end(&turn.result) {
                break end;
            }
            state = turn.result.observation;
        };

        Ok(EpisodeResult {
            end,
            game_length: env.move_count(),
            reward: rewards[Player::One.index()],
        })
    }

    /// Select, play and learn from one move. Rejected moves are stored with
    /// their penalty and retried while the episode stays open.
    fn learner_turn<L: QLearner>(
        &mut self,
        env: &mut GomokuEnvironment,
        agent: &mut DqnAgent<L>,
        state: &Observation,
    ) -> Result<Turn, TrainingError> {
        let mut reward = 0.0;
        let mut retries = 0;
        loop {
            let valid = env.valid_moves();
            let mask = self.config.mask_invalid_actions.then_some(valid.as_slice());
            let action = agent.select_action(state, mask)?;
            let result = env.step(agent.action_index_to_coordinates(action));
            reward += result.reward;
            agent.store_transition(Transition {
                state: state.clone(),
                action,
                reward: result.reward,
                next_state: result.observation.clone(),
                done: result.done,
            });

            let retry = result.outcome == StepOutcome::Invalid && !result.done;
            if retry {
                retries += 1;
                if retries <= self.config.max_invalid_retries {
                    continue;
                }
            }
            if let Some(loss) = agent.update_model() {
                self.metrics.record_loss(loss);
            }
            return Ok(Turn {
                action,
                result,
                reward,
                aborted: retry,
            });
        }
    }

    fn finish_episode(&mut self, episode: usize, result: EpisodeResult) {
        if result.end == EpisodeEnd::Aborted {
            tracing::warn!(
                episode,
                retries = self.config.max_invalid_retries,
                "episode aborted after repeated invalid moves"
            );
        }
        self.metrics.record_episode(result);
    }

    fn log_progress(&mut self, epsilon: f64, reward: f32, env: &GomokuEnvironment) {
        let summary = self.metrics.close_interval();
        let (one, two) = summary.win_rates;
        tracing::info!(
            "Episode {}/{} | reward: {:.2} | win rates: {:.2} / {:.2} | avg loss: {:.4} | eps: {:.4}",
            summary.episode,
            self.config.num_episodes,
            reward,
            one,
            two,
            summary.average_loss,
            epsilon,
        );
        tracing::info!("\n{}", env.render());
    }

    fn save_metrics(&self, run_dir: &Path) -> Result<(), TrainingError> {
        self.metrics.save_json(run_dir)?;
        tracing::info!(
            path = %run_dir.display(),
            episodes = self.metrics.total_episodes(),
            "training metrics saved"
        );
        Ok(())
    }
}

/// Reward owed to the player who did not make the move that ended the game.
fn closing_reward(env: &GomokuEnvironment, outcome: &StepOutcome) -> Option<f32> {
    match outcome {
        StepOutcome::Terminal {
            winner: Some(_), ..
        } => Some(env.rewards().loss),
        StepOutcome::Terminal { winner: None, .. } => Some(env.rewards().draw),
        _ => None,
    }
}

fn episode_end(result: &StepResult) -> Option<EpisodeEnd> {
    match result.outcome {
        StepOutcome::Terminal {
            winner: Some(player),
            ..
        } => Some(EpisodeEnd::Winner(player)),
        StepOutcome::Terminal { winner: None, .. } => Some(EpisodeEnd::Draw),
        StepOutcome::Invalid if result.done => Some(EpisodeEnd::Invalid),
        _ => None,
    }
}
