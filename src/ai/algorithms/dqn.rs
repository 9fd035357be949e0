use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::ai::agent::{EpsilonSchedule, Transition, choose_action};
use crate::ai::networks::{QLearner, QNetwork};
use crate::checkpoint::{DqnTrainingState, POLICY_FILE, TRAINING_STATE_FILE};
use crate::error::{AgentError, CheckpointError};
use crate::game::{Coord, Observation};
use crate::training::replay_buffer::ReplayBuffer;

/// DQN hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    /// Multiplicative decay applied once per action selection.
    pub epsilon_decay: f64,
    pub batch_size: usize,
    pub memory_size: usize,
    /// Episodes between target network syncs, driven by the trainer.
    pub update_target_every: usize,
    pub hidden_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 1e-3,
            gamma: 0.95,
            epsilon_start: 1.0,
            epsilon_end: 0.05,
            epsilon_decay: 0.9995,
            batch_size: 64,
            memory_size: 100_000,
            update_target_every: 10,
            hidden_size: 256,
            seed: None,
        }
    }
}

/// DQN agent with a policy learner, a frozen target network, and a replay buffer.
pub struct DqnAgent<L: QLearner> {
    learner: L,
    target: L::Target,
    replay_buffer: ReplayBuffer,
    epsilon: EpsilonSchedule,
    config: DqnConfig,
    board_size: usize,
    step_count: usize,
    rng: StdRng,
}

impl<L: QLearner> DqnAgent<L> {
    /// Wrap a learner; the target network starts as a copy of its parameters.
    pub fn new(learner: L, board_size: usize, config: DqnConfig) -> Self {
        assert_eq!(
            learner.action_count(),
            board_size * board_size,
            "network output does not match the board"
        );
        let (rng, replay_buffer) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                ReplayBuffer::with_seed(config.memory_size, seed.wrapping_add(1)),
            ),
            None => (StdRng::from_os_rng(), ReplayBuffer::new(config.memory_size)),
        };
        let target = learner.snapshot();
        let epsilon = EpsilonSchedule::new(
            config.epsilon_start,
            config.epsilon_end,
            config.epsilon_decay,
        );

        DqnAgent {
            learner,
            target,
            replay_buffer,
            epsilon,
            config,
            board_size,
            step_count: 0,
            rng,
        }
    }

    /// Epsilon-greedy action index, masked to `valid_moves` when given.
    /// Advances the epsilon schedule once.
    pub fn select_action(
        &mut self,
        state: &Observation,
        valid_moves: Option<&[usize]>,
    ) -> Result<usize, AgentError> {
        let q_values = self.learner.predict(std::slice::from_ref(state));
        let action = choose_action(&q_values, valid_moves, self.epsilon.value(), &mut self.rng)?;
        self.epsilon.advance();
        Ok(action)
    }

    /// Greedy action index with no exploration and no schedule change.
    pub fn best_action(
        &self,
        state: &Observation,
        valid_moves: Option<&[usize]>,
    ) -> Result<usize, AgentError> {
        let q_values = self.learner.predict(std::slice::from_ref(state));
        let mut rng = StdRng::seed_from_u64(0);
        choose_action(&q_values, valid_moves, 0.0, &mut rng)
    }

    pub fn action_index_to_coordinates(&self, index: usize) -> Coord {
        Coord::from_index(index, self.board_size)
    }

    pub fn store_transition(&mut self, transition: Transition) {
        self.replay_buffer.push(transition);
    }

    /// One gradient step on a sampled batch. `None` when the buffer holds fewer
    /// than `batch_size` transitions, in which case nothing is updated.
    pub fn update_model(&mut self) -> Option<f32> {
        let batch = self.replay_buffer.sample(self.config.batch_size)?;
        let action_count = self.target.action_count();

        let next_states: Vec<Observation> = batch.iter().map(|t| t.next_state.clone()).collect();
        let next_q = self.target.predict(&next_states);

        let targets: Vec<f32> = batch
            .iter()
            .zip(next_q.chunks(action_count))
            .map(|(t, row)| {
                if t.done {
                    t.reward
                } else {
                    let max_q = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                    t.reward + self.config.gamma * max_q
                }
            })
            .collect();

        let states: Vec<Observation> = batch.iter().map(|t| t.state.clone()).collect();
        let actions: Vec<usize> = batch.iter().map(|t| t.action).collect();
        let loss = self.learner.fit(&states, &actions, &targets);
        self.step_count += 1;
        Some(loss)
    }

    /// Copy the policy parameters into the target network.
    pub fn update_target_network(&mut self) {
        self.target = self.learner.snapshot();
        tracing::debug!(step = self.step_count, "target network synchronized");
    }

    /// Write policy weights and training state into `dir`, creating it if needed.
    pub fn save_model(&self, dir: &Path) -> Result<(), CheckpointError> {
        fs::create_dir_all(dir)?;
        self.learner.save(dir, POLICY_FILE)?;
        let json = serde_json::to_string_pretty(&self.training_state())?;
        fs::write(dir.join(TRAINING_STATE_FILE), json)?;
        Ok(())
    }

    /// Restore what [`DqnAgent::save_model`] wrote. The target network is
    /// re-synchronized from the loaded policy.
    pub fn load_model(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }
        let state_path = dir.join(TRAINING_STATE_FILE);
        let json = fs::read_to_string(&state_path).map_err(|e| CheckpointError::StateRead {
            path: state_path.clone(),
            source: e,
        })?;
        let state: DqnTrainingState =
            serde_json::from_str(&json).map_err(|e| CheckpointError::StateParse {
                path: state_path,
                source: e,
            })?;
        if state.board_size != self.board_size {
            return Err(CheckpointError::BoardSizeMismatch {
                expected: self.board_size,
                found: state.board_size,
            });
        }

        self.learner.load(dir, POLICY_FILE)?;
        self.restore_training_state(&state);
        self.update_target_network();
        Ok(())
    }

    /// Export current training state for checkpointing.
    pub fn training_state(&self) -> DqnTrainingState {
        DqnTrainingState {
            board_size: self.board_size,
            epsilon: self.epsilon.clone(),
            step_count: self.step_count,
            learning_rate: self.config.learning_rate,
            gamma: self.config.gamma,
            batch_size: self.config.batch_size,
            memory_size: self.config.memory_size,
            update_target_every: self.config.update_target_every,
        }
    }

    /// Resume learning progress from a checkpoint. Hyperparameters always come
    /// from the current config; saved values that differ are reported, not applied.
    fn restore_training_state(&mut self, state: &DqnTrainingState) {
        let changed = self.changed_hyperparameters(state);
        if !changed.is_empty() {
            tracing::warn!(
                changed = ?changed,
                "checkpoint hyperparameters differ from the current config, keeping the config"
            );
        }
        self.epsilon = self.epsilon.with_steps(state.epsilon.steps());
        self.step_count = state.step_count;
    }

    /// Names of the persisted hyperparameters whose saved value differs from the config.
    fn changed_hyperparameters(&self, state: &DqnTrainingState) -> Vec<&'static str> {
        let saved = &state.epsilon;
        let current = &self.epsilon;
        [
            ("learning_rate", state.learning_rate != self.config.learning_rate),
            ("gamma", state.gamma != self.config.gamma),
            ("batch_size", state.batch_size != self.config.batch_size),
            ("memory_size", state.memory_size != self.config.memory_size),
            (
                "update_target_every",
                state.update_target_every != self.config.update_target_every,
            ),
            ("epsilon", !saved.same_parameters(current)),
        ]
        .into_iter()
        .filter_map(|(name, differs)| differs.then_some(name))
        .collect()
    }

    #[cfg(test)]
    pub(crate) fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon.value()
    }

    /// Gradient updates performed so far.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn update_target_every(&self) -> usize {
        self.config.update_target_every
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    pub fn replay_len(&self) -> usize {
        self.replay_buffer.len()
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }
}


#[cfg(test)]
mod tests {
    use super::testing::TableLearner;
    use super::*;
    use crate::game::{Board, Cell};

    const N: usize = 5;

    fn config() -> DqnConfig {
        DqnConfig {
            batch_size: 4,
            memory_size: 100,
            gamma: 0.5,
            seed: Some(17),
            ..Default::default()
        }
    }

    fn agent(values: Vec<f32>, config: DqnConfig) -> DqnAgent<TableLearner> {
        DqnAgent::new(TableLearner::new(values), N, config)
    }

    fn empty_obs() -> Observation {
        Observation::from_board(&Board::new(N))
    }

    fn transition(action: usize, reward: f32, done: bool) -> Transition {
        Transition {
            state: empty_obs(),
            action,
            reward,
            next_state: empty_obs(),
            done,
        }
    }

    #[test]
    fn test_action_index_to_coordinates() {
        let agent = agent(vec![0.0; N * N], config());
        for r in 0..N {
            for c in 0..N {
                assert_eq!(agent.action_index_to_coordinates(r * N + c), Coord::new(r, c));
            }
        }
    }

    #[test]
    fn test_greedy_selection_is_masked() {
        let mut values = vec![0.0; N * N];
        values[0] = 10.0;
        values[7] = 5.0;
        let greedy = DqnConfig {
            epsilon_start: 0.0,
            epsilon_end: 0.0,
            ..config()
        };
        let mut agent = agent(values, greedy);

        let mut board = Board::new(N);
        board.place(Coord::new(0, 0), Cell::PlayerOne).unwrap();
        let obs = Observation::from_board(&board);
        let valid = board.empty_cells();

        assert_eq!(agent.select_action(&obs, Some(&valid)).unwrap(), 7);
        assert_eq!(agent.select_action(&obs, None).unwrap(), 0);
    }

    #[test]
    fn test_exploration_never_picks_occupied_cells() {
        let mut agent = agent(vec![0.0; N * N], DqnConfig { epsilon_decay: 1.0, ..config() });
        let valid = vec![2, 11, 24];
        for _ in 0..100 {
            let action = agent.select_action(&empty_obs(), Some(&valid)).unwrap();
            assert!(valid.contains(&action));
        }
    }

    #[test]
    fn test_epsilon_after_k_selections() {
        let cfg = DqnConfig {
            epsilon_start: 1.0,
            epsilon_end: 0.2,
            epsilon_decay: 0.95,
            ..config()
        };
        let mut agent = agent(vec![0.0; N * N], cfg);
        let valid: Vec<usize> = (0..N * N).collect();
        for k in 0..80 {
            let expected = (0.95f64.powi(k)).max(0.2);
            assert!((agent.epsilon() - expected).abs() < 1e-9, "k = {k}");
            agent.select_action(&empty_obs(), Some(&valid)).unwrap();
        }
    }

    #[test]
    fn test_best_action_does_not_decay_epsilon() {
        let mut values = vec![0.0; N * N];
        values[3] = 1.0;
        let agent = agent(values, config());
        let before = agent.epsilon();
        assert_eq!(agent.best_action(&empty_obs(), None).unwrap(), 3);
        assert_eq!(agent.epsilon(), before);
    }

    #[test]
    fn test_select_action_with_no_valid_moves_fails() {
        let mut agent = agent(vec![0.0; N * N], config());
        assert_eq!(
            agent.select_action(&empty_obs(), Some(&[])),
            Err(AgentError::NoValidMoves)
        );
    }

    #[test]
    fn test_select_action_rejects_mask_outside_board() {
        let mut agent = agent(vec![0.0; N * N], config());
        let before = agent.epsilon();
        assert_eq!(
            agent.best_action(&empty_obs(), Some(&[N * N])),
            Err(AgentError::ActionOutOfRange {
                action: N * N,
                action_count: N * N,
            })
        );
        assert!(agent.select_action(&empty_obs(), Some(&[0, N * N + 3])).is_err());
        assert_eq!(agent.epsilon(), before);
    }

    #[test]
    fn test_update_model_noop_below_batch_size() {
        let learner = TableLearner::new(vec![1.0; N * N]);
        let log = learner.log.clone();
        let mut agent = DqnAgent::new(learner, N, config());

        for i in 0..3 {
            agent.store_transition(transition(i, 1.0, false));
            assert_eq!(agent.update_model(), None);
        }
        assert!(log.borrow().calls.is_empty());
        assert_eq!(agent.step_count(), 0);
        assert_eq!(agent.best_action(&empty_obs(), None).unwrap(), 0);
        assert!(agent.learner.network.values.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_update_model_uses_target_network_bootstrap() {
        let mut values = vec![0.0; N * N];
        values[6] = 4.0;
        let learner = TableLearner::new(values);
        let log = learner.log.clone();
        let mut agent = DqnAgent::new(learner, N, config());

        agent.store_transition(transition(0, 1.0, false));
        agent.store_transition(transition(1, 1.0, false));
        agent.store_transition(transition(2, -1.0, true));
        agent.store_transition(transition(3, 0.5, true));

        let loss = agent.update_model();
        assert!(loss.is_some());

        let calls = log.borrow();
        let (actions, targets) = &calls.calls[0];
        for (a, t) in actions.iter().zip(targets) {
            let expected = match a {
                0 | 1 => 1.0 + 0.5 * 4.0,
                2 => -1.0,
                3 => 0.5,
                _ => unreachable!(),
            };
            assert!((t - expected).abs() < 1e-6, "action {a}: {t} vs {expected}");
        }
    }

    #[test]
    fn test_target_network_is_fixed_until_synchronized() {
        let mut values = vec![0.0; N * N];
        values[6] = 4.0;
        let learner = TableLearner::new(values);
        let log = learner.log.clone();
        let mut agent = DqnAgent::new(learner, N, config());

        // Every update pulls Q[6] towards a target of 0 on terminal transitions.
        for _ in 0..4 {
            agent.store_transition(transition(6, 0.0, true));
        }
        agent.update_model();
        agent.update_model();
        assert!(agent.learner.network.values[6] < 4.0);
        assert_eq!(agent.target.values[6], 4.0);

        agent.store_transition(transition(0, 0.0, false));
        agent.update_target_network();
        assert_eq!(agent.target.values, agent.learner.network.values);
        assert!(log.borrow().calls.len() >= 2);
    }

    #[test]
    fn test_save_and_load_model() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("nested").join("agent");

        let mut values = vec![0.0; N * N];
        values[12] = 2.5;
        let mut agent = agent(values, config());
        let valid: Vec<usize> = (0..N * N).collect();
        for _ in 0..10 {
            agent.select_action(&empty_obs(), Some(&valid)).unwrap();
        }
        agent.save_model(&model_dir).unwrap();
        assert!(model_dir.join(TRAINING_STATE_FILE).exists());

        let mut restored = DqnAgent::new(TableLearner::new(vec![0.0; N * N]), N, config());
        restored.load_model(&model_dir).unwrap();
        assert_eq!(restored.training_state(), agent.training_state());
        assert_eq!(restored.learner.network.values[12], 2.5);
        assert_eq!(restored.target.values[12], 2.5);
        assert!((restored.epsilon() - agent.epsilon()).abs() < 1e-12);
    }

    #[test]
    fn test_load_keeps_current_hyperparameters() {
        let dir = tempfile::tempdir().unwrap();
        let saved_config = DqnConfig {
            batch_size: 4,
            gamma: 0.5,
            memory_size: 100,
            ..config()
        };
        let mut saved = agent(vec![0.0; N * N], saved_config);
        let valid: Vec<usize> = (0..N * N).collect();
        for _ in 0..7 {
            saved.select_action(&empty_obs(), Some(&valid)).unwrap();
        }
        saved.save_model(dir.path()).unwrap();

        let current_config = DqnConfig {
            batch_size: 32,
            gamma: 0.9,
            memory_size: 5000,
            epsilon_decay: 0.9,
            ..config()
        };
        let mut resumed = agent(vec![0.0; N * N], current_config);
        let state: DqnTrainingState = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(TRAINING_STATE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(
            resumed.changed_hyperparameters(&state),
            vec!["gamma", "batch_size", "memory_size", "epsilon"]
        );

        resumed.load_model(dir.path()).unwrap();

        assert_eq!(resumed.config().batch_size, 32);
        assert_eq!(resumed.config().gamma, 0.9);
        assert_eq!(resumed.config().memory_size, 5000);
        assert_eq!(resumed.replay_buffer().capacity(), 5000);
        assert_eq!(resumed.training_state().memory_size, 5000);
        // Progress carries over; the decay follows the current config.
        assert_eq!(resumed.training_state().epsilon.steps(), 7);
        assert!((resumed.epsilon() - 0.9f64.powi(7)).abs() < 1e-12);
    }

    #[test]
    fn test_load_with_matching_config_reports_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let saved = agent(vec![0.0; N * N], config());
        saved.save_model(dir.path()).unwrap();
        let resumed = agent(vec![0.0; N * N], config());
        assert!(resumed.changed_hyperparameters(&saved.training_state()).is_empty());
    }

    #[test]
    fn test_load_rejects_other_board_size() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(vec![0.0; N * N], config());
        agent.save_model(dir.path()).unwrap();

        let mut other = DqnAgent::new(TableLearner::new(vec![0.0; 49]), 7, config());
        let err = other.load_model(dir.path()).unwrap_err();
        assert!(matches!(err, CheckpointError::BoardSizeMismatch { expected: 7, found: 5 }));
    }

    #[test]
    fn test_load_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(vec![0.0; N * N], config());
        let err = agent.load_model(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, CheckpointError::DirNotFound(_)));
    }

    #[test]
    fn test_save_to_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let agent = agent(vec![0.0; N * N], config());
        assert!(agent.save_model(&blocker.join("model")).is_err());
    }
}
