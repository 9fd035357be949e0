use std::path::{Path, PathBuf};

use crate::ai::algorithms::DqnConfig;
use crate::error::ConfigError;
use crate::game::{InvalidMovePolicy, WIN_LENGTH};
use crate::training::trainer::TrainerConfig;

/// Reward magnitudes per game event. Every key is required.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardConfig {
    /// Added to every accepted move.
    pub step: f32,
    /// Added to the winning move.
    pub win: f32,
    /// Credited to a learner whose opponent just won.
    pub loss: f32,
    /// Added to the move that fills the board.
    pub draw: f32,
    /// Returned instead of any other reward for a rejected move.
    pub invalid_move: f32,
}

impl RewardConfig {
    /// Load a reward table from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let rewards: RewardConfig = toml::from_str(&content)?;
        rewards.validate()?;
        Ok(rewards)
    }

    /// Load `<dir>/<name>.toml`.
    pub fn load_named(dir: &Path, name: &str) -> Result<Self, ConfigError> {
        Self::load(&dir.join(format!("{name}.toml")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("step", self.step),
            ("win", self.win),
            ("loss", self.loss),
            ("draw", self.draw),
            ("invalid_move", self.invalid_move),
        ];
        for (key, value) in values {
            if !value.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "rewards.{key} must be finite"
                )));
            }
        }
        Ok(())
    }
}

/// Board and reward selection for the environment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub board_size: usize,
    /// Reward file name without extension, looked up in `rewards_dir`.
    pub rewards: String,
    pub rewards_dir: PathBuf,
    pub invalid_move_policy: InvalidMovePolicy,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            board_size: 15,
            rewards: "rewards_default".to_string(),
            rewards_dir: PathBuf::from("rewards"),
            invalid_move_policy: InvalidMovePolicy::EndEpisode,
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: EnvironmentConfig,
    pub dqn: DqnConfig,
    pub training: TrainerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.board_size < WIN_LENGTH {
            return Err(ConfigError::Validation(format!(
                "environment.board_size must be >= {WIN_LENGTH}"
            )));
        }
        if self.environment.rewards.is_empty() {
            return Err(ConfigError::Validation(
                "environment.rewards must name a reward file".into(),
            ));
        }

        if self.dqn.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "dqn.learning_rate must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.dqn.gamma) {
            return Err(ConfigError::Validation(
                "dqn.gamma must be in [0, 1)".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dqn.epsilon_start) {
            return Err(ConfigError::Validation(
                "dqn.epsilon_start must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dqn.epsilon_end) {
            return Err(ConfigError::Validation(
                "dqn.epsilon_end must be in [0, 1]".into(),
            ));
        }
        if self.dqn.epsilon_end > self.dqn.epsilon_start {
            return Err(ConfigError::Validation(
                "dqn.epsilon_end must be <= dqn.epsilon_start".into(),
            ));
        }
        if self.dqn.epsilon_decay <= 0.0 || self.dqn.epsilon_decay > 1.0 {
            return Err(ConfigError::Validation(
                "dqn.epsilon_decay must be in (0, 1]".into(),
            ));
        }
        if self.dqn.batch_size == 0 {
            return Err(ConfigError::Validation(
                "dqn.batch_size must be > 0".into(),
            ));
        }
        if self.dqn.memory_size < self.dqn.batch_size {
            return Err(ConfigError::Validation(
                "dqn.memory_size must be >= dqn.batch_size".into(),
            ));
        }
        if self.dqn.update_target_every == 0 {
            return Err(ConfigError::Validation(
                "dqn.update_target_every must be > 0".into(),
            ));
        }
        if self.dqn.hidden_size == 0 {
            return Err(ConfigError::Validation(
                "dqn.hidden_size must be > 0".into(),
            ));
        }

        if self.training.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "training.num_episodes must be > 0".into(),
            ));
        }
        if self.training.log_every == 0 {
            return Err(ConfigError::Validation(
                "training.log_every must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DEFAULT_REWARDS: &str = r#"
step = -0.01
win = 1.0
loss = -1.0
draw = 0.0
invalid_move = -1.0
"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[dqn]
learning_rate = 0.0005
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.dqn.learning_rate - 0.0005).abs() < 1e-9);
        assert!((config.dqn.gamma - 0.95).abs() < 1e-6);
        assert_eq!(config.environment.board_size, 15);
        assert_eq!(config.training.num_episodes, 1000);
    }

    #[test]
    fn test_invalid_move_policy_parses() {
        let toml_str = r#"
[environment]
invalid_move_policy = "continue"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.environment.invalid_move_policy,
            InvalidMovePolicy::Continue
        );
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.training.num_episodes, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[environment]
board_size = 9

[training]
num_episodes = 50
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.environment.board_size, 9);
        assert_eq!(config.training.num_episodes, 50);
        assert_eq!(config.dqn.batch_size, DqnConfig::default().batch_size);
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
    }

    #[test]
    fn test_validation_rejects_gamma_of_one() {
        let mut config = AppConfig::default();
        config.dqn.gamma = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_small_board() {
        let mut config = AppConfig::default();
        config.environment.board_size = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_epsilon_end_gt_start() {
        let mut config = AppConfig::default();
        config.dqn.epsilon_start = 0.1;
        config.dqn.epsilon_end = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_decay() {
        let mut config = AppConfig::default();
        config.dqn.epsilon_decay = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_memory_lt_batch() {
        let mut config = AppConfig::default();
        config.dqn.memory_size = 10;
        config.dqn.batch_size = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_target_interval() {
        let mut config = AppConfig::default();
        config.dqn.update_target_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_log_every() {
        let mut config = AppConfig::default();
        config.training.log_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rewards_load_named() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shaped.toml"), DEFAULT_REWARDS).unwrap();
        let rewards = RewardConfig::load_named(dir.path(), "shaped").unwrap();
        assert_eq!(rewards.win, 1.0);
        assert_eq!(rewards.step, -0.01);
        assert_eq!(rewards.invalid_move, -1.0);
    }

    #[test]
    fn test_rewards_missing_key_fails() {
        let result: Result<RewardConfig, _> = toml::from_str("step = 0.0\nwin = 1.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rewards_unknown_key_fails() {
        let text = format!("{DEFAULT_REWARDS}bonus = 3.0\n");
        let result: Result<RewardConfig, _> = toml::from_str(&text);
        assert!(result.is_err());
    }

    #[test]
    fn test_rewards_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = RewardConfig::load_named(dir.path(), "absent").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_rewards_reject_non_finite() {
        let rewards = RewardConfig {
            step: f32::NAN,
            win: 1.0,
            loss: -1.0,
            draw: 0.0,
            invalid_move: -1.0,
        };
        assert!(rewards.validate().is_err());
    }

    #[test]
    fn test_shipped_reward_files_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("rewards");
        for name in ["rewards_default", "rewards_1", "rewards_2"] {
            RewardConfig::load_named(&dir, name)
                .unwrap_or_else(|e| panic!("{name} should load: {e}"));
        }
    }
}
