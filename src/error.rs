use std::path::PathBuf;

/// Errors that can occur while saving or loading an agent.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("failed to read training state from {path}: {source}")]
    StateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse training state from {path}: {source}")]
    StateParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("checkpoint board size {found} does not match agent board size {expected}")]
    BoardSizeMismatch { expected: usize, found: usize },

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by an agent while choosing a move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("no valid moves to choose from")]
    NoValidMoves,

    #[error("action {action} is outside the action space of {action_count}")]
    ActionOutOfRange { action: usize, action_count: usize },
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("rule-based opponent found no move on a board that is not full")]
    NoRuleBasedMove,

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
