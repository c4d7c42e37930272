//! Error types shared across the battle server.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("battle not found: {0}")]
    BattleNotFound(String),

    #[error("battle {0} has already ended")]
    BattleEnded(String),

    #[error("server is shutting down")]
    ShuttingDown,

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
