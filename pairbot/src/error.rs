//! Pairbot error types

use shared::{PairKey, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PairbotError {
    #[error("No eligible partner left for member {member}")]
    NoPartner { member: String },

    #[error("No pairing history row for {pair}")]
    NotFound { pair: PairKey },

    #[error("Storage operation failed: {message}")]
    Storage { message: String },

    #[error("A round is already in progress for {channel}")]
    RoundInProgress { channel: String },

    #[error("Ledger is corrupt: {reason}")]
    CorruptLedger { reason: String },

    #[error("Chat platform request failed ({status:?}): {message}")]
    Platform { status: Option<u16>, message: String },

    #[error("{failed} of {total} channel rounds failed")]
    RoundsFailed { failed: usize, total: usize },

    #[error("Configuration error: {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PairbotError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Errors that leave the ledger inconsistent with what matching expected
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Self::NoPartner { .. } | Self::NotFound { .. })
    }
}

pub type PairbotResult<T> = Result<T, PairbotError>;
