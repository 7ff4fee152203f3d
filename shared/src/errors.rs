//! Shared error types for the pairing system

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("A member cannot be paired with itself: {member}")]
    SelfPair { member: String },

    #[error("Invalid channel reference (expected team/channel): {input}")]
    InvalidChannel { input: String },

    #[error("Invalid log format: {input}")]
    InvalidLogFormat { input: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
