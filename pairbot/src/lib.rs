//! Pairbot library for recurring meetup pairings
//!
//! Partitions the members of a chat channel into pairs each round, steering
//! away from pairs that have already met often and leaving at most one member
//! unmatched when the group is odd-sized.

pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{Config, Credentials, MattermostSettings, Messages};
pub use crate::core::{Ledger, MatchingEngine, Member, PairRecord};
pub use error::{PairbotError, PairbotResult};
pub use orchestrator::{ChannelReport, RoundOrchestrator};
pub use traits::{ChatPlatform, LedgerStore, PairingRepository, RoundLease};
