//! Service implementations
//!
//! This module contains real implementations of the collaborator traits.
//! These are the production implementations that handle actual I/O operations.

pub mod ledger_store;
pub mod mattermost;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use ledger_store::{JsonLedgerStore, MemoryLedgerStore};
pub use mattermost::MattermostClient;
