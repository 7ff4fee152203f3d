//! Core business logic modules
//!
//! This module contains pure business logic with no I/O dependencies.
//! Everything here is deterministic given a seeded random source.

pub mod engine;
pub mod history;
pub mod ledger;
pub mod registry;
pub mod roster;

pub use engine::MatchingEngine;
pub use history::{PairHistory, PairRecord};
pub use ledger::Ledger;
pub use registry::{Member, MemberRegistry, SyncSummary};
