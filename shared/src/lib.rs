//! Shared types for the pairing bot
//!
//! Identifiers, canonical pair keys and logging setup used by every
//! component of the workspace.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
