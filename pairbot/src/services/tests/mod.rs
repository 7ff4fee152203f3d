//! Service-specific tests
//!
//! This module contains tests for the ledger stores and the Mattermost
//! client. Each service has its own test file with dedicated helpers.


// Common test utilities for services
pub mod common {
    use shared::{ChannelRef, MemberId};

    pub fn test_channel() -> ChannelRef {
        ChannelRef::new("eng", "coffee-buddies")
    }

    pub fn ids(raw: &[&str]) -> Vec<MemberId> {
        raw.iter().map(|s| MemberId::from(*s)).collect()
    }
}
