//! Test fixtures and data for pairbot tests
//!
//! This module provides consistent test data and fixtures used across all test suites.

use shared::{ChannelRef, MemberId};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Bot account as reported by the mock platform
    pub const BOT: &'static str = "bot";

    pub const TEAM: &'static str = "eng";
    pub const CHANNEL: &'static str = "coffee-buddies";

    /// Seeds used wherever a property must hold for any shuffle
    pub const SEEDS: [u64; 8] = [0, 1, 2, 3, 7, 42, 1234, 99_999];

    pub fn channel() -> ChannelRef {
        ChannelRef::new(Self::TEAM, Self::CHANNEL)
    }

    pub fn other_channel() -> ChannelRef {
        ChannelRef::new("sales", "lunch-roulette")
    }

    pub fn ids(raw: &[&str]) -> Vec<MemberId> {
        raw.iter().map(|s| MemberId::from(*s)).collect()
    }

    /// `count` members named `m00`, `m01`, ...
    pub fn members(count: usize) -> Vec<MemberId> {
        (0..count).map(|i| MemberId::new(format!("m{i:02}"))).collect()
    }

    /// Scenario with four members who all know each other
    pub fn four_friends() -> Vec<MemberId> {
        Self::ids(&["alice", "bob", "carol", "dave"])
    }

    /// Channel roster as the platform reports it: bot included, one duplicate
    pub fn raw_roster() -> Vec<MemberId> {
        Self::ids(&["bot", "carol", "alice", "bob", "alice", "dave"])
    }
}
