//! Test helpers and builder patterns for pairbot tests
//!
//! This module provides convenient helper functions and builder patterns
//! to reduce test boilerplate and improve maintainability.

use std::collections::{BTreeSet, HashSet};

use pairbot::services::MemoryLedgerStore;
use pairbot::traits::MockChatPlatform;
use pairbot::{Ledger, MatchingEngine, Messages, PairbotError, PairbotResult, PairingRepository, RoundOrchestrator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{MemberId, RoundAssignment};

use super::fixtures::TestFixtures;

/// Type alias for an orchestrator over the in-memory store and a mock platform
pub type TestOrchestrator = RoundOrchestrator<MemoryLedgerStore, MockChatPlatform>;

/// Builder pattern for creating test orchestrators with sensible defaults
pub struct OrchestratorBuilder {
    store: MemoryLedgerStore,
    roster: Vec<MemberId>,
    messages: Messages,
    seed: u64,
    dry_run: bool,
    platform: MockChatPlatform,
}

impl OrchestratorBuilder {
    /// Builder whose platform reports the standard roster and bot identity
    pub fn new() -> Self {
        Self {
            store: MemoryLedgerStore::new(),
            roster: TestFixtures::raw_roster(),
            messages: Messages::default(),
            seed: 7,
            dry_run: false,
            platform: MockChatPlatform::new(),
        }
    }

    pub fn with_store(mut self, store: MemoryLedgerStore) -> Self {
        self.store = store;
        self
    }

    /// Members the platform reports for every channel
    pub fn with_roster(mut self, roster: Vec<MemberId>) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Configure messaging expectations on the platform mock
    pub fn with_platform<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockChatPlatform),
    {
        setup(&mut self.platform);
        self
    }

    /// Accept every notification
    pub fn notify_ok(self) -> Self {
        self.with_platform(|platform| {
            platform.expect_message_group().returning(|_, _| Ok(())).times(0..);
        })
    }

    /// Build the orchestrator with all configured mocks
    pub fn build(self) -> TestOrchestrator {
        let mut platform = self.platform;
        let roster = self.roster;

        platform
            .expect_login()
            .returning(|| Ok(MemberId::from(TestFixtures::BOT)))
            .times(0..);
        platform
            .expect_channel_members()
            .returning(move |_| Ok(roster.clone()))
            .times(0..);

        RoundOrchestrator::new(self.store, platform, self.messages)
            .with_seed(Some(self.seed))
            .with_dry_run(self.dry_run)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Repository wrapper that fails the n-th `record_match` call
pub struct FaultyRepository<'a> {
    inner: &'a mut Ledger,
    fail_on: usize,
    calls: usize,
}

impl<'a> FaultyRepository<'a> {
    /// `fail_on` is 1-based
    pub fn new(inner: &'a mut Ledger, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            calls: 0,
        }
    }
}

impl PairingRepository for FaultyRepository<'_> {
    fn sync_active(&mut self, active_ids: &[MemberId]) -> PairbotResult<()> {
        self.inner.sync_active(active_ids)
    }

    fn ensure_pairs(&mut self, active_ids: &[MemberId]) -> PairbotResult<()> {
        self.inner.ensure_pairs(active_ids)
    }

    fn record_match(&mut self, a: &MemberId, b: &MemberId) -> PairbotResult<u32> {
        self.calls += 1;
        if self.calls == self.fail_on {
            return Err(PairbotError::storage("injected write failure"));
        }
        self.inner.record_match(a, b)
    }

    fn lowest_count_partner(
        &self,
        member: &MemberId,
        candidates: &BTreeSet<MemberId>,
    ) -> PairbotResult<Option<MemberId>> {
        self.inner.lowest_count_partner(member, candidates)
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    pub fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// Ledger with `members` registered active and every pair back-filled at zero
    pub fn prepared_ledger(members: &[MemberId]) -> Ledger {
        let mut ledger = Ledger::new();
        ledger.sync_active(members).unwrap();
        ledger.ensure_pairs(members).unwrap();
        ledger
    }

    /// Bump a pair's count `times` times
    pub fn meet(ledger: &mut Ledger, a: &str, b: &str, times: u32) {
        for _ in 0..times {
            ledger.record_match(&a.into(), &b.into()).unwrap();
        }
    }

    /// Run one round against a ledger inside a transaction, as the orchestrator does
    pub fn run_round(ledger: &mut Ledger, members: &[MemberId], seed: u64) -> PairbotResult<RoundAssignment> {
        let mut rng = Self::rng(seed);
        ledger.transaction(|tx| {
            tx.sync_active(members)?;
            tx.ensure_pairs(members)?;
            MatchingEngine::new().match_round(tx, members, &mut rng)
        })
    }

    /// Every active member appears exactly once; leftover only when odd
    pub fn assert_partition(assignment: &RoundAssignment, active: &[MemberId]) {
        let expected: HashSet<&MemberId> = active.iter().collect();
        let placed = assignment.members();
        let unique: HashSet<&MemberId> = placed.iter().copied().collect();

        assert_eq!(placed.len(), unique.len(), "a member was placed twice: {assignment:?}");
        assert_eq!(unique, expected, "assignment does not cover the active set");
        assert_eq!(assignment.pairs.len(), expected.len() / 2);
        assert_eq!(assignment.leftover.is_some(), expected.len() % 2 == 1);
        for (a, b) in &assignment.pairs {
            assert_ne!(a, b, "self-pair in {assignment:?}");
        }
    }

    /// Sum of all pair counts in the ledger
    pub fn total_count(ledger: &Ledger) -> u64 {
        ledger.history().iter().map(|r| u64::from(r.count)).sum()
    }
}
