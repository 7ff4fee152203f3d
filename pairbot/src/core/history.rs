//! Pairing history store
//!
//! One row per unordered pair of members that have ever been active together,
//! counting how many rounds the pair has been matched.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{MemberId, PairKey};

use super::registry::MemberRegistry;
use crate::error::{PairbotError, PairbotResult};

/// History row for one canonical pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRecord {
    pub member_low: MemberId,
    pub member_high: MemberId,
    pub count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PairRecord {
    fn new(key: &PairKey, now: DateTime<Utc>) -> Self {
        Self {
            member_low: key.low().clone(),
            member_high: key.high().clone(),
            count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Canonical key of this row; fails for self-pairs
    pub fn key(&self) -> PairbotResult<PairKey> {
        Ok(PairKey::of(&self.member_low, &self.member_high)?)
    }
}

/// PairRecord table keyed by canonical pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairHistory {
    records: BTreeMap<PairKey, PairRecord>,
}

impl PairHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a zero-count row for every pair drawn from `active_ids`
    ///
    /// Existing rows keep their count. Input order does not matter: keys are
    /// canonicalized before lookup. Returns the number of rows created.
    pub fn ensure_pairs(&mut self, active_ids: &[MemberId], now: DateTime<Utc>) -> usize {
        let mut created = 0;
        for (i, first) in active_ids.iter().enumerate() {
            for second in &active_ids[i + 1..] {
                // Duplicate ids would form a self-pair; there is nothing to record
                let Ok(key) = PairKey::of(first, second) else {
                    continue;
                };
                if !self.records.contains_key(&key) {
                    let record = PairRecord::new(&key, now);
                    self.records.insert(key, record);
                    created += 1;
                }
            }
        }
        created
    }

    /// Bump the count of `{a, b}` by exactly one, returning the new count
    pub fn record_match(&mut self, a: &MemberId, b: &MemberId, now: DateTime<Utc>) -> PairbotResult<u32> {
        let key = PairKey::of(a, b)?;
        let record = self
            .records
            .get_mut(&key)
            .ok_or_else(|| PairbotError::NotFound { pair: key.clone() })?;
        record.count = record.count.checked_add(1).ok_or_else(|| PairbotError::CorruptLedger {
            reason: format!("pair count for {key} cannot grow past {}", u32::MAX),
        })?;
        record.updated_at = now;
        Ok(record.count)
    }

    pub fn count(&self, a: &MemberId, b: &MemberId) -> Option<u32> {
        let key = PairKey::of(a, b).ok()?;
        self.records.get(&key).map(|r| r.count)
    }

    /// Least-matched eligible partner for `member`
    ///
    /// Eligible means: in `candidates`, not `member` itself, active in the
    /// registry, and sharing a history row with `member`. Ties on count go to
    /// the lowest identifier.
    pub fn lowest_count_partner(
        &self,
        member: &MemberId,
        candidates: &BTreeSet<MemberId>,
        registry: &MemberRegistry,
    ) -> Option<MemberId> {
        let mut best: Option<(&MemberId, u32)> = None;

        // BTreeSet iterates in ascending order, so a strict `<` keeps the lowest id on ties
        for candidate in candidates {
            if candidate == member || !registry.is_active(candidate) {
                continue;
            }
            let Some(count) = self.count(member, candidate) else {
                continue;
            };
            match best {
                Some((_, best_count)) if best_count <= count => {}
                _ => best = Some((candidate, count)),
            }
        }

        best.map(|(id, _)| id.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairRecord> {
        self.records.values()
    }

    /// Rows ordered by count, highest first, then by key
    pub fn by_count_desc(&self) -> Vec<&PairRecord> {
        let mut rows: Vec<&PairRecord> = self.records.values().collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }

    /// Insert a loaded row; rejects non-canonical keys and duplicates
    pub(crate) fn insert_loaded(&mut self, record: PairRecord) -> PairbotResult<()> {
        let key = record.key().map_err(|_| PairbotError::CorruptLedger {
            reason: format!("self-pair row for {}", record.member_low),
        })?;
        if key.low() != &record.member_low {
            return Err(PairbotError::CorruptLedger {
                reason: format!("non-canonical pair row {} / {}", record.member_low, record.member_high),
            });
        }
        if self.records.contains_key(&key) {
            return Err(PairbotError::CorruptLedger {
                reason: format!("duplicate pair row {key}"),
            });
        }
        self.records.insert(key, record);
        Ok(())
    }
}
