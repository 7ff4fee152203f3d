//! Member registry
//!
//! Durable record of every member ever seen in a channel, with the flag that
//! says whether they showed up in the most recent sync.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::MemberId;

/// One participant row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn new(id: MemberId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Member table keyed by identifier; rows are never deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberRegistry {
    members: BTreeMap<MemberId, Member>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark exactly `active_ids` active, creating rows for unseen members
    ///
    /// `updated_at` only moves when a row's flag actually flips, so repeating
    /// a sync with the same list leaves the table unchanged.
    pub fn sync_active(&mut self, active_ids: &[MemberId], now: DateTime<Utc>) -> SyncSummary {
        let mut summary = SyncSummary::default();

        for member in self.members.values_mut() {
            let active = active_ids.contains(&member.id);
            if member.active != active {
                member.active = active;
                member.updated_at = now;
                if active {
                    summary.reactivated += 1;
                } else {
                    summary.deactivated += 1;
                }
            }
        }

        for id in active_ids {
            if !self.members.contains_key(id) {
                self.members.insert(id.clone(), Member::new(id.clone(), now));
                summary.created += 1;
            }
        }

        summary
    }

    pub fn get(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn is_active(&self, id: &MemberId) -> bool {
        self.members.get(id).is_some_and(|m| m.active)
    }

    /// Active member identifiers in canonical order
    pub fn active_ids(&self) -> Vec<MemberId> {
        self.members.values().filter(|m| m.active).map(|m| m.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Insert a loaded row; returns false if the id was already present
    pub(crate) fn insert_loaded(&mut self, member: Member) -> bool {
        if self.members.contains_key(&member.id) {
            return false;
        }
        self.members.insert(member.id.clone(), member);
        true
    }
}

/// What a registry sync changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub reactivated: usize,
    pub deactivated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ids(raw: &[&str]) -> Vec<MemberId> {
        raw.iter().map(|s| MemberId::from(*s)).collect()
    }

    #[test]
    fn test_sync_creates_and_activates() {
        let mut registry = MemberRegistry::new();
        let summary = registry.sync_active(&ids(&["a", "b"]), Utc::now());

        assert_eq!(summary.created, 2);
        assert_eq!(registry.active_ids(), ids(&["a", "b"]));
    }

    #[test]
    fn test_sync_deactivates_missing_members() {
        let mut registry = MemberRegistry::new();
        registry.sync_active(&ids(&["a", "b", "c"]), Utc::now());
        let summary = registry.sync_active(&ids(&["a", "c"]), Utc::now());

        assert_eq!(summary.deactivated, 1);
        assert_eq!(summary.created, 0);
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_active(&"b".into()));
        assert_eq!(registry.active_ids(), ids(&["a", "c"]));
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut registry = MemberRegistry::new();
        let t0 = Utc::now();
        registry.sync_active(&ids(&["a", "b"]), t0);
        let snapshot = registry.clone();

        let summary = registry.sync_active(&ids(&["a", "b"]), t0 + Duration::minutes(5));

        assert_eq!(summary, SyncSummary::default());
        assert_eq!(registry, snapshot);
    }

    #[test]
    fn test_reactivation_touches_updated_at() {
        let mut registry = MemberRegistry::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::days(7);
        registry.sync_active(&ids(&["a", "b"]), t0);
        registry.sync_active(&ids(&["a"]), t0);
        let summary = registry.sync_active(&ids(&["a", "b"]), t1);

        assert_eq!(summary.reactivated, 1);
        let b = registry.get(&"b".into()).unwrap();
        assert!(b.active);
        assert_eq!(b.created_at, t0);
        assert_eq!(b.updated_at, t1);
    }
}
