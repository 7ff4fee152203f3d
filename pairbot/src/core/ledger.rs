//! Ledger: the member registry and pairing history of one channel
//!
//! A ledger is loaded whole, mutated through [`Ledger::transaction`], and
//! committed whole. A failed transaction leaves the ledger exactly as it was.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::MemberId;

use super::history::{PairHistory, PairRecord};
use super::registry::{Member, MemberRegistry};
use crate::error::{PairbotError, PairbotResult};
use crate::traits::PairingRepository;

/// On-disk format version
pub const LEDGER_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "LedgerFile", try_from = "LedgerFile")]
pub struct Ledger {
    registry: MemberRegistry,
    history: PairHistory,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &MemberRegistry {
        &self.registry
    }

    pub fn history(&self) -> &PairHistory {
        &self.history
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.registry.get(id)
    }

    pub fn active_members(&self) -> Vec<MemberId> {
        self.registry.active_ids()
    }

    pub fn pair_count(&self, a: &MemberId, b: &MemberId) -> Option<u32> {
        self.history.count(a, b)
    }

    /// Run `f` against a working copy and keep the result only on success
    pub fn transaction<T, F>(&mut self, f: F) -> PairbotResult<T>
    where
        F: FnOnce(&mut Ledger) -> PairbotResult<T>,
    {
        let mut working = self.clone();
        let output = f(&mut working)?;
        *self = working;
        Ok(output)
    }
}

impl PairingRepository for Ledger {
    fn sync_active(&mut self, active_ids: &[MemberId]) -> PairbotResult<()> {
        let summary = self.registry.sync_active(active_ids, Utc::now());
        tracing::debug!(
            created = summary.created,
            reactivated = summary.reactivated,
            deactivated = summary.deactivated,
            "Synchronized member registry"
        );
        Ok(())
    }

    fn ensure_pairs(&mut self, active_ids: &[MemberId]) -> PairbotResult<()> {
        let created = self.history.ensure_pairs(active_ids, Utc::now());
        tracing::debug!(created, total = self.history.len(), "Back-filled pair history");
        Ok(())
    }

    fn record_match(&mut self, a: &MemberId, b: &MemberId) -> PairbotResult<u32> {
        self.history.record_match(a, b, Utc::now())
    }

    fn lowest_count_partner(
        &self,
        member: &MemberId,
        candidates: &BTreeSet<MemberId>,
    ) -> PairbotResult<Option<MemberId>> {
        Ok(self.history.lowest_count_partner(member, candidates, &self.registry))
    }
}

/// Serialized shape of a ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    members: Vec<Member>,
    pairs: Vec<PairRecord>,
}

impl From<Ledger> for LedgerFile {
    fn from(ledger: Ledger) -> Self {
        Self {
            version: LEDGER_VERSION,
            members: ledger.registry.iter().cloned().collect(),
            pairs: ledger.history.iter().cloned().collect(),
        }
    }
}

impl TryFrom<LedgerFile> for Ledger {
    type Error = PairbotError;

    fn try_from(file: LedgerFile) -> Result<Self, Self::Error> {
        if file.version != LEDGER_VERSION {
            return Err(PairbotError::CorruptLedger {
                reason: format!("unsupported ledger version {}", file.version),
            });
        }

        let mut ledger = Ledger::new();
        for member in file.members {
            let id = member.id.clone();
            if !ledger.registry.insert_loaded(member) {
                return Err(PairbotError::CorruptLedger {
                    reason: format!("duplicate member row {id}"),
                });
            }
        }
        for record in file.pairs {
            ledger.history.insert_loaded(record)?;
        }
        Ok(ledger)
    }
}
