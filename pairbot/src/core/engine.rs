//! Matching engine
//!
//! Greedy round-local matcher: shuffle the active members, then repeatedly
//! take the first unresolved member and pair it with the eligible partner it
//! has met the fewest times. Not globally optimal; fairness comes from
//! repeating it over many rounds.

use std::collections::{BTreeSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use shared::{MemberId, RoundAssignment};

use crate::error::{PairbotError, PairbotResult};
use crate::traits::PairingRepository;

/// Produces one round's assignment from the active set and pair history
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingEngine;

impl MatchingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Partition `active_ids` into pairs plus at most one leftover
    ///
    /// The repository must already hold a history row for every pair of
    /// `active_ids`. Each chosen pair's count is incremented through the
    /// repository; on error the caller is expected to discard those
    /// increments (see [`crate::core::Ledger::transaction`]).
    pub fn match_round<P, R>(&self, repo: &mut P, active_ids: &[MemberId], rng: &mut R) -> PairbotResult<RoundAssignment>
    where
        P: PairingRepository + ?Sized,
        R: Rng + ?Sized,
    {
        // Deduplicate while keeping canonical order before shuffling
        let unique: BTreeSet<MemberId> = active_ids.iter().cloned().collect();

        if unique.len() < 2 {
            return Ok(RoundAssignment {
                pairs: Vec::new(),
                leftover: unique.into_iter().next(),
            });
        }

        let mut order: Vec<MemberId> = unique.iter().cloned().collect();
        order.shuffle(rng);
        let mut working: VecDeque<MemberId> = order.into();
        let mut unpaired = unique;
        let mut pairs = Vec::with_capacity(working.len() / 2);

        while working.len() > 1 {
            let Some(member) = working.pop_front() else {
                break;
            };
            unpaired.remove(&member);

            let partner = repo
                .lowest_count_partner(&member, &unpaired)?
                .ok_or_else(|| PairbotError::NoPartner { member: member.to_string() })?;

            let count = repo.record_match(&member, &partner)?;
            tracing::debug!(%member, %partner, count, "Matched pair");

            unpaired.remove(&partner);
            working.retain(|id| id != &partner);
            pairs.push((member, partner));
        }

        let leftover = working.pop_front();
        if let Some(ref member) = leftover {
            tracing::debug!(%member, "Member left unmatched this round");
        }

        Ok(RoundAssignment { pairs, leftover })
    }
}
