//! Roster normalization
//!
//! Turns the raw member list reported by the chat platform into the
//! canonical active set the registry, history and engine expect.

use std::collections::BTreeSet;

use shared::MemberId;

/// Drop excluded and empty identifiers, deduplicate, sort canonically
pub fn normalize<I>(raw_ids: I, exclude: &[MemberId]) -> Vec<MemberId>
where
    I: IntoIterator<Item = MemberId>,
{
    raw_ids
        .into_iter()
        .filter(|id| !id.is_empty() && !exclude.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
