//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

/// Stable external identifier of a meetup participant
///
/// Identifiers are opaque strings handed to us by the chat platform. Ordering
/// is plain byte-wise string comparison, which is what canonical pair ordering
/// is built on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MemberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for MemberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical form of an unordered pair of members
///
/// `low < high` always holds, so `{a, b}` and `{b, a}` map to the same key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    low: MemberId,
    high: MemberId,
}

impl PairKey {
    /// Build the canonical key for `{a, b}`; a member cannot pair with itself
    pub fn new(a: MemberId, b: MemberId) -> SharedResult<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Ok(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => Err(SharedError::SelfPair { member: a.to_string() }),
        }
    }

    /// Borrowing variant of [`PairKey::new`]
    pub fn of(a: &MemberId, b: &MemberId) -> SharedResult<Self> {
        Self::new(a.clone(), b.clone())
    }

    pub fn low(&self) -> &MemberId {
        &self.low
    }

    pub fn high(&self) -> &MemberId {
        &self.high
    }

}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.low, self.high)
    }
}

/// A meetup group: one channel inside one team
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    pub team: String,
    pub channel: String,
}

impl ChannelRef {
    pub fn new(team: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            channel: channel.into(),
        }
    }

    /// File-system safe name for this channel's ledger, unique per channel
    ///
    /// URL-name characters pass through; any other byte becomes `%XX`. The
    /// `.` separator is always escaped inside a part, so distinct channels
    /// never share a slug.
    pub fn slug(&self) -> String {
        format!("{}.{}", escape_name(&self.team), escape_name(&self.channel))
    }
}

/// Characters Mattermost allows in team and channel URL names
fn is_url_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
}

fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if is_url_name_char(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.team, self.channel)
    }
}

impl FromStr for ChannelRef {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SharedError::InvalidChannel { input: s.to_string() };
        let (team, channel) = s.trim().split_once('/').ok_or_else(invalid)?;
        let (team, channel) = (team.trim(), channel.trim());
        let valid = |name: &str| !name.is_empty() && name.chars().all(is_url_name_char);
        if !valid(team) || !valid(channel) {
            return Err(invalid());
        }
        Ok(Self::new(team, channel))
    }
}

/// Result of one matching round
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundAssignment {
    /// Pairs in the order they were resolved
    pub pairs: Vec<(MemberId, MemberId)>,
    /// The single member left over when the group size is odd
    pub leftover: Option<MemberId>,
}

impl RoundAssignment {
    /// Every member that received an assignment, pairs first
    pub fn members(&self) -> Vec<&MemberId> {
        self.pairs
            .iter()
            .flat_map(|(a, b)| [a, b])
            .chain(self.leftover.iter())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.leftover.is_none()
    }
}
