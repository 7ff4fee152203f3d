//! Trait definitions with mockall annotations for testing
//!
//! These traits are the seams between the matching core and its
//! collaborators: the pairing repository the engine reads and writes, the
//! store that persists ledgers, and the chat platform that supplies members
//! and delivers messages.

use std::collections::BTreeSet;
use std::fmt;

use shared::{ChannelRef, MemberId};

use crate::core::Ledger;
use crate::error::PairbotResult;

/// Run lock for one channel, released on drop
pub struct RoundLease {
    channel: ChannelRef,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl RoundLease {
    pub fn new<F>(channel: ChannelRef, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            channel,
            release: Some(Box::new(release)),
        }
    }

    /// A lease with nothing to release
    pub fn detached(channel: ChannelRef) -> Self {
        Self { channel, release: None }
    }

    pub fn channel(&self) -> &ChannelRef {
        &self.channel
    }
}

impl Drop for RoundLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for RoundLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundLease")
            .field("channel", &self.channel)
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// Repository interface the matching engine works against
///
/// Implemented by [`Ledger`]; test doubles can inject failures at any step.
#[mockall::automock]
pub trait PairingRepository {
    /// Mark exactly `active_ids` active, inserting unseen members
    fn sync_active(&mut self, active_ids: &[MemberId]) -> PairbotResult<()>;

    /// Make sure every pair drawn from `active_ids` has a history row
    fn ensure_pairs(&mut self, active_ids: &[MemberId]) -> PairbotResult<()>;

    /// Increment the count of `{a, b}` by one and return the new count
    ///
    /// Fails with `NotFound` if the pair has no history row.
    fn record_match(&mut self, a: &MemberId, b: &MemberId) -> PairbotResult<u32>;

    /// Active member in `candidates` that `member` has met the fewest times
    ///
    /// `candidates` is the set of members still unpaired this round; anyone
    /// to exclude is simply left out of it. Ties go to the lowest identifier.
    fn lowest_count_partner(
        &self,
        member: &MemberId,
        candidates: &BTreeSet<MemberId>,
    ) -> PairbotResult<Option<MemberId>>;
}

/// Ledger persistence abstraction for dependency injection
#[mockall::automock]
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Take the run lock for a channel
    ///
    /// Fails with `RoundInProgress` while another lease for the channel is alive.
    async fn acquire(&self, channel: &ChannelRef) -> PairbotResult<RoundLease>;

    /// Load the channel's ledger, or an empty one if none was committed yet
    async fn load(&self, channel: &ChannelRef) -> PairbotResult<Ledger>;

    /// Atomically replace the channel's persisted ledger
    async fn commit(&self, channel: &ChannelRef, ledger: &Ledger) -> PairbotResult<()>;
}

/// Chat platform abstraction for dependency injection
#[mockall::automock]
#[async_trait::async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Authenticate and return the bot's own member id
    async fn login(&self) -> PairbotResult<MemberId>;

    /// Raw member ids of a channel, bot included
    async fn channel_members(&self, channel: &ChannelRef) -> PairbotResult<Vec<MemberId>>;

    /// Post a message into the channel itself
    async fn post_to_channel(&self, channel: &ChannelRef, message: &str) -> PairbotResult<()>;

    /// Open a group (or direct) conversation with `members` and post a message
    async fn message_group(&self, members: &[MemberId], message: &str) -> PairbotResult<()>;
}
