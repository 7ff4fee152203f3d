//! Round orchestrator
//!
//! Sequences one pairing round per channel: run lock, member fetch, registry
//! sync, history back-fill, matching, commit, and notifications. The core
//! steps run inside a single ledger transaction, so any failure before the
//! commit leaves the stored ledger untouched.

use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{logging, round_debug, round_info, round_warn, ChannelRef, MemberId, RoundAssignment};

use crate::config::Messages;
use crate::core::{roster, Ledger, MatchingEngine};
use crate::error::{PairbotError, PairbotResult};
use crate::traits::{ChatPlatform, LedgerStore, PairingRepository};

/// Outcome of one channel's round
#[derive(Debug, Clone)]
pub struct ChannelReport {
    pub channel: ChannelRef,
    pub assignment: RoundAssignment,
    /// Whether the ledger was persisted (false for dry runs)
    pub committed: bool,
    /// Conversations successfully notified
    pub notified: usize,
    /// Recipients whose notification failed, with the error text
    pub failed_notifications: Vec<(Vec<MemberId>, String)>,
}

/// Main orchestrator that runs rounds against injected collaborators
pub struct RoundOrchestrator<S, P>
where
    S: LedgerStore + 'static,
    P: ChatPlatform + 'static,
{
    /// Injected services
    store: S,
    platform: P,

    engine: MatchingEngine,
    messages: Messages,
    rng: StdRng,
    dry_run: bool,

    /// Bot's own member id, known after login
    bot_id: Option<MemberId>,
}

impl<S, P> RoundOrchestrator<S, P>
where
    S: LedgerStore + 'static,
    P: ChatPlatform + 'static,
{
    /// Create new orchestrator with injected dependencies
    pub fn new(store: S, platform: P, messages: Messages) -> Self {
        Self {
            store,
            platform,
            engine: MatchingEngine::new(),
            messages,
            rng: StdRng::from_entropy(),
            dry_run: false,
            bot_id: None,
        }
    }

    /// Fix the shuffle seed; `None` keeps the entropy-seeded generator
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self
    }

    /// Compute assignments without committing or messaging anyone
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Authenticate with the chat platform
    pub async fn initialize(&mut self) -> PairbotResult<()> {
        let bot_id = self.platform.login().await?;
        tracing::debug!(%bot_id, "🔑 Logged in");
        self.bot_id = Some(bot_id);
        Ok(())
    }

    async fn bot_id(&mut self) -> PairbotResult<MemberId> {
        if self.bot_id.is_none() {
            self.initialize().await?;
        }
        self.bot_id.clone().ok_or_else(|| PairbotError::Platform {
            status: None,
            message: "bot identity unknown after login".to_string(),
        })
    }

    /// Run rounds for every channel, continuing past failures
    pub async fn run_all(&mut self, channels: &[ChannelRef]) -> Vec<PairbotResult<ChannelReport>> {
        let mut outcomes = Vec::with_capacity(channels.len());
        for channel in channels {
            let outcome = self.run_round(channel).await;
            if let Err(e) = &outcome {
                logging::log_error(channel, "Pairing round", e);
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Run one pairing round for a channel
    pub async fn run_round(&mut self, channel: &ChannelRef) -> PairbotResult<ChannelReport> {
        let _lease = self.store.acquire(channel).await?;

        if let (Some(announcement), false) = (&self.messages.announcement, self.dry_run) {
            if let Err(e) = self.platform.post_to_channel(channel, announcement).await {
                round_warn!(channel, "⚠️ Could not post announcement: {}", e);
            }
        }

        logging::log_progress(channel, "Retrieving participants", "fetching channel members");
        let bot_id = self.bot_id().await?;
        let raw_members = self.platform.channel_members(channel).await?;
        let active = roster::normalize(raw_members, &[bot_id]);
        round_debug!(channel, "👥 {} active participants", active.len());

        let mut ledger = self.store.load(channel).await?;
        let assignment = self.pair_members(&mut ledger, &active)?;
        round_info!(
            channel,
            "🤝 Paired {} couples{}",
            assignment.pairs.len(),
            if assignment.leftover.is_some() { " with one member left over" } else { "" }
        );

        if self.dry_run {
            round_info!(channel, "🧪 Dry run: ledger not committed, nobody messaged");
            return Ok(ChannelReport {
                channel: channel.clone(),
                assignment,
                committed: false,
                notified: 0,
                failed_notifications: Vec::new(),
            });
        }

        self.store.commit(channel, &ledger).await?;
        logging::log_success(channel, "Committed pairing history");

        let (notified, failed_notifications) = self.notify(channel, &assignment).await;
        Ok(ChannelReport {
            channel: channel.clone(),
            assignment,
            committed: true,
            notified,
            failed_notifications,
        })
    }

    /// Registry sync, back-fill and matching as one transaction
    fn pair_members(&mut self, ledger: &mut Ledger, active: &[MemberId]) -> PairbotResult<RoundAssignment> {
        let engine = self.engine;
        let rng = &mut self.rng;
        ledger.transaction(|tx| {
            tx.sync_active(active)?;
            tx.ensure_pairs(active)?;
            engine.match_round(tx, active, rng)
        })
    }

    /// Message every pair and the leftover; failures are collected, not fatal
    async fn notify(&self, channel: &ChannelRef, assignment: &RoundAssignment) -> (usize, Vec<(Vec<MemberId>, String)>) {
        let mut conversations: Vec<(Vec<MemberId>, &str)> = assignment
            .pairs
            .iter()
            .map(|(a, b)| (vec![a.clone(), b.clone()], self.messages.pair.as_str()))
            .collect();
        if let Some(leftover) = &assignment.leftover {
            conversations.push((vec![leftover.clone()], self.messages.unmatched.as_str()));
        }

        let mut notified = 0;
        let mut failed = Vec::new();
        for (members, message) in conversations {
            match self.platform.message_group(&members, message).await {
                Ok(()) => notified += 1,
                Err(e) => {
                    round_warn!(channel, "⚠️ Could not message {:?}: {}", members, e);
                    failed.push((members, e.to_string()));
                }
            }
        }

        round_info!(channel, "📨 Messaged {} conversations ({} failed)", notified, failed.len());
        (notified, failed)
    }
}

/// Render a ledger's pair counts, most frequent first
pub fn render_history(channel: &ChannelRef, ledger: &Ledger) -> String {
    let mut out = format!(
        "{channel}: {} members ({} active), {} pairs\n",
        ledger.registry().len(),
        ledger.active_members().len(),
        ledger.history().len()
    );
    for record in ledger.history().by_count_desc() {
        out.push_str(&format!("{:>5}  {} <-> {}\n", record.count, record.member_low, record.member_high));
    }
    out
}
