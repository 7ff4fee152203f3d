//! Ledger store implementations
//!
//! `JsonLedgerStore` keeps one JSON document per channel on disk and uses an
//! exclusive lock file as the run lock. `MemoryLedgerStore` keeps everything
//! in process and backs tests and dry runs.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::{round_debug, ChannelRef};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::core::Ledger;
use crate::error::{PairbotError, PairbotResult};
use crate::traits::{LedgerStore, RoundLease};

/// File-backed ledger store
pub struct JsonLedgerStore {
    /// Directory holding `<slug>.json` and `<slug>.lock` files
    base_dir: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn ledger_path(&self, channel: &ChannelRef) -> PathBuf {
        self.base_dir.join(format!("{}.json", channel.slug()))
    }

    pub fn lock_path(&self, channel: &ChannelRef) -> PathBuf {
        self.base_dir.join(format!("{}.lock", channel.slug()))
    }

    fn temp_path(&self, channel: &ChannelRef) -> PathBuf {
        self.base_dir.join(format!("{}.json.tmp", channel.slug()))
    }
}

/// Lease that deletes `lock_path` when dropped
pub(crate) fn lock_lease(channel: &ChannelRef, lock_path: PathBuf) -> RoundLease {
    let name = channel.to_string();
    RoundLease::new(channel.clone(), move || {
        if let Err(e) = std::fs::remove_file(&lock_path) {
            tracing::warn!(
                channel = %name,
                "⚠️ Could not remove run lock {}: {}; later rounds stay blocked until it is deleted",
                lock_path.display(),
                e
            );
        }
    })
}

/// Record the lock owner; a failed write drops the lease, removing the lock
pub(crate) async fn stamp_owner<W>(mut writer: W, lease: RoundLease) -> PairbotResult<RoundLease>
where
    W: AsyncWrite + Unpin,
{
    let owner = format!("pid={} since={}\n", std::process::id(), chrono::Utc::now().to_rfc3339());
    let written = match writer.write_all(owner.as_bytes()).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    // Close the file before a release can try to delete it
    drop(writer);
    written?;
    Ok(lease)
}

#[async_trait]
impl LedgerStore for JsonLedgerStore {
    async fn acquire(&self, channel: &ChannelRef) -> PairbotResult<RoundLease> {
        fs::create_dir_all(&self.base_dir).await?;
        let lock_path = self.lock_path(channel);

        let file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(PairbotError::RoundInProgress {
                    channel: channel.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let lease = stamp_owner(file, lock_lease(channel, lock_path.clone())).await?;
        round_debug!(channel, "🔒 Acquired run lock {}", lock_path.display());
        Ok(lease)
    }

    async fn load(&self, channel: &ChannelRef) -> PairbotResult<Ledger> {
        let path = self.ledger_path(channel);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                round_debug!(channel, "No ledger at {}, starting fresh", path.display());
                return Ok(Ledger::new());
            }
            Err(e) => return Err(e.into()),
        };

        let ledger: Ledger = serde_json::from_str(&content)?;
        round_debug!(
            channel,
            "📂 Loaded ledger with {} members and {} pairs",
            ledger.registry().len(),
            ledger.history().len()
        );
        Ok(ledger)
    }

    async fn commit(&self, channel: &ChannelRef, ledger: &Ledger) -> PairbotResult<()> {
        fs::create_dir_all(&self.base_dir).await?;
        let content = serde_json::to_vec_pretty(ledger)?;

        // Write aside and rename so readers never see a half-written ledger
        let temp_path = self.temp_path(channel);
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        let path = self.ledger_path(channel);
        fs::rename(&temp_path, &path).await?;

        round_debug!(channel, "💾 Committed ledger to {}", path.display());
        Ok(())
    }
}

/// In-process ledger store
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    ledgers: Arc<Mutex<HashMap<ChannelRef, Ledger>>>,
    locks: Arc<Mutex<HashSet<ChannelRef>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a channel's committed ledger
    pub fn with_ledger(self, channel: ChannelRef, ledger: Ledger) -> Self {
        if let Ok(mut ledgers) = self.ledgers.lock() {
            ledgers.insert(channel, ledger);
        }
        self
    }

    /// Currently committed ledger for a channel
    pub fn snapshot(&self, channel: &ChannelRef) -> Option<Ledger> {
        self.ledgers.lock().ok()?.get(channel).cloned()
    }

    pub fn is_locked(&self, channel: &ChannelRef) -> bool {
        self.locks.lock().map(|held| held.contains(channel)).unwrap_or(false)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn acquire(&self, channel: &ChannelRef) -> PairbotResult<RoundLease> {
        let mut held = self
            .locks
            .lock()
            .map_err(|_| PairbotError::storage("lock table poisoned"))?;
        if !held.insert(channel.clone()) {
            return Err(PairbotError::RoundInProgress {
                channel: channel.to_string(),
            });
        }

        let locks = Arc::clone(&self.locks);
        let key = channel.clone();
        Ok(RoundLease::new(channel.clone(), move || {
            if let Ok(mut held) = locks.lock() {
                held.remove(&key);
            }
        }))
    }

    async fn load(&self, channel: &ChannelRef) -> PairbotResult<Ledger> {
        let ledgers = self
            .ledgers
            .lock()
            .map_err(|_| PairbotError::storage("ledger table poisoned"))?;
        Ok(ledgers.get(channel).cloned().unwrap_or_default())
    }

    async fn commit(&self, channel: &ChannelRef, ledger: &Ledger) -> PairbotResult<()> {
        let mut ledgers = self
            .ledgers
            .lock()
            .map_err(|_| PairbotError::storage("ledger table poisoned"))?;
        ledgers.insert(channel.clone(), ledger.clone());
        Ok(())
    }
}
