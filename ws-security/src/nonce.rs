//! Replay protection for digest UsernameTokens
//!
//! Every nonce accepted by the validator is recorded with its first-seen
//! time. A nonce cannot be accepted again until the periodic sweep has
//! purged it, which only happens after the TTL has elapsed.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default lifetime of a recorded nonce.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(300);

/// Set of recently seen client nonces.
#[derive(Debug)]
pub struct NonceCache {
    seen: DashMap<String, Instant>,
    ttl: Duration,
    shutdown: CancellationToken,
}

impl Default for NonceCache {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_TTL)
    }
}

impl NonceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
            shutdown: CancellationToken::new(),
        }
    }

    /// Record a nonce. Returns `false` if it was already present.
    ///
    /// The check and the insert happen under the same shard lock, so two
    /// concurrent callers with the same nonce can never both get `true`.
    pub fn record(&self, nonce: &str) -> bool {
        match self.seen.entry(nonce.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                true
            }
        }
    }

    /// Number of nonces currently tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Drop nonces older than the TTL.
    pub fn sweep(&self) {
        let ttl = self.ttl;
        let before = self.seen.len();
        self.seen.retain(|_, first_seen| first_seen.elapsed() < ttl);
        let removed = before.saturating_sub(self.seen.len());
        if removed > 0 {
            tracing::debug!(removed, "Purged expired nonces");
        }
    }

    /// Start the background sweep. It runs until [`NonceCache::shutdown`] is called.
    pub fn start_sweep(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Nonce sweep stopped");
                        break;
                    }
                    _ = ticker.tick() => cache.sweep(),
                }
            }
        })
    }

    /// Stop the background sweep.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
