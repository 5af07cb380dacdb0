//! In-memory game-log cache.
//!
//! Lookups hit the cache first; a miss calls the configured provider once,
//! stores the result under `"{athlete}_{season}"` and returns it. Entries
//! never go stale. A provider failure is cached as an empty log, so it stays
//! sticky for the life of the entry.
//!
//! No lock is held while the provider runs. Two concurrent misses for the
//! same key may both fetch; the later insert wins and readers only ever see
//! a complete log.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::game_log::{GameLog, GameLogProvider};

/// How the cache bounds its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep every entry for the process lifetime.
    Unbounded,
    /// Keep at most `capacity` entries, dropping the least recently used.
    Lru { capacity: NonZeroUsize },
}

impl EvictionPolicy {
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity.and_then(NonZeroUsize::new) {
            Some(capacity) => EvictionPolicy::Lru { capacity },
            None => EvictionPolicy::Unbounded,
        }
    }
}

pub fn cache_key(athlete: &str, season: i32) -> String {
    format!("{athlete}_{season}")
}

/// Thread-safe cache handle; clones share the same entries.
#[derive(Clone)]
pub struct GameLogCache {
    inner: Arc<RwLock<CacheInner>>,
    provider: Arc<dyn GameLogProvider>,
    policy: EvictionPolicy,
    /// Monotonic access counter used for LRU ordering.
    clock: Arc<AtomicU64>,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
}

struct CacheEntry {
    log: GameLog,
    last_access: AtomicU64,
}

impl GameLogCache {
    pub fn new(provider: Arc<dyn GameLogProvider>, policy: EvictionPolicy) -> Self {
        GameLogCache {
            inner: Arc::new(RwLock::new(CacheInner {
                entries: HashMap::new(),
            })),
            provider,
            policy,
            clock: Arc::new(AtomicU64::new(0)),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Return the cached log for (athlete, season), fetching it on a miss.
    ///
    /// Never fails: provider errors produce (and cache) an empty log.
    pub async fn get_or_fetch(
        &self,
        athlete: &str,
        season: i32,
        provider_id: Option<&str>,
    ) -> GameLog {
        let key = cache_key(athlete, season);

        {
            let inner = self.inner.read().await;
            if let Some(entry) = inner.entries.get(&key) {
                entry.last_access.store(self.tick(), Ordering::Relaxed);
                debug!("GameLogCache hit: {} ({} games)", key, entry.log.len());
                return Arc::clone(&entry.log);
            }
        }

        debug!("GameLogCache miss: {} (provider={})", key, self.provider.name());
        let games = match self
            .provider
            .fetch_game_log(athlete, season, provider_id)
            .await
        {
            Ok(games) => games,
            Err(e) => {
                warn!(
                    "Provider '{}' failed for {}: {:#}",
                    self.provider.name(),
                    key,
                    e
                );
                Vec::new()
            }
        };
        let log: GameLog = Arc::new(games);

        let mut inner = self.inner.write().await;
        inner.entries.insert(
            key,
            CacheEntry {
                log: Arc::clone(&log),
                last_access: AtomicU64::new(self.tick()),
            },
        );
        self.evict(&mut inner);
        log
    }

    fn evict(&self, inner: &mut CacheInner) {
        let EvictionPolicy::Lru { capacity } = self.policy else {
            return;
        };
        while inner.entries.len() > capacity.get() {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access.load(Ordering::Relaxed))
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    inner.entries.remove(&key);
                    debug!("GameLogCache evicted {}", key);
                }
                None => break,
            }
        }
    }

    /// Number of cached logs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}
