use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use log::{debug, info};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::CacheConfig;
use crate::discovery::OperationDiscovery;
use crate::parse::document::Document;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Store<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V> Store<V> {
    fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}

/// Entry counts at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}

/// A URL-keyed, time-expiring, size-bounded store safe for concurrent use.
///
/// Values are replaced whole and never mutated in place. When built inside
/// a tokio runtime a background task sweeps expired entries on a fixed
/// interval until [`TtlCache::shutdown`] is called or the cache is dropped.
pub struct TtlCache<V> {
    store: Arc<Store<V>>,
    shutdown: watch::Sender<bool>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(ttl: Duration, max_entries: usize, cleanup_interval: Duration) -> Self {
        let store = Arc::new(Store {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        });
        let (shutdown, rx) = watch::channel(false);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(sweep(Arc::downgrade(&store), cleanup_interval, rx));
            }
            Err(_) => debug!("no tokio runtime, background cache sweep disabled"),
        }
        Self { store, shutdown }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries, config.cleanup_interval())
    }

    /// The value for `key` unless it is absent or expired. Expired entries
    /// are left for the sweeper.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.store.entries.read();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!("cache hit for {key}");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("cache entry for {key} expired");
                None
            }
            None => {
                debug!("cache miss for {key}");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.store.ttl);
    }

    /// Insert or replace. A full cache first evicts the entry closest to
    /// expiry.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let mut entries = self.store.entries.write();
        if !entries.contains_key(key) && entries.len() >= self.store.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("cache full, evicting {oldest}");
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Returns whether an entry was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.store.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.store.entries.write().clear();
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.store.cleanup()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.store.entries.read();
        let active = entries.values().filter(|e| e.expires_at > now).count();
        CacheStats {
            total: entries.len(),
            active,
            expired: entries.len() - active,
        }
    }

    pub fn len(&self) -> usize {
        self.store.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.store.ttl
    }
}

impl<V> TtlCache<V> {
    /// Stop the background sweep. Entries stay readable.
    pub fn shutdown(&self) {
        // Errors only when the sweeper has already exited.
        let _ = self.shutdown.send(true);
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn sweep<V>(store: Weak<Store<V>>, every: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else { break };
                let removed = store.cleanup();
                if removed > 0 {
                    debug!("cache sweep removed {removed} expired entries");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("cache sweep stopped");
}

/// A parsed document and the discovery state derived from it.
#[derive(Debug, Clone)]
pub struct SpecEntry {
    pub document: Arc<Document>,
    pub discovery: Arc<OperationDiscovery>,
}

/// Document cache keyed by source URL.
pub type SpecCache = TtlCache<SpecEntry>;

static SHARED: OnceLock<Arc<SpecCache>> = OnceLock::new();

impl TtlCache<SpecEntry> {
    /// Process-wide instance with default settings, created on first use.
    pub fn shared() -> Arc<SpecCache> {
        Arc::clone(SHARED.get_or_init(|| {
            info!("creating shared document cache");
            Arc::new(SpecCache::from_config(&CacheConfig::default()))
        }))
    }
}
