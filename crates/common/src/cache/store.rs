//! Expiring key/value store with an auxiliary key index
//!
//! Backed by `moka::sync::Cache` with a per-entry [`Expiry`] so each entry
//! carries its own snapshot of the absolute/sliding policy that was active when
//! it was added. `NeverRemove` entries live in a pinned side map and are never
//! touched by time or capacity policies.
//!
//! The key index answers `keys()` without walking moka's segments. It is
//! guarded by one mutex per store and kept consistent by the eviction
//! listener: only `Expired` and `Size` removals drop a key from the index, and
//! only when the index still points at the evicted generation. The mutex is
//! never held while calling into moka, because moka may run the listener on
//! the calling thread.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use moka::Expiry;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, trace};

use super::config::{EvictionPriority, StoreConfig};
use super::stats::{CacheStats, MetricsCollector};

/// Expiration snapshot taken when an entry is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpirationPolicy {
    /// Deadline counted from insertion
    pub absolute: Option<Duration>,
    /// Idle window renewed on read, jitter already applied
    pub sliding: Option<Duration>,
}

impl ExpirationPolicy {
    /// Lifetime granted at insertion or overwrite
    pub fn initial_ttl(&self) -> Option<Duration> {
        match (self.absolute, self.sliding) {
            (Some(a), Some(s)) => Some(a.min(s)),
            (a, s) => a.or(s),
        }
    }

    /// Lifetime granted by a read happening `age` after insertion.
    ///
    /// Returns `None` when reads do not influence expiration.
    pub fn ttl_after_read(&self, age: Duration) -> Option<Duration> {
        let sliding = self.sliding?;
        Some(match self.absolute {
            Some(absolute) => sliding.min(absolute.saturating_sub(age)),
            None => sliding,
        })
    }
}

#[derive(Debug, Clone)]
struct StoreEntry<V> {
    value: V,
    generation: u64,
    policy: ExpirationPolicy,
}

struct EntryExpiry;

impl<V> Expiry<String, StoreEntry<V>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &StoreEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.policy.initial_ttl()
    }

    fn expire_after_read(
        &self,
        _key: &String,
        entry: &StoreEntry<V>,
        read_at: Instant,
        duration_until_expiry: Option<Duration>,
        last_modified_at: Instant,
    ) -> Option<Duration> {
        entry
            .policy
            .ttl_after_read(read_at.saturating_duration_since(last_modified_at))
            .or(duration_until_expiry)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &StoreEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.policy.initial_ttl()
    }
}

type KeyIndex = Arc<Mutex<HashMap<String, u64>>>;

/// Thread-safe expiring store
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use oddsfeed_common::cache::{EvictionPriority, ExpiringStore, StoreConfig};
///
/// let store: ExpiringStore<String> =
///     ExpiringStore::new(StoreConfig::absolute("events", Duration::from_secs(60)));
/// store.add("sr:match:1", "Team A vs Team B".to_string(), EvictionPriority::Normal);
/// assert_eq!(store.get("sr:match:1").as_deref(), Some("Team A vs Team B"));
/// assert!(store.keys().contains("sr:match:1"));
/// ```
pub struct ExpiringStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    name: Arc<str>,
    config: StoreConfig,
    inner: Cache<String, StoreEntry<V>>,
    pinned: DashMap<String, V>,
    index: KeyIndex,
    generation: AtomicU64,
    metrics: MetricsCollector,
    disposed: AtomicBool,
}

impl<V> ExpiringStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a new store with the given configuration
    pub fn new(config: StoreConfig) -> Self {
        let name: Arc<str> = Arc::from(config.name.as_str());
        let index: KeyIndex = Arc::new(Mutex::new(HashMap::new()));
        let metrics = MetricsCollector::new();

        let listener = {
            let name = Arc::clone(&name);
            let index = Arc::clone(&index);
            let metrics = metrics.clone();
            move |key: Arc<String>, entry: StoreEntry<V>, cause: RemovalCause| {
                let expired = match cause {
                    // Overwrites and explicit removals are not a loss of state
                    RemovalCause::Replaced | RemovalCause::Explicit => return,
                    RemovalCause::Expired => true,
                    RemovalCause::Size => false,
                };
                {
                    let mut index = index.lock();
                    if index.get(key.as_str()) == Some(&entry.generation) {
                        index.remove(key.as_str());
                    }
                }
                if expired {
                    metrics.record_expiration();
                } else {
                    metrics.record_eviction();
                }
                debug!(store = %name, key = %key, ?cause, "store entry evicted");
            }
        };

        let mut builder = Cache::builder()
            .name(&config.name)
            .expire_after(EntryExpiry)
            .eviction_listener(listener);
        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        Self {
            name,
            config,
            inner: builder.build(),
            pinned: DashMap::new(),
            index,
            generation: AtomicU64::new(0),
            metrics,
            disposed: AtomicBool::new(false),
        }
    }

    /// Store name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Add or overwrite an entry.
    ///
    /// An empty key is a silent no-op, as is any add on a disposed store.
    pub fn add(&self, key: impl Into<String>, value: V, priority: EvictionPriority) {
        let key = key.into();
        if key.trim().is_empty() || self.is_disposed() {
            trace!(store = %self.name, "ignoring add with empty key or on disposed store");
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        match priority {
            EvictionPriority::NeverRemove => {
                self.inner.invalidate(&key);
                self.pinned.insert(key.clone(), value);
            }
            EvictionPriority::Normal => {
                self.pinned.remove(&key);
                let entry = StoreEntry { value, generation, policy: self.new_entry_policy() };
                self.inner.insert(key.clone(), entry);
            }
        }

        self.index.lock().insert(key, generation);
        self.metrics.record_insert();
    }

    /// Add an optional value; `None` is a silent no-op.
    pub fn add_optional(&self, key: impl Into<String>, value: Option<V>, priority: EvictionPriority) {
        if let Some(value) = value {
            self.add(key, value, priority);
        }
    }

    /// Get a value; renews the sliding window of `Normal` entries.
    pub fn get(&self, key: &str) -> Option<V> {
        if self.is_disposed() {
            return None;
        }

        let value = self
            .pinned
            .get(key)
            .map(|v| v.value().clone())
            .or_else(|| self.inner.get(key).map(|entry| entry.value));

        if value.is_some() {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        value
    }

    /// Return the stored value for `key`, inserting `init()` when absent.
    ///
    /// The check and the insert are atomic per key: concurrent callers all
    /// observe the same winning value. Returns `None` for an empty key or a
    /// disposed store.
    pub fn get_or_insert_with(
        &self,
        key: impl Into<String>,
        priority: EvictionPriority,
        init: impl FnOnce() -> V,
    ) -> Option<V> {
        let key = key.into();
        if key.trim().is_empty() || self.is_disposed() {
            return None;
        }

        if let Some(value) = self.pinned.get(&key).map(|v| v.value().clone()) {
            self.metrics.record_hit();
            return Some(value);
        }

        let (value, generation) = match priority {
            EvictionPriority::NeverRemove => {
                if let Some(entry) = self.inner.get(&key) {
                    self.metrics.record_hit();
                    return Some(entry.value);
                }
                match self.pinned.entry(key.clone()) {
                    Entry::Occupied(occupied) => {
                        self.metrics.record_hit();
                        return Some(occupied.get().clone());
                    }
                    Entry::Vacant(vacant) => {
                        let value = init();
                        vacant.insert(value.clone());
                        (value, self.generation.fetch_add(1, Ordering::Relaxed) + 1)
                    }
                }
            }
            EvictionPriority::Normal => {
                let entry = self.inner.entry(key.clone()).or_insert_with(|| StoreEntry {
                    value: init(),
                    generation: self.generation.fetch_add(1, Ordering::Relaxed) + 1,
                    policy: self.new_entry_policy(),
                });
                if !entry.is_fresh() {
                    self.metrics.record_hit();
                    return Some(entry.into_value().value);
                }
                let entry = entry.into_value();
                (entry.value, entry.generation)
            }
        };

        self.index.lock().insert(key, generation);
        self.metrics.record_insert();
        Some(value)
    }

    /// Remove an entry, returning its value if it was present
    pub fn remove(&self, key: &str) -> Option<V> {
        if self.is_disposed() {
            return None;
        }

        let removed = self
            .pinned
            .remove(key)
            .map(|(_, v)| v)
            .or_else(|| self.inner.remove(key).map(|entry| entry.value));
        self.index.lock().remove(key);

        if removed.is_some() {
            self.metrics.record_removal();
        }
        removed
    }

    /// Whether a retrievable entry exists (does not renew sliding windows)
    pub fn contains(&self, key: &str) -> bool {
        !self.is_disposed() && (self.pinned.contains_key(key) || self.inner.contains_key(key))
    }

    /// Set of keys currently retrievable through [`ExpiringStore::get`].
    ///
    /// Index entries whose value is no longer retrievable are pruned on the
    /// way out, so the index heals even when an eviction notice raced an add.
    pub fn keys(&self) -> BTreeSet<String> {
        if self.is_disposed() {
            return BTreeSet::new();
        }

        let snapshot: Vec<(String, u64)> =
            self.index.lock().iter().map(|(k, g)| (k.clone(), *g)).collect();

        let mut live = BTreeSet::new();
        let mut stale = Vec::new();
        for (key, generation) in snapshot {
            if self.contains(&key) {
                live.insert(key);
            } else {
                stale.push((key, generation));
            }
        }

        if !stale.is_empty() {
            let mut index = self.index.lock();
            for (key, generation) in stale {
                if index.get(&key) == Some(&generation) {
                    index.remove(&key);
                }
            }
        }
        live
    }

    /// All retrievable values
    pub fn values(&self) -> Vec<V> {
        if self.is_disposed() {
            return Vec::new();
        }
        self.pinned
            .iter()
            .map(|entry| entry.value().clone())
            .chain(self.inner.iter().map(|(_, entry)| entry.value))
            .collect()
    }

    /// Number of retrievable entries
    pub fn count(&self) -> usize {
        self.keys().len()
    }

    /// Best-effort size estimate in entry units
    pub fn size(&self) -> u64 {
        if self.is_disposed() {
            return 0;
        }
        self.inner.run_pending_tasks();
        self.inner.weighted_size() + self.pinned.len() as u64
    }

    /// Remove every entry without counting them as evictions
    pub fn clear(&self) {
        self.inner.invalidate_all();
        self.pinned.clear();
        self.index.lock().clear();
        debug!(store = %self.name, "store cleared");
    }

    /// Run moka's housekeeping (expiration and capacity eviction) now
    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.count(), self.config.max_capacity)
    }

    /// Tear the store down; afterwards reads are empty and writes are ignored
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.clear();
        debug!(store = %self.name, "store disposed");
    }

    /// Whether [`ExpiringStore::dispose`] has been called
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn new_entry_policy(&self) -> ExpirationPolicy {
        let sliding = self.config.sliding_ttl.map(|ttl| ttl + self.jitter());
        ExpirationPolicy { absolute: self.config.absolute_ttl, sliding }
    }

    fn jitter(&self) -> Duration {
        match self.config.sliding_jitter {
            Some(max) if !max.is_zero() => {
                let max_millis = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rand::thread_rng().gen_range(0..=max_millis))
            }
            _ => Duration::ZERO,
        }
    }
}

impl<V> std::fmt::Debug for ExpiringStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
