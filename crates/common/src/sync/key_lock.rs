//! Per-key mutual exclusion with a global exclusive mode
//!
//! A held key is nothing more than a record `key -> acquired_at` in a
//! [`DashMap`]. Waiters poll with a short sleep instead of parking on a
//! primitive; hold times are single map lookups plus one upstream fetch.
//!
//! Records older than the staleness ceiling are treated as leaked and a
//! waiter takes them over, logging a warning. The same ceiling bounds the
//! time any single waiter spends polling, so no call to [`KeyLockManager::wait`]
//! or [`KeyLockManager::wait_all`] blocks longer than the ceiling plus one poll
//! interval.
//!
//! Every record carries an owner token. Guards release only the record they
//! created, so a holder whose key was taken over cannot free the new owner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::time::{Clock, SystemClock};
use crate::utils::serde::duration_millis;

/// Default sleep between two polls of a contended key
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Default age after which a held record is considered abandoned
pub const DEFAULT_STALENESS_CEILING: Duration = Duration::from_secs(30);

/// Polling and staleness parameters shared by the lock manager and the
/// fetch deduplicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Sleep between two polls of a contended key
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
    /// Age after which a record is abandoned, also the longest a waiter polls
    #[serde(with = "duration_millis")]
    pub staleness_ceiling: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            staleness_ceiling: DEFAULT_STALENESS_CEILING,
        }
    }
}

impl LockConfig {
    /// Build a config from explicit poll interval and ceiling
    pub fn new(poll_interval: Duration, staleness_ceiling: Duration) -> Self {
        Self { poll_interval, staleness_ceiling }
    }
}

#[derive(Debug, Clone, Copy)]
struct LockRecord {
    acquired: Instant,
    token: u64,
}

/// Per-key lock manager
///
/// The global mode behaves like the writer side of a readers-writer lock:
/// while it is held no per-key acquisition succeeds, and
/// [`KeyLockManager::wait_all`] only returns once the per-key holders have
/// drained (or gone stale).
pub struct KeyLockManager<C: Clock = SystemClock> {
    name: Arc<str>,
    records: DashMap<String, LockRecord>,
    global: Mutex<Option<LockRecord>>,
    next_token: AtomicU64,
    config: LockConfig,
    clock: C,
}

impl KeyLockManager<SystemClock> {
    /// Create a lock manager on the system clock
    pub fn new(name: impl AsRef<str>, config: LockConfig) -> Self {
        Self::with_clock(name, config, SystemClock)
    }
}

impl<C: Clock> KeyLockManager<C> {
    /// Create a lock manager reading time from `clock`
    pub fn with_clock(name: impl AsRef<str>, config: LockConfig, clock: C) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            records: DashMap::new(),
            global: Mutex::new(None),
            next_token: AtomicU64::new(1),
            config,
            clock,
        }
    }

    /// Name used in log fields
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Polling and staleness parameters
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Block until `key` is uncontended, then mark it held
    pub async fn wait(&self, key: &str) {
        self.acquire(key).await;
    }

    async fn acquire(&self, key: &str) -> u64 {
        let started = self.clock.now();
        loop {
            if let Some(token) = self.try_acquire(key, started) {
                return token;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Release a per-key hold; releasing an unheld key is a no-op
    pub fn release(&self, key: &str) {
        if self.records.remove(key).is_none() {
            trace!(locks = %self.name, key, "release of a key that was not held");
        }
    }

    fn release_owned(&self, key: &str, token: u64) {
        if self.records.remove_if(key, |_, record| record.token == token).is_none() {
            debug!(locks = %self.name, key, "key was taken over before its guard dropped");
        }
    }

    /// Acquire `key` and release it when the guard drops
    pub async fn lock(&self, key: &str) -> KeyLockGuard<'_, C> {
        let token = self.acquire(key).await;
        KeyLockGuard { manager: self, key: key.to_string(), token }
    }

    /// Claim the global (all keys) mode
    pub async fn wait_all(&self) {
        // Held until release_all
        std::mem::forget(self.lock_all().await);
    }

    /// Release the global mode
    pub fn release_all(&self) {
        *self.global.lock() = None;
    }

    fn release_all_owned(&self, token: u64) -> bool {
        let mut global = self.global.lock();
        if matches!(*global, Some(record) if record.token == token) {
            *global = None;
            true
        } else {
            false
        }
    }

    /// Claim the global mode and release it when the guard drops
    ///
    /// Dropping the future while it waits for per-key holders to drain gives
    /// the claim back.
    pub async fn lock_all(&self) -> GlobalLockGuard<'_, C> {
        let started = self.clock.now();
        let token = loop {
            if let Some(token) = self.try_claim_global(started) {
                break token;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        };
        let guard = GlobalLockGuard { manager: self, token };

        loop {
            let now = self.clock.now();
            let held = self.fresh_records(now);
            if held == 0 {
                return guard;
            }
            if now.saturating_duration_since(started) >= self.config.staleness_ceiling {
                warn!(
                    locks = %self.name,
                    held,
                    "global lock proceeding while per-key holds are still present"
                );
                return guard;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Drop records (and a global claim) older than the staleness ceiling.
    ///
    /// Returns the number of records removed.
    pub fn clean(&self) -> usize {
        let now = self.clock.now();
        let ceiling = self.config.staleness_ceiling;

        let stale: Vec<String> = self
            .records
            .iter()
            .filter(|record| now.saturating_duration_since(record.acquired) >= ceiling)
            .map(|record| record.key().clone())
            .collect();

        let mut removed = 0;
        for key in stale {
            let gone = self
                .records
                .remove_if(&key, |_, record| now.saturating_duration_since(record.acquired) >= ceiling);
            if gone.is_some() {
                removed += 1;
            }
        }

        let mut global = self.global.lock();
        if matches!(*global, Some(record) if now.saturating_duration_since(record.acquired) >= ceiling) {
            *global = None;
            removed += 1;
        }
        drop(global);

        if removed > 0 {
            warn!(locks = %self.name, removed, "removed stale lock records");
        }
        removed
    }

    /// Number of per-key records currently present
    pub fn held_count(&self) -> usize {
        self.records.len()
    }

    /// Whether `key` currently has a record
    pub fn is_held(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Whether the global mode is claimed
    pub fn is_global_held(&self) -> bool {
        self.global.lock().is_some()
    }

    fn new_record(&self, now: Instant) -> LockRecord {
        LockRecord { acquired: now, token: self.next_token.fetch_add(1, Ordering::Relaxed) }
    }

    fn try_acquire(&self, key: &str, started: Instant) -> Option<u64> {
        let now = self.clock.now();
        let ceiling = self.config.staleness_ceiling;
        let waited = now.saturating_duration_since(started);

        if !self.global_allows_keys(now) && waited < ceiling {
            return None;
        }

        match self.records.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                let record = self.new_record(now);
                vacant.insert(record);
                Some(record.token)
            }
            Entry::Occupied(mut occupied) => {
                let age = now.saturating_duration_since(occupied.get().acquired);
                if age >= ceiling || waited >= ceiling {
                    warn!(
                        locks = %self.name,
                        key,
                        age_ms = age.as_millis() as u64,
                        waited_ms = waited.as_millis() as u64,
                        "force-acquiring stale key lock"
                    );
                    let record = self.new_record(now);
                    occupied.insert(record);
                    Some(record.token)
                } else {
                    None
                }
            }
        }
    }

    fn try_claim_global(&self, started: Instant) -> Option<u64> {
        let now = self.clock.now();
        let ceiling = self.config.staleness_ceiling;
        let mut global = self.global.lock();
        match *global {
            None => {
                let record = self.new_record(now);
                *global = Some(record);
                Some(record.token)
            }
            Some(held)
                if now.saturating_duration_since(held.acquired) >= ceiling
                    || now.saturating_duration_since(started) >= ceiling =>
            {
                warn!(locks = %self.name, "force-acquiring stale global lock");
                let record = self.new_record(now);
                *global = Some(record);
                Some(record.token)
            }
            Some(_) => None,
        }
    }

    fn global_allows_keys(&self, now: Instant) -> bool {
        match *self.global.lock() {
            None => true,
            Some(record) => {
                now.saturating_duration_since(record.acquired) >= self.config.staleness_ceiling
            }
        }
    }

    fn fresh_records(&self, now: Instant) -> usize {
        self.records
            .iter()
            .filter(|record| {
                now.saturating_duration_since(record.acquired) < self.config.staleness_ceiling
            })
            .count()
    }
}

impl<C: Clock> std::fmt::Debug for KeyLockManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLockManager")
            .field("name", &self.name)
            .field("held", &self.records.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// RAII guard for a per-key hold
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyLockGuard<'a, C: Clock = SystemClock> {
    manager: &'a KeyLockManager<C>,
    key: String,
    token: u64,
}

impl<C: Clock> KeyLockGuard<'_, C> {
    /// The key this guard holds
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<C: Clock> Drop for KeyLockGuard<'_, C> {
    fn drop(&mut self) {
        self.manager.release_owned(&self.key, self.token);
    }
}

/// RAII guard for the global mode
#[must_use = "the global lock is released as soon as the guard is dropped"]
pub struct GlobalLockGuard<'a, C: Clock = SystemClock> {
    manager: &'a KeyLockManager<C>,
    token: u64,
}

impl<C: Clock> Drop for GlobalLockGuard<'_, C> {
    fn drop(&mut self) {
        if self.manager.release_all_owned(self.token) {
            debug!(locks = %self.manager.name, "global lock released");
        } else {
            debug!(locks = %self.manager.name, "global lock was taken over before its guard dropped");
        }
    }
}
