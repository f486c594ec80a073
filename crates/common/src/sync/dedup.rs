//! In-flight fetch deduplication
//!
//! Collapses concurrent "populate this id" requests into one upstream fetch.
//! Each entity category owns its own [`InFlightBag`] so that, for instance,
//! player fetches never wait behind competitor fetches.
//!
//! The first caller to observe missing data claims the key and fetches;
//! later callers poll until the key is released and must then re-check the
//! cached item before deciding whether they still need a fetch.
//!
//! Entries carry an owner token so a guard whose key timed out and was taken
//! over does not remove the entry of the caller that replaced it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{trace, warn};

use super::key_lock::LockConfig;
use crate::time::{Clock, SystemClock};

#[derive(Debug, Clone, Copy)]
struct InFlightEntry {
    started: Instant,
    token: u64,
}

/// Concurrent set of keys with a fetch currently in flight
#[derive(Debug)]
pub struct InFlightBag {
    name: Arc<str>,
    entries: DashMap<String, InFlightEntry>,
    next_token: AtomicU64,
}

impl InFlightBag {
    /// Create an empty bag; `name` appears in log fields
    pub fn new(name: impl AsRef<str>) -> Self {
        Self { name: Arc::from(name.as_ref()), entries: DashMap::new(), next_token: AtomicU64::new(1) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a fetch for `key` is in flight
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of in-flight keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn new_entry(&self, now: Instant) -> InFlightEntry {
        InFlightEntry { started: now, token: self.next_token.fetch_add(1, Ordering::Relaxed) }
    }
}

/// Waits for in-flight keys with a bounded timeout
///
/// Uses the poll interval of [`LockConfig`]; its staleness ceiling is the
/// hard timeout after which a waiter inserts itself regardless.
#[derive(Debug, Clone)]
pub struct FetchDeduplicator<C: Clock = SystemClock> {
    poll_interval: Duration,
    timeout: Duration,
    clock: C,
}

impl Default for FetchDeduplicator<SystemClock> {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

impl FetchDeduplicator<SystemClock> {
    /// Create a deduplicator on the system clock
    pub fn new(config: LockConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> FetchDeduplicator<C> {
    /// Create a deduplicator reading time from `clock`
    pub fn with_clock(config: LockConfig, clock: C) -> Self {
        Self { poll_interval: config.poll_interval, timeout: config.staleness_ceiling, clock }
    }

    /// Hard timeout after which a waiter proceeds regardless
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait until `key` is absent from `bag`, then insert it.
    ///
    /// Never fails: after the timeout the key is taken over and a warning is
    /// logged.
    pub async fn wait_till_available(&self, bag: &InFlightBag, key: &str) {
        self.insert(bag, key).await;
    }

    async fn insert(&self, bag: &InFlightBag, key: &str) -> u64 {
        let started = self.clock.now();
        loop {
            if let Some(token) = self.try_insert(bag, key, started) {
                return token;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Remove `key` from `bag`
    pub fn release(&self, bag: &InFlightBag, key: &str) {
        bag.entries.remove(key);
        trace!(bag = %bag.name, key, "in-flight fetch released");
    }

    /// Wait for `key` and release it when the guard drops
    pub async fn claim<'a>(&self, bag: &'a InFlightBag, key: &str) -> InFlightGuard<'a> {
        let token = self.insert(bag, key).await;
        InFlightGuard { bag, key: key.to_string(), token }
    }

    fn try_insert(&self, bag: &InFlightBag, key: &str, started: Instant) -> Option<u64> {
        let now = self.clock.now();
        match bag.entries.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                let entry = bag.new_entry(now);
                vacant.insert(entry);
                Some(entry.token)
            }
            Entry::Occupied(mut occupied) => {
                let waited = now.saturating_duration_since(started);
                let age = now.saturating_duration_since(occupied.get().started);
                if waited >= self.timeout || age >= self.timeout {
                    warn!(
                        bag = %bag.name,
                        key,
                        waited_ms = waited.as_millis() as u64,
                        "in-flight fetch timed out, proceeding"
                    );
                    let entry = bag.new_entry(now);
                    occupied.insert(entry);
                    Some(entry.token)
                } else {
                    None
                }
            }
        }
    }
}

/// RAII guard for an in-flight key
#[must_use = "the in-flight key is released as soon as the guard is dropped"]
pub struct InFlightGuard<'a> {
    bag: &'a InFlightBag,
    key: String,
    token: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let token = self.token;
        if self.bag.entries.remove_if(&self.key, |_, entry| entry.token == token).is_none() {
            trace!(bag = %self.bag.name, key = %self.key, "in-flight key was taken over before its guard dropped");
        }
    }
}
