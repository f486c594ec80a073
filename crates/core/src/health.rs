use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Health of one specialized cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHealth {
    pub name: String,
    pub healthy: bool,
    pub item_count: usize,
    /// Free-form counters (store stats, held locks, in-flight fetches)
    pub details: BTreeMap<String, String>,
}

impl CacheHealth {
    pub fn new(name: impl Into<String>, healthy: bool, item_count: usize) -> Self {
        Self { name: name.into(), healthy, item_count, details: BTreeMap::new() }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}

/// Aggregated health of every registered cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerHealth {
    pub healthy: bool,
    pub item_count: usize,
    pub caches: Vec<CacheHealth>,
}

impl ManagerHealth {
    pub fn from_caches(caches: Vec<CacheHealth>) -> Self {
        Self {
            healthy: caches.iter().all(|cache| cache.healthy),
            item_count: caches.iter().map(|cache| cache.item_count).sum(),
            caches,
        }
    }
}
