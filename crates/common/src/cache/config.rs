//! Store configuration types and builder patterns
//!
//! A store combines up to two time-based policies: an absolute deadline
//! counted from insertion, and a sliding window renewed on every read. The
//! sliding window can be stretched by a per-entry random jitter so entries
//! added together do not all expire together.

use std::time::Duration;

/// Eviction priority of a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionPriority {
    /// Subject to the store's time and capacity policies
    #[default]
    Normal,
    /// Never expires and never counts against capacity; explicit removal only
    NeverRemove,
}

/// Configuration for store behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store name used in logs and health reports
    pub name: String,

    /// Maximum lifetime counted from insertion (None = unbounded)
    pub absolute_ttl: Option<Duration>,

    /// Idle lifetime renewed on every read (None = no sliding window)
    pub sliding_ttl: Option<Duration>,

    /// Upper bound of the random extension added to each sliding window
    pub sliding_jitter: Option<Duration>,

    /// Maximum number of `Normal` entries (None = unlimited)
    pub max_capacity: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            absolute_ttl: None,
            sliding_ttl: None,
            sliding_jitter: None,
            max_capacity: None,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration builder
    pub fn builder(name: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(name)
    }

    /// Quick preset for a store whose entries live at most `ttl` after insertion
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use oddsfeed_common::cache::StoreConfig;
    ///
    /// let config = StoreConfig::absolute("sport-events", Duration::from_secs(12 * 3600));
    /// assert_eq!(config.absolute_ttl, Some(Duration::from_secs(43_200)));
    /// ```
    pub fn absolute(name: impl Into<String>, ttl: Duration) -> Self {
        Self { name: name.into(), absolute_ttl: Some(ttl), ..Self::default() }
    }

    /// Quick preset for a sliding-expiration store with jitter
    pub fn sliding(name: impl Into<String>, ttl: Duration, jitter: Duration) -> Self {
        Self {
            name: name.into(),
            sliding_ttl: Some(ttl),
            sliding_jitter: Some(jitter),
            ..Self::default()
        }
    }

    /// Quick preset for a store without time-based expiration
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Whether any time-based policy is configured
    pub fn expires(&self) -> bool {
        self.absolute_ttl.is_some() || self.sliding_ttl.is_some()
    }
}

/// Builder for StoreConfig with fluent API
#[derive(Debug)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Create a new builder with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: StoreConfig { name: name.into(), ..StoreConfig::default() } }
    }

    /// Set the absolute time-to-live
    pub fn absolute_ttl(mut self, ttl: Duration) -> Self {
        self.config.absolute_ttl = Some(ttl);
        self
    }

    /// Set the sliding time-to-live
    pub fn sliding_ttl(mut self, ttl: Duration) -> Self {
        self.config.sliding_ttl = Some(ttl);
        self
    }

    /// Set the maximum sliding jitter
    pub fn sliding_jitter(mut self, jitter: Duration) -> Self {
        self.config.sliding_jitter = Some(jitter);
        self
    }

    /// Set maximum number of entries
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.config.max_capacity = Some(capacity);
        self
    }

    /// Build the configuration
    pub fn build(self) -> StoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::config.
    use super::*;

    #[test]
    fn test_eviction_priority_default() {
        assert_eq!(EvictionPriority::default(), EvictionPriority::Normal);
    }

    #[test]
    fn test_presets() {
        let sliding =
            StoreConfig::sliding("profiles", Duration::from_secs(60), Duration::from_secs(5));
        assert_eq!(sliding.name, "profiles");
        assert_eq!(sliding.sliding_ttl, Some(Duration::from_secs(60)));
        assert_eq!(sliding.sliding_jitter, Some(Duration::from_secs(5)));
        assert!(sliding.absolute_ttl.is_none());
        assert!(sliding.expires());

        let unbounded = StoreConfig::unbounded("markets");
        assert!(!unbounded.expires());
        assert!(unbounded.max_capacity.is_none());
    }

    /// Validates `StoreConfig::builder` behavior for the full builder scenario.
    ///
    /// Assertions:
    /// - Confirms every configured field is carried into the built config.
    #[test]
    fn test_store_config_builder() {
        let config = StoreConfig::builder("events")
            .absolute_ttl(Duration::from_secs(1800))
            .sliding_ttl(Duration::from_secs(600))
            .sliding_jitter(Duration::from_secs(30))
            .max_capacity(500)
            .build();

        assert_eq!(config.name, "events");
        assert_eq!(config.absolute_ttl, Some(Duration::from_secs(1800)));
        assert_eq!(config.sliding_ttl, Some(Duration::from_secs(600)));
        assert_eq!(config.sliding_jitter, Some(Duration::from_secs(30)));
        assert_eq!(config.max_capacity, Some(500));
    }
}
