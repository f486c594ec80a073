//! Configuration structures
//!
//! Every section has a `Default` so a partial TOML file (or none at all)
//! yields a working configuration. Durations are stored as milliseconds.

use std::time::Duration;

use oddsfeed_common::utils::serde::{duration_millis, option_duration_millis};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::{CacheError, Result};
use crate::language::Language;

/// What a cache does when an upstream fetch fails during a translated lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionHandlingStrategy {
    /// Degrade: failed languages come back as empty strings
    #[default]
    Catch,
    /// Surface the failure as `CacheError::CacheItemNotFound`
    Throw,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub languages: LanguageSettings,
    pub locking: LockSettings,
    pub sport_event_cache: SportEventCacheSettings,
    pub profile_cache: ProfileCacheSettings,
    pub market_cache: MarketCacheSettings,
    pub refresh: RefreshSettings,
    pub logging: LoggingConfig,
    pub exception_strategy: ExceptionHandlingStrategy,
}

impl CacheSettings {
    /// Reject settings the caches cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.languages.wanted.is_empty() {
            return Err(CacheError::Config("languages.wanted must not be empty".to_string()));
        }
        if self.locking.poll_interval.is_zero() {
            return Err(CacheError::Config("locking.poll_interval_ms must be > 0".to_string()));
        }
        if self.locking.staleness_ceiling.is_zero() {
            return Err(CacheError::Config(
                "locking.staleness_ceiling_ms must be > 0".to_string(),
            ));
        }
        if self.locking.dedup_timeout.is_zero() {
            return Err(CacheError::Config("locking.dedup_timeout_ms must be > 0".to_string()));
        }
        if self.locking.clean_interval.is_zero() {
            return Err(CacheError::Config("locking.clean_interval_ms must be > 0".to_string()));
        }
        if self.refresh.enabled && self.refresh.interval.is_zero() {
            return Err(CacheError::Config("refresh.interval_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Wanted languages with the default language first and no duplicates
    pub fn all_languages(&self) -> Vec<Language> {
        let mut languages = vec![self.languages.default_language.clone()];
        for language in &self.languages.wanted {
            if !languages.contains(language) {
                languages.push(language.clone());
            }
        }
        languages
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSettings {
    pub default_language: Language,
    pub wanted: Vec<Language>,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        let default_language = Language::default();
        Self { wanted: vec![default_language.clone()], default_language }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    #[serde(rename = "poll_interval_ms", with = "duration_millis")]
    pub poll_interval: Duration,
    #[serde(rename = "staleness_ceiling_ms", with = "duration_millis")]
    pub staleness_ceiling: Duration,
    #[serde(rename = "dedup_timeout_ms", with = "duration_millis")]
    pub dedup_timeout: Duration,
    #[serde(rename = "clean_interval_ms", with = "duration_millis")]
    pub clean_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
            staleness_ceiling: DEFAULT_LOCK_STALENESS_CEILING,
            dedup_timeout: DEFAULT_DEDUP_TIMEOUT,
            clean_interval: DEFAULT_LOCK_CLEAN_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SportEventCacheSettings {
    #[serde(rename = "absolute_ttl_ms", with = "duration_millis")]
    pub absolute_ttl: Duration,
    #[serde(rename = "status_ttl_ms", with = "duration_millis")]
    pub status_ttl: Duration,
    pub max_capacity: Option<u64>,
}

impl Default for SportEventCacheSettings {
    fn default() -> Self {
        Self {
            absolute_ttl: DEFAULT_SPORT_EVENT_TTL,
            status_ttl: DEFAULT_SPORT_EVENT_STATUS_TTL,
            max_capacity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileCacheSettings {
    #[serde(rename = "sliding_ttl_ms", with = "duration_millis")]
    pub sliding_ttl: Duration,
    #[serde(rename = "sliding_jitter_ms", with = "option_duration_millis")]
    pub sliding_jitter: Option<Duration>,
    pub max_capacity: Option<u64>,
}

impl Default for ProfileCacheSettings {
    fn default() -> Self {
        Self {
            sliding_ttl: DEFAULT_PROFILE_SLIDING_TTL,
            sliding_jitter: Some(DEFAULT_PROFILE_SLIDING_JITTER),
            max_capacity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketCacheSettings {
    #[serde(rename = "variant_sliding_ttl_ms", with = "duration_millis")]
    pub variant_sliding_ttl: Duration,
    pub variant_max_capacity: Option<u64>,
}

impl Default for MarketCacheSettings {
    fn default() -> Self {
        Self { variant_sliding_ttl: DEFAULT_VARIANT_MARKET_SLIDING_TTL, variant_max_capacity: None }
    }
}

/// Periodic re-fetch of reference data in every configured language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub enabled: bool,
    #[serde(rename = "interval_ms", with = "duration_millis")]
    pub interval: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self { enabled: true, interval: DEFAULT_REFRESH_INTERVAL }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = CacheSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.languages.default_language.as_str(), "en");
        assert_eq!(settings.locking.staleness_ceiling, Duration::from_secs(30));
        assert_eq!(settings.exception_strategy, ExceptionHandlingStrategy::Catch);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = CacheSettings::default();
        settings.locking.staleness_ceiling = Duration::ZERO;
        assert!(matches!(settings.validate(), Err(CacheError::Config(_))));

        let mut settings = CacheSettings::default();
        settings.languages.wanted.clear();
        assert!(settings.validate().is_err());

        let mut settings = CacheSettings::default();
        settings.locking.poll_interval = Duration::ZERO;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_clean_interval() {
        let mut settings = CacheSettings::default();
        settings.refresh.enabled = false;
        settings.locking.clean_interval = Duration::ZERO;

        assert!(matches!(
            settings.validate(),
            Err(CacheError::Config(message)) if message.contains("clean_interval")
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: CacheSettings = toml::from_str(
            r#"
            exception_strategy = "throw"

            [languages]
            wanted = ["EN", "de"]

            [locking]
            staleness_ceiling_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(settings.exception_strategy, ExceptionHandlingStrategy::Throw);
        assert_eq!(settings.locking.staleness_ceiling, Duration::from_secs(5));
        assert_eq!(settings.locking.poll_interval, DEFAULT_LOCK_POLL_INTERVAL);
        assert_eq!(
            settings.all_languages().iter().map(Language::as_str).collect::<Vec<_>>(),
            vec!["en", "de"]
        );
    }

    #[test]
    fn test_invalid_language_in_toml_rejected() {
        let result = toml::from_str::<CacheSettings>("[languages]\nwanted = [\"\"]\n");
        assert!(result.is_err());
    }
}
