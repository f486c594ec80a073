//! Tracing subscriber installation
//!
//! The caches only emit `tracing` events; a host application either installs
//! its own subscriber or calls [`init_tracing`] once at startup.

use std::sync::atomic::{AtomicBool, Ordering};

use oddsfeed_domain::LoggingConfig;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{InfraError, InfraResult};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.filter`. Returns `Ok(false)`
/// when a subscriber was already installed by an earlier call.
///
/// # Errors
/// `InfraError::Telemetry` when the filter directive is invalid or another
/// global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> InfraResult<bool> {
    if INSTALLED.load(Ordering::Acquire) {
        return Ok(false);
    }

    let filter = build_filter(config)?;
    let fmt_layer = if config.json {
        fmt::layer().json().with_current_span(true).with_target(true).boxed()
    } else {
        fmt::layer().compact().with_target(true).boxed()
    };

    if INSTALLED.swap(true, Ordering::AcqRel) {
        return Ok(false);
    }
    tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().map_err(|err| {
        INSTALLED.store(false, Ordering::Release);
        InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
    })?;

    tracing::debug!(filter = %config.filter, json = config.json, "tracing initialised");
    Ok(true)
}

fn build_filter(config: &LoggingConfig) -> InfraResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|err| InfraError::telemetry(format!("invalid log filter '{}': {err}", config.filter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig { filter: "oddsfeed=notalevel".to_string(), json: false };
        assert!(matches!(build_filter(&config), Err(InfraError::Telemetry(_))));
    }

    #[test]
    fn test_second_init_is_noop() {
        let config = LoggingConfig::default();
        assert!(init_tracing(&config).unwrap());
        assert!(!init_tracing(&config).unwrap());
    }
}
