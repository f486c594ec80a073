//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Environment variables, when `ODDSFEED_LANGUAGES` is set
//! 2. Otherwise the first config file found by [`probe_config_paths`]
//! 3. Otherwise built-in defaults
//!
//! Every result is validated with [`CacheSettings::validate`].
//!
//! ## Environment Variables
//! - `ODDSFEED_LANGUAGES`: comma-separated wanted languages (required for
//!   env loading)
//! - `ODDSFEED_DEFAULT_LANGUAGE`: language used when callers pass none
//! - `ODDSFEED_EXCEPTION_STRATEGY`: `catch` or `throw`
//! - `ODDSFEED_LOCK_POLL_INTERVAL_MS`, `ODDSFEED_LOCK_STALENESS_CEILING_MS`,
//!   `ODDSFEED_DEDUP_TIMEOUT_MS`, `ODDSFEED_LOCK_CLEAN_INTERVAL_MS`
//! - `ODDSFEED_REFRESH_ENABLED`, `ODDSFEED_REFRESH_INTERVAL_MS`
//! - `ODDSFEED_LOG_FILTER`, `ODDSFEED_LOG_JSON`
//!
//! ## File Locations
//! `oddsfeed.toml`, `oddsfeed.json`, `config.toml` and `config.json` in the
//! current directory, its two parents, and next to the executable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use oddsfeed_domain::{CacheError, CacheSettings, ExceptionHandlingStrategy, Language, Result};

const FILE_NAMES: &[&str] = &["oddsfeed.toml", "oddsfeed.json", "config.toml", "config.json"];

/// Load settings with the env → file → defaults fallback
///
/// # Errors
/// `CacheError::Config` when the chosen source is malformed or the result
/// fails validation.
pub fn load() -> Result<CacheSettings> {
    if std::env::var_os("ODDSFEED_LANGUAGES").is_some() {
        let settings = load_from_env()?;
        tracing::info!("configuration loaded from environment variables");
        return Ok(settings);
    }
    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("no configuration file found, using defaults");
            let settings = CacheSettings::default();
            settings.validate()?;
            Ok(settings)
        }
    }
}

/// Build settings from `ODDSFEED_*` variables on top of the defaults
///
/// # Errors
/// `CacheError::Config` if `ODDSFEED_LANGUAGES` is missing or any variable
/// has an invalid value.
pub fn load_from_env() -> Result<CacheSettings> {
    let mut settings = CacheSettings::default();

    settings.languages.wanted = parse_languages(&env_var("ODDSFEED_LANGUAGES")?)?;
    if let Some(code) = optional_env("ODDSFEED_DEFAULT_LANGUAGE") {
        settings.languages.default_language = Language::new(code.trim())?;
    }
    if let Some(strategy) = optional_env("ODDSFEED_EXCEPTION_STRATEGY") {
        settings.exception_strategy = parse_strategy(&strategy)?;
    }

    let locking = &mut settings.locking;
    if let Some(value) = env_millis("ODDSFEED_LOCK_POLL_INTERVAL_MS")? {
        locking.poll_interval = value;
    }
    if let Some(value) = env_millis("ODDSFEED_LOCK_STALENESS_CEILING_MS")? {
        locking.staleness_ceiling = value;
    }
    if let Some(value) = env_millis("ODDSFEED_DEDUP_TIMEOUT_MS")? {
        locking.dedup_timeout = value;
    }
    if let Some(value) = env_millis("ODDSFEED_LOCK_CLEAN_INTERVAL_MS")? {
        locking.clean_interval = value;
    }

    settings.refresh.enabled = env_bool("ODDSFEED_REFRESH_ENABLED", settings.refresh.enabled);
    if let Some(value) = env_millis("ODDSFEED_REFRESH_INTERVAL_MS")? {
        settings.refresh.interval = value;
    }

    if let Some(filter) = optional_env("ODDSFEED_LOG_FILTER") {
        settings.logging.filter = filter;
    }
    settings.logging.json = env_bool("ODDSFEED_LOG_JSON", settings.logging.json);

    settings.validate()?;
    Ok(settings)
}

/// Load settings from a file, probing the standard locations when `path` is
/// `None`
///
/// Format is picked by extension: `.toml` or `.json`.
///
/// # Errors
/// `CacheError::Config` if the file is missing, unreadable, malformed, or
/// fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<CacheSettings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CacheError::Config(format!("config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CacheError::Config("no config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CacheError::Config(format!("failed to read config file: {e}")))?;

    let settings = parse_settings(&contents, &config_path)?;
    settings.validate()?;
    Ok(settings)
}

fn parse_settings(contents: &str, path: &Path) -> Result<CacheSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CacheError::Config(format!("invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CacheError::Config(format!("invalid JSON format: {e}"))),
        _ => Err(CacheError::Config(format!("unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
        roots.push(cwd.join("../.."));
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|candidate| candidate.exists())
}

fn parse_languages(raw: &str) -> Result<Vec<Language>> {
    let languages = raw
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(Language::new)
        .collect::<Result<Vec<_>>>()?;
    if languages.is_empty() {
        return Err(CacheError::Config("ODDSFEED_LANGUAGES lists no language".to_string()));
    }
    Ok(languages)
}

fn parse_strategy(raw: &str) -> Result<ExceptionHandlingStrategy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "catch" => Ok(ExceptionHandlingStrategy::Catch),
        "throw" => Ok(ExceptionHandlingStrategy::Throw),
        other => Err(CacheError::Config(format!("invalid exception strategy: {other}"))),
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| CacheError::Config(format!("missing required environment variable: {key}")))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_millis(key: &str) -> Result<Option<Duration>> {
    optional_env(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| CacheError::Config(format!("invalid {key}: {e}")))
        })
        .transpose()
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
/// (case-insensitive); anything else is `false`
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
