//! Error types used throughout the cache crates
//!
//! `FetchError` describes why one upstream call failed. `CacheError` is what
//! consumers of the caches see; a failed fetch surfaces as
//! `CacheItemNotFound` with the fetch error attached as its source.

use std::time::Duration;

use oddsfeed_common::error::{ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dto::DtoType;

/// Failure of a single upstream fetch for one id and language
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchError {
    /// The call succeeded but the entity does not exist upstream
    #[error("Entity {id} not found upstream")]
    NotFound { id: String },

    /// Transient transport failure; never cached
    #[error("Communication failure fetching {id}: {message}")]
    Communication { id: String, message: String },

    #[error("Failed to deserialize response for {id}: {message}")]
    Deserialization { id: String, message: String },

    #[error("Failed to map response for {id}: {message}")]
    Mapping { id: String, message: String },
}

impl FetchError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn communication(id: impl ToString, message: impl Into<String>) -> Self {
        Self::Communication { id: id.to_string(), message: message.into() }
    }

    pub fn deserialization(id: impl ToString, message: impl Into<String>) -> Self {
        Self::Deserialization { id: id.to_string(), message: message.into() }
    }

    pub fn mapping(id: impl ToString, message: impl Into<String>) -> Self {
        Self::Mapping { id: id.to_string(), message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl ErrorClassification for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Communication { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } => ErrorSeverity::Info,
            Self::Communication { .. } => ErrorSeverity::Warning,
            Self::Deserialization { .. } | Self::Mapping { .. } => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Main error type for cache operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cache item {id} not found")]
    CacheItemNotFound {
        id: String,
        #[source]
        source: Option<FetchError>,
    },

    #[error("Cache registration failed: {0}")]
    Registration(String),

    #[error("Cache {cache} does not accept dto type {dto_type}")]
    UnsupportedDto { cache: String, dto_type: DtoType },

    #[error("Invalid urn '{0}'")]
    InvalidUrn(String),

    #[error("Invalid language code '{0}'")]
    InvalidLanguage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::CacheItemNotFound { id: id.to_string(), source: None }
    }

    pub fn fetch_failed(id: impl ToString, source: FetchError) -> Self {
        Self::CacheItemNotFound { id: id.to_string(), source: Some(source) }
    }

    /// Upstream cause of a `CacheItemNotFound`, if any
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::CacheItemNotFound { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}

impl ErrorClassification for CacheError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::CacheItemNotFound { source: Some(source), .. } => source.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CacheItemNotFound { source: Some(source), .. } => source.severity(),
            Self::CacheItemNotFound { source: None, .. } => ErrorSeverity::Info,
            Self::UnsupportedDto { .. } => ErrorSeverity::Warning,
            Self::Registration(_) | Self::Config(_) => ErrorSeverity::Critical,
            Self::InvalidUrn(_) | Self::InvalidLanguage(_) | Self::Serialization(_) => {
                ErrorSeverity::Error
            }
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self.severity(), ErrorSeverity::Critical)
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Outcome of a lookup that may need an upstream fetch
///
/// Distinguishes "the entity does not exist" from "we could not find out".
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(FetchError),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
            Self::Failed(err) => Lookup::Failed(err),
        }
    }

    /// Convert into a `Result`, attributing failures to `id`
    pub fn into_result(self, id: impl ToString) -> Result<T> {
        match self {
            Self::Found(value) => Ok(value),
            Self::NotFound => Err(CacheError::not_found(id)),
            Self::Failed(err) => Err(CacheError::fetch_failed(id, err)),
        }
    }
}

impl<T> From<std::result::Result<T, FetchError>> for Lookup<T> {
    fn from(result: std::result::Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => Self::Found(value),
            Err(FetchError::NotFound { .. }) => Self::NotFound,
            Err(err) => Self::Failed(err),
        }
    }
}
