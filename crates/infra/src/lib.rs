//! # Oddsfeed Infrastructure
//!
//! Runtime plumbing around the cache layer.
//!
//! This crate contains:
//! - Settings loading from environment variables or TOML/JSON files
//! - Tracing subscriber setup
//! - The background refresh scheduler
//! - [`CacheContext`], which wires a manager and every specialized cache
//!
//! ## Architecture
//! - Depends on `oddsfeed-domain` and `oddsfeed-core`
//! - Transport stays outside: callers supply a `DataRouter`

pub mod config;
pub mod context;
pub mod error;
pub mod observability;
pub mod scheduling;

pub use config::{load, load_from_env, load_from_file, probe_config_paths};
pub use context::CacheContext;
pub use error::{InfraError, InfraResult};
pub use observability::init_tracing;
pub use scheduling::{RefreshReport, RefreshScheduler, RefreshSchedulerConfig, SchedulerError};
