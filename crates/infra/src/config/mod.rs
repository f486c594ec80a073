//! Configuration loading
//!
//! Settings come from `ODDSFEED_*` environment variables or a TOML/JSON file
//! and are validated before any cache is built from them.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
