//! # Oddsfeed Domain
//!
//! Pure data types shared by the cache crates.
//!
//! This crate contains:
//! - Identifiers (`Urn`) and translation dimensions (`Language`)
//! - Data-transfer objects and the `DtoPayload` sum type routed by `DtoType`
//! - Cache item kinds used for attributed invalidation
//! - Error taxonomy, `Lookup` result type and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - Depends only on the foundation tier of `oddsfeed-common`
//! - No runtime, no I/O

pub mod config;
pub mod constants;
pub mod dto;
pub mod errors;
pub mod item_type;
pub mod language;
pub mod macros;
pub mod urn;

// Re-export commonly used items
pub use config::*;
pub use dto::{DtoPayload, DtoType};
pub use errors::*;
pub use item_type::CacheItemType;
pub use language::Language;
pub use urn::Urn;
