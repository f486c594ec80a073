//! Common utility functions
//!
//! - **[`serde`]**: Serialization helpers for durations

pub mod serde;

// Re-export commonly used items for convenience
pub use self::serde::{duration_millis, option_duration_millis};
