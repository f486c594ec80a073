//! Macro for implementing Display and FromStr for tag enums
//!
//! Routing tags (`DtoType`, `CacheItemType`) appear in logs, configuration
//! and snapshot files, so every tag has exactly one canonical string form.
//!
//! # Example
//!
//! ```rust
//! use oddsfeed_domain::impl_domain_tag_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Feed {
//!     Live,
//!     Prematch,
//! }
//!
//! impl_domain_tag_conversions!(Feed {
//!     Live => "live",
//!     Prematch => "prematch",
//! });
//!
//! assert_eq!(Feed::Live.to_string(), "live");
//! assert_eq!("PREMATCH".parse::<Feed>(), Ok(Feed::Prematch));
//! ```

/// Implements Display, FromStr and `as_str` for tag enums
///
/// - Display writes the canonical string
/// - FromStr parses case-insensitively, ignoring surrounding whitespace
/// - `as_str()` returns the canonical string without allocating
#[macro_export]
macro_rules! impl_domain_tag_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
