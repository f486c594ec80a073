//! Error classification shared by the cache crates.
//!
//! Error types in the other crates implement [`ErrorClassification`] so retry
//! decisions and log levels are made the same way everywhere. Failures that
//! are logged rather than returned go through [`log_by_severity!`], which
//! picks the tracing level from the error's [`ErrorSeverity`]:
//!
//! | Level | Use Case |
//! |-------|----------|
//! | **Info** | Expected conditions such as an entity missing upstream |
//! | **Warning** | Degraded but operational: transient upstream failures |
//! | **Error** | Failure requiring attention: invalid configuration, bad payloads |
//! | **Critical** | Internal invariant violations |

use std::fmt;
use std::time::Duration;

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient: a later call may succeed without any
    /// change on the caller's side.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Unified severity level for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Emit a tracing event at the level matching the error's severity
///
/// The first argument is a reference to an [`ErrorClassification`] value;
/// the rest is passed to the tracing macro unchanged. `Critical` is logged at
/// `error!` with `critical = true` added.
///
/// ```rust,ignore
/// log_by_severity!(&err, cache = name, id, error = %err, "fetch failed");
/// ```
#[cfg(feature = "observability")]
#[macro_export]
macro_rules! log_by_severity {
    ($err:expr, $($arg:tt)+) => {
        match $crate::error::ErrorClassification::severity($err) {
            $crate::error::ErrorSeverity::Info => ::tracing::info!($($arg)+),
            $crate::error::ErrorSeverity::Warning => ::tracing::warn!($($arg)+),
            $crate::error::ErrorSeverity::Error => ::tracing::error!($($arg)+),
            $crate::error::ErrorSeverity::Critical => ::tracing::error!(critical = true, $($arg)+),
        }
    };
}

#[cfg(test)]
mod tests {
    //! Unit tests for error classification.
    use super::*;

    #[derive(Debug)]
    struct Flaky(ErrorSeverity);

    impl fmt::Display for Flaky {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "flaky {}", self.0)
        }
    }

    impl ErrorClassification for Flaky {
        fn is_retryable(&self) -> bool {
            self.0 == ErrorSeverity::Warning
        }

        fn severity(&self) -> ErrorSeverity {
            self.0
        }

        fn is_critical(&self) -> bool {
            self.0 == ErrorSeverity::Critical
        }

        fn retry_after(&self) -> Option<Duration> {
            None
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }

    #[cfg(feature = "observability")]
    mod logging {
        use std::io;
        use std::sync::{Arc, Mutex};

        use super::*;

        #[derive(Clone, Default)]
        struct SharedBuf(Arc<Mutex<Vec<u8>>>);

        impl io::Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        fn captured(severity: ErrorSeverity) -> String {
            let buf = SharedBuf::default();
            let writer = buf.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::TRACE)
                .finish();

            let err = Flaky(severity);
            tracing::subscriber::with_default(subscriber, || {
                crate::log_by_severity!(&err, id = "sr:match:1", error = %err, "fetch failed");
            });

            let bytes = buf.0.lock().unwrap().clone();
            String::from_utf8(bytes).unwrap()
        }

        #[test]
        fn test_level_follows_severity() {
            assert!(captured(ErrorSeverity::Info).contains(" INFO "));
            assert!(captured(ErrorSeverity::Warning).contains(" WARN "));

            let error = captured(ErrorSeverity::Error);
            assert!(error.contains("ERROR"));
            assert!(!error.contains("critical"));

            let critical = captured(ErrorSeverity::Critical);
            assert!(critical.contains("ERROR"));
            assert!(critical.contains("critical=true"));
            assert!(critical.contains("error=flaky CRITICAL"));
        }
    }
}
