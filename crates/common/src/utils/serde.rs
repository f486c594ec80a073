//! Serialization helpers for durations in configuration files.
//!
//! Durations are written as whole milliseconds so TOML and JSON settings stay
//! human-editable (`staleness_ceiling = 30000`).

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serde result type for the helpers below
type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

/// Duration as milliseconds (u64)
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use oddsfeed_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_millis")]
///     poll_interval: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    /// Serialize a Duration as milliseconds (u64)
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deserialize milliseconds (u64) into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Optional duration as milliseconds; `None` maps to a missing/null value.
///
/// Used for TTLs where "no expiration of this kind" is meaningful.
pub mod option_duration_millis {
    use super::*;

    /// Serialize an optional Duration as optional milliseconds
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer
                .serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize optional milliseconds into an optional Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for serialization utilities
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestStruct {
        #[serde(with = "duration_millis")]
        timeout: Duration,
        #[serde(with = "option_duration_millis", default)]
        sliding: Option<Duration>,
    }

    /// Tests that Duration serializes to milliseconds as u64
    #[test]
    fn test_duration_millis_serialize() {
        let data = TestStruct { timeout: Duration::from_millis(1500), sliding: None };

        let json = serde_json::to_string(&data).expect("Should serialize valid struct");
        assert!(json.contains("\"timeout\":1500"), "Should contain milliseconds value");
        assert!(json.contains("\"sliding\":null"));
    }

    /// Tests that milliseconds deserialize to Duration
    #[test]
    fn test_duration_millis_deserialize() {
        let json = r#"{"timeout":2500,"sliding":600}"#;
        let data: TestStruct = serde_json::from_str(json).expect("Should deserialize valid JSON");

        assert_eq!(data.timeout, Duration::from_millis(2500));
        assert_eq!(data.sliding, Some(Duration::from_millis(600)));
    }

    /// Missing optional durations fall back to `None` through `#[serde(default)]`
    #[test]
    fn test_option_duration_missing_field() {
        let data: TestStruct = serde_json::from_str(r#"{"timeout":0}"#).unwrap();
        assert_eq!(data.timeout, Duration::ZERO);
        assert_eq!(data.sliding, None);
    }

    #[test]
    fn test_duration_millis_deserialize_invalid_json() {
        let invalid_json = r#"{"timeout":"not_a_number"}"#;
        let result: Result<TestStruct, _> = serde_json::from_str(invalid_json);
        assert!(result.is_err());
    }
}
