//! Typed entity identifiers of the form `{prefix}:{type}:{id}`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CacheError;

const SPORT_EVENT_TYPES: &[&str] =
    &["match", "stage", "tournament", "simple_tournament", "season", "race_event"];
const COMPETITOR_TYPES: &[&str] = &["competitor", "simpleteam", "team"];

/// Entity identifier, e.g. `sr:match:123`
///
/// Ordering and equality are on the full triple, so ids with the same
/// numeric part but a different type never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn {
    prefix: String,
    kind: String,
    id: i64,
}

impl Urn {
    pub fn new(prefix: impl Into<String>, kind: impl Into<String>, id: i64) -> Self {
        Self { prefix: prefix.into(), kind: kind.into(), id }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The type segment (`match`, `competitor`, `player`, ...)
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn is_sport_event(&self) -> bool {
        SPORT_EVENT_TYPES.contains(&self.kind.as_str())
    }

    pub fn is_competitor(&self) -> bool {
        COMPETITOR_TYPES.contains(&self.kind.as_str())
    }

    pub fn is_player(&self) -> bool {
        self.kind == "player"
    }

    pub fn is_sport(&self) -> bool {
        self.kind == "sport"
    }

    pub fn is_category(&self) -> bool {
        self.kind == "category"
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.prefix, self.kind, self.id)
    }
}

impl FromStr for Urn {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CacheError::InvalidUrn(s.to_string());

        let mut parts = s.trim().splitn(3, ':');
        let (Some(prefix), Some(kind), Some(id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if prefix.is_empty() || kind.is_empty() {
            return Err(invalid());
        }
        let id = id.parse::<i64>().map_err(|_| invalid())?;

        Ok(Self::new(prefix, kind, id))
    }
}

impl TryFrom<String> for Urn {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let urn: Urn = "sr:match:123".parse().unwrap();
        assert_eq!(urn.prefix(), "sr");
        assert_eq!(urn.kind(), "match");
        assert_eq!(urn.id(), 123);
        assert_eq!(urn.to_string(), "sr:match:123");
    }

    #[test]
    fn test_kind_helpers() {
        assert!(Urn::new("sr", "season", 1).is_sport_event());
        assert!(Urn::new("sr", "competitor", 1).is_competitor());
        assert!(Urn::new("sr", "simpleteam", 1).is_competitor());
        assert!(Urn::new("sr", "player", 1).is_player());
        assert!(Urn::new("sr", "sport", 1).is_sport());
        assert!(Urn::new("sr", "category", 1).is_category());
        assert!(!Urn::new("sr", "player", 1).is_sport_event());
    }

    #[test]
    fn test_invalid_urns_rejected() {
        for input in ["", "sr:match", "sr::1", ":match:1", "sr:match:abc", "sr:match:1:2"] {
            assert!(
                matches!(input.parse::<Urn>(), Err(CacheError::InvalidUrn(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_as_string() {
        let urn = Urn::new("sr", "player", 42);
        let json = serde_json::to_string(&urn).unwrap();
        assert_eq!(json, "\"sr:player:42\"");
        let back: Urn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, urn);
        assert!(serde_json::from_str::<Urn>("\"nope\"").is_err());
    }
}
