use std::collections::{BTreeMap, BTreeSet};

use oddsfeed_domain::Language;
use serde::{Deserialize, Serialize};

use super::missing_from;

/// Kind of upstream data that delivered a language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Event or tournament summary
    Summary,
    /// Event fixture
    Fixture,
    /// Competitor or player profile
    Profile,
    /// Data embedded in another entity's payload
    Referenced,
    /// Market or variant description lists
    Descriptions,
}

/// Loaded languages per data source
///
/// Languages are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTracker(BTreeMap<DataSource, BTreeSet<Language>>);

impl LanguageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, source: DataSource, language: &Language) {
        self.0.entry(source).or_default().insert(language.clone());
    }

    pub fn is_loaded(&self, source: DataSource, language: &Language) -> bool {
        self.0.get(&source).is_some_and(|set| set.contains(language))
    }

    pub fn loaded(&self, source: DataSource) -> BTreeSet<Language> {
        self.0.get(&source).cloned().unwrap_or_default()
    }

    /// Languages loaded by any of `sources`
    pub fn loaded_any(&self, sources: &[DataSource]) -> BTreeSet<Language> {
        sources.iter().filter_map(|s| self.0.get(s)).flatten().cloned().collect()
    }

    /// Languages loaded by any source
    pub fn all_loaded(&self) -> BTreeSet<Language> {
        self.0.values().flatten().cloned().collect()
    }

    pub fn missing(&self, source: DataSource, wanted: &[Language]) -> Vec<Language> {
        missing_from(&self.loaded(source), wanted)
    }

    pub fn sources(&self) -> impl Iterator<Item = DataSource> + '_ {
        self.0.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> Language {
        Language::new(code).unwrap()
    }

    #[test]
    fn test_sources_are_tracked_separately() {
        let mut tracker = LanguageTracker::new();
        tracker.mark(DataSource::Summary, &lang("en"));
        tracker.mark(DataSource::Fixture, &lang("de"));

        assert!(tracker.is_loaded(DataSource::Summary, &lang("en")));
        assert!(!tracker.is_loaded(DataSource::Fixture, &lang("en")));
        assert_eq!(tracker.missing(DataSource::Fixture, &[lang("en"), lang("de")]), vec![lang("en")]);
        assert_eq!(tracker.all_loaded().len(), 2);
        assert_eq!(
            tracker.loaded_any(&[DataSource::Summary, DataSource::Profile]),
            BTreeSet::from([lang("en")])
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let mut tracker = LanguageTracker::new();
        tracker.mark(DataSource::Profile, &lang("en"));
        tracker.mark(DataSource::Referenced, &lang("de"));

        let json = serde_json::to_string(&tracker).unwrap();
        assert!(json.contains("\"profile\""));
        let back: LanguageTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tracker);
    }
}
