use std::collections::BTreeMap;

use oddsfeed_domain::Language;
use serde::{Deserialize, Serialize};

/// Translations of one attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<Language, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for `language`, overwriting any previous one
    pub fn set(&mut self, language: &Language, value: impl Into<String>) {
        self.0.insert(language.clone(), value.into());
    }

    /// Set the value only if `value` is present
    pub fn set_opt(&mut self, language: &Language, value: Option<&str>) {
        if let Some(value) = value {
            self.set(language, value);
        }
    }

    /// Insert an empty value unless a value already exists
    pub fn ensure_present(&mut self, language: &Language) {
        self.0.entry(language.clone()).or_default();
    }

    pub fn get(&self, language: &Language) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }

    pub fn contains(&self, language: &Language) -> bool {
        self.0.contains_key(language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values for the wanted languages that are present
    pub fn subset(&self, wanted: &[Language]) -> BTreeMap<Language, String> {
        wanted
            .iter()
            .filter_map(|language| self.0.get(language).map(|v| (language.clone(), v.clone())))
            .collect()
    }

    /// Merge `other` into `self`; values from `other` win
    pub fn merge(&mut self, other: &LocalizedText) {
        for (language, value) in &other.0 {
            self.0.insert(language.clone(), value.clone());
        }
    }

    pub fn as_map(&self) -> &BTreeMap<Language, String> {
        &self.0
    }
}

impl FromIterator<(Language, String)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (Language, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> Language {
        Language::new(code).unwrap()
    }

    #[test]
    fn test_last_write_wins_per_language() {
        let mut text = LocalizedText::new();
        text.set(&lang("en"), "Old");
        text.set(&lang("de"), "Alt");
        text.set(&lang("en"), "New");

        assert_eq!(text.get(&lang("en")), Some("New"));
        assert_eq!(text.get(&lang("de")), Some("Alt"));
    }

    #[test]
    fn test_ensure_present_keeps_existing_value() {
        let mut text = LocalizedText::new();
        text.set(&lang("en"), "Name");
        text.ensure_present(&lang("en"));
        text.ensure_present(&lang("de"));

        assert_eq!(text.get(&lang("en")), Some("Name"));
        assert_eq!(text.get(&lang("de")), Some(""));
        assert!(text.contains(&lang("de")));
    }

    #[test]
    fn test_subset_and_merge() {
        let mut a: LocalizedText = [(lang("en"), "A".to_string())].into_iter().collect();
        let b: LocalizedText =
            [(lang("en"), "B".to_string()), (lang("fr"), "Bf".to_string())].into_iter().collect();
        a.merge(&b);

        let subset = a.subset(&[lang("en"), lang("de")]);
        assert_eq!(subset.len(), 1);
        assert_eq!(subset[&lang("en")], "B");
        assert_eq!(a.languages().count(), 2);
    }
}
