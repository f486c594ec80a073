//! Per-language merge engine
//!
//! Cache items accumulate translations across independent fetches. Each
//! localisable attribute is a [`LocalizedText`]; which languages a data
//! source has delivered is tracked by a [`LanguageTracker`]. A language that
//! was delivered with an empty string still counts as loaded.
//!
//! Merges are last-write-wins per (attribute, language), so merges for
//! different languages never conflict and re-merging the same payload is a
//! no-op in effect.

mod localized;
mod tracker;

use std::collections::BTreeSet;

use oddsfeed_domain::{DtoPayload, Language};

pub use localized::LocalizedText;
pub use tracker::{DataSource, LanguageTracker};

/// Merge contract implemented by every cache item
pub trait CultureMerge {
    /// Merge one single-language payload.
    ///
    /// Returns `false` when the payload carries nothing for this item.
    fn merge_dto(&self, payload: &DtoPayload, language: &Language) -> bool;

    /// Languages for which the item counts as loaded
    fn loaded_languages(&self) -> BTreeSet<Language>;

    /// Wanted languages not loaded yet, in request order without duplicates
    fn missing_languages(&self, wanted: &[Language]) -> Vec<Language> {
        missing_from(&self.loaded_languages(), wanted)
    }

    fn has_translations_for(&self, wanted: &[Language]) -> bool {
        self.missing_languages(wanted).is_empty()
    }
}

pub(crate) fn missing_from(loaded: &BTreeSet<Language>, wanted: &[Language]) -> Vec<Language> {
    let mut missing: Vec<Language> = Vec::new();
    for language in wanted {
        if !loaded.contains(language) && !missing.contains(language) {
            missing.push(language.clone());
        }
    }
    missing
}
