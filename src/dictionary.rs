//! Phrase dictionary: entries, normalization and the lookup index

mod loader;

use std::collections::HashMap;

use serde::Deserialize;

pub use loader::{
    LoadError,
    load,
    parse,
};

use crate::protocol::TargetLanguage;

/// Normalize a phrase for lookup
///
/// Trims surrounding whitespace and lowercases. Interior characters are kept
/// as they are apart from casing. The same function is applied when the index
/// is built and when a request is looked up.
///
/// # Examples
/// ```
/// use phrase_relay::dictionary::normalize;
///
/// assert_eq!(normalize("  Good Morning \n"), "good morning");
/// ```
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Translations of one phrase, one per supported language
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Translations {
    /// Spanish rendering
    pub spanish: String,
    /// German rendering
    pub german: String,
}

impl Translations {
    /// Translation into `language`
    #[must_use]
    pub fn get(&self, language: TargetLanguage) -> &str {
        match language {
            TargetLanguage::Spanish => &self.spanish,
            TargetLanguage::German => &self.german,
        }
    }
}

/// One authored dictionary entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DictionaryEntry {
    /// Source phrase with its authored casing
    #[serde(rename = "english")]
    pub source_phrase: String,
    /// Per-language translations
    #[serde(flatten)]
    pub translations: Translations,
}

/// Read-only lookup table keyed by normalized source phrase
#[derive(Debug, Clone, Default)]
pub struct DictionaryIndex {
    /// Normalized phrase → translations
    entries: HashMap<String, Translations>,
}

impl DictionaryIndex {
    /// Build the index from authored entries
    ///
    /// When two entries normalize to the same key the later one wins.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = DictionaryEntry>) -> Self {
        let mut index = HashMap::new();
        for entry in entries {
            let key = normalize(&entry.source_phrase);
            if index.insert(key, entry.translations).is_some() {
                tracing::debug!(phrase = %entry.source_phrase, "duplicate dictionary phrase, later entry wins");
            }
        }
        Self { entries: index }
    }

    /// Look up an already normalized key
    #[must_use]
    pub fn lookup(&self, normalized_key: &str) -> Option<&Translations> {
        self.entries.get(normalized_key)
    }

    /// Number of distinct phrases
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no phrase
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
