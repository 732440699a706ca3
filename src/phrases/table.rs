//! Normalized phrase lookup

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::debug;

use super::RawPhrases;
use crate::language::Language;

/// Lower-case and trim, the form every phrase and transcript is compared in
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Single-phrase categories. Switch phrases are kept separately because
/// they map each trigger to a target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhraseCategory {
    Start,
    Execute,
    Break,
    Response,
    Confirm,
}

impl PhraseCategory {
    pub const ALL: [PhraseCategory; 5] = [
        PhraseCategory::Start,
        PhraseCategory::Execute,
        PhraseCategory::Break,
        PhraseCategory::Response,
        PhraseCategory::Confirm,
    ];
}

impl fmt::Display for PhraseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhraseCategory::Start => write!(f, "start"),
            PhraseCategory::Execute => write!(f, "execute"),
            PhraseCategory::Break => write!(f, "break"),
            PhraseCategory::Response => write!(f, "response"),
            PhraseCategory::Confirm => write!(f, "confirm"),
        }
    }
}

/// Per-language phrase lookup.
///
/// Categories are not checked against each other: a language missing from
/// one category simply never matches it.
#[derive(Debug, Clone, Default)]
pub struct PhraseTable {
    phrases: HashMap<PhraseCategory, BTreeMap<Language, String>>,
    switches: BTreeMap<Language, HashMap<String, Language>>,
    /// Languages with a wake phrase, in configuration order
    order: Vec<Language>,
}

impl PhraseTable {
    /// Normalize every configured phrase
    pub fn build(raw: &RawPhrases) -> Self {
        let mut phrases = HashMap::new();
        for category in PhraseCategory::ALL {
            let normalized: BTreeMap<Language, String> = raw
                .category(category)
                .iter()
                .map(|(lang, phrase)| (lang.clone(), normalize(phrase)))
                .collect();
            debug!(%category, languages = normalized.len(), "phrases loaded");
            phrases.insert(category, normalized);
        }

        let switches: BTreeMap<Language, HashMap<String, Language>> = raw
            .switch_phrases
            .iter()
            .map(|(lang, triggers)| {
                let triggers = triggers
                    .iter()
                    .map(|(phrase, target)| (normalize(phrase), target.clone()))
                    .collect();
                (lang.clone(), triggers)
            })
            .collect();
        debug!(languages = switches.len(), "switch phrases loaded");

        let order = raw.start_phrases.languages().cloned().collect();

        Self {
            phrases,
            switches,
            order,
        }
    }

    /// Normalized phrase for `category` in `language`
    pub fn phrase(&self, category: PhraseCategory, language: &Language) -> Option<&str> {
        self.phrases
            .get(&category)
            .and_then(|by_lang| by_lang.get(language))
            .map(String::as_str)
    }

    /// Whether the normalized `text` is the `category` phrase of `language`
    pub fn matches(&self, category: PhraseCategory, language: &Language, text: &str) -> bool {
        match self.phrase(category, language) {
            Some(phrase) => phrase == text,
            None => {
                debug!(%category, %language, "no phrase configured");
                false
            }
        }
    }

    /// Target language when the normalized `text` is a switch trigger
    pub fn switch_target(&self, language: &Language, text: &str) -> Option<&Language> {
        self.switches.get(language)?.get(text)
    }

    /// Whether any category knows `language`
    pub fn contains_language(&self, language: &Language) -> bool {
        self.switches.contains_key(language)
            || self
                .phrases
                .values()
                .any(|by_lang| by_lang.contains_key(language))
    }

    /// Languages with a wake phrase, in the order they were configured
    pub fn languages(&self) -> &[Language] {
        &self.order
    }

    /// The language after `current` in configuration order, wrapping
    /// around. An unknown `current` cycles to the first language.
    pub fn next_language(&self, current: &Language) -> Option<&Language> {
        if self.order.is_empty() {
            return None;
        }
        let next = match self.order.iter().position(|lang| lang == current) {
            Some(index) => (index + 1) % self.order.len(),
            None => 0,
        };
        self.order.get(next)
    }
}
