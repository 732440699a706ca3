//! Language codes and the active-language context

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A language code as understood by the host speech engines, e.g. `en-US`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Language {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// The active language plus the voice configured for each language.
///
/// Only the engine mutates the context, and it does so in one synchronous
/// step together with the channel locales and the language label.
#[derive(Debug, Clone)]
pub struct LanguageContext {
    current: Language,
    default_voices: BTreeMap<Language, String>,
}

impl LanguageContext {
    pub fn new(initial: Language, default_voices: BTreeMap<Language, String>) -> Self {
        Self {
            current: initial,
            default_voices,
        }
    }

    /// The language all phrase lookups currently use
    pub fn current(&self) -> &Language {
        &self.current
    }

    /// Voice configured for `language`, if any
    pub fn default_voice(&self, language: &Language) -> Option<&str> {
        self.default_voices.get(language).map(String::as_str)
    }

    /// Swap in a new active language, returning the previous one
    pub(crate) fn replace(&mut self, language: Language) -> Language {
        std::mem::replace(&mut self.current, language)
    }
}
