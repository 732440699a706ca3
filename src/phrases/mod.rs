//! Control phrases per language
//!
//! Six phrase sets drive the engine:
//! - start: wake phrase heard by the listener
//! - response: spoken back before dictation begins
//! - execute: ends dictation and runs the configured action
//! - break: ends dictation and discards the input
//! - confirm: spoken back after execute, break and language switches
//! - switch: trigger phrase -> target language

mod table;

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::language::Language;

pub use table::{normalize, PhraseCategory, PhraseTable};

/// One phrase per language, kept in configuration order.
///
/// Serialized as a JSON object. The order of its keys is the order the
/// language label cycles through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseSet(Vec<(Language, String)>);

impl PhraseSet {
    pub fn get(&self, language: &Language) -> Option<&str> {
        self.0
            .iter()
            .find(|(lang, _)| lang == language)
            .map(|(_, phrase)| phrase.as_str())
    }

    /// Set the phrase of `language`, keeping its position when it is
    /// already present
    pub fn insert(&mut self, language: Language, phrase: String) {
        match self.0.iter_mut().find(|(lang, _)| *lang == language) {
            Some((_, existing)) => *existing = phrase,
            None => self.0.push((language, phrase)),
        }
    }

    pub fn remove(&mut self, language: &Language) -> Option<String> {
        let index = self.0.iter().position(|(lang, _)| lang == language)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Language, &str)> {
        self.0.iter().map(|(lang, phrase)| (lang, phrase.as_str()))
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.0.iter().map(|(lang, _)| lang)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Language, String)> for PhraseSet {
    fn from_iter<I: IntoIterator<Item = (Language, String)>>(iter: I) -> Self {
        let mut set = PhraseSet::default();
        for (language, phrase) in iter {
            set.insert(language, phrase);
        }
        set
    }
}

impl Serialize for PhraseSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (language, phrase) in &self.0 {
            map.serialize_entry(language, phrase)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PhraseSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PhraseSetVisitor;

        impl<'de> Visitor<'de> for PhraseSetVisitor {
            type Value = PhraseSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from language code to phrase")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PhraseSet, A::Error> {
                let mut set = PhraseSet::default();
                while let Some((language, phrase)) = access.next_entry::<Language, String>()? {
                    set.insert(language, phrase);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(PhraseSetVisitor)
    }
}

/// Phrase sets exactly as configured, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPhrases {
    #[serde(default)]
    pub start_phrases: PhraseSet,
    #[serde(default)]
    pub execute_phrases: PhraseSet,
    #[serde(default)]
    pub switch_phrases: BTreeMap<Language, BTreeMap<String, Language>>,
    #[serde(default)]
    pub break_phrases: PhraseSet,
    #[serde(default)]
    pub response_phrases: PhraseSet,
    #[serde(default)]
    pub confirm_phrases: PhraseSet,
}

impl RawPhrases {
    /// The single-phrase set for `category`
    pub fn category(&self, category: PhraseCategory) -> &PhraseSet {
        match category {
            PhraseCategory::Start => &self.start_phrases,
            PhraseCategory::Execute => &self.execute_phrases,
            PhraseCategory::Break => &self.break_phrases,
            PhraseCategory::Response => &self.response_phrases,
            PhraseCategory::Confirm => &self.confirm_phrases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_phrases_camel_case_keys() {
        let json = r#"{
            "startPhrases": {"en-US": "Computer"},
            "switchPhrases": {"en-US": {"Switch to Spanish": "es-ES"}}
        }"#;
        let raw: RawPhrases = serde_json::from_str(json).unwrap();
        assert_eq!(raw.start_phrases.get(&"en-US".into()), Some("Computer"));
        assert!(raw.execute_phrases.is_empty());
        assert_eq!(
            raw.switch_phrases[&Language::from("en-US")]["Switch to Spanish"],
            Language::from("es-ES")
        );
    }

    #[test]
    fn test_phrase_set_keeps_configuration_order() {
        let json = r#"{"fr-FR": "Ordinateur", "en-US": "Computer", "de-DE": "Rechner"}"#;
        let set: PhraseSet = serde_json::from_str(json).unwrap();
        let languages: Vec<&str> = set.languages().map(Language::as_str).collect();
        assert_eq!(languages, ["fr-FR", "en-US", "de-DE"]);

        let back = serde_json::to_string(&set).unwrap();
        assert_eq!(back, r#"{"fr-FR":"Ordinateur","en-US":"Computer","de-DE":"Rechner"}"#);
    }

    #[test]
    fn test_phrase_set_insert_and_remove() {
        let mut set: PhraseSet = [
            (Language::from("en-US"), "computer".to_string()),
            (Language::from("es-ES"), "ordenador".to_string()),
        ]
        .into_iter()
        .collect();

        set.insert("en-US".into(), "hey computer".into());
        assert_eq!(set.get(&"en-US".into()), Some("hey computer"));
        assert_eq!(set.languages().next(), Some(&Language::from("en-US")));

        assert_eq!(set.remove(&"en-US".into()), Some("hey computer".to_string()));
        assert_eq!(set.remove(&"en-US".into()), None);
        assert_eq!(set.get(&"en-US".into()), None);
    }
}
