//! Configuration loading and management

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::language::Language;
use crate::phrases::{PhraseSet, RawPhrases};

/// Environment variable pointing at an alternative voice settings file
pub const SETTINGS_ENV: &str = "VOICE_COMMAND_SETTINGS";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Where the voice settings were read from
    pub settings_path: PathBuf,

    /// Phrases, languages and voices
    pub voice: VoiceSettings,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("voice-command");

        let socket_path = data_dir.join("daemon.sock");
        let settings_path = std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("voice.json"));
        let voice = VoiceSettings::load_or_default(&settings_path)?;

        Ok(Self {
            socket_path,
            data_dir,
            settings_path,
            voice,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

/// Everything the engine is initialized with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    /// Language active at startup
    pub language: Language,

    /// The key order of `startPhrases` is the language cycling order
    pub phrases: RawPhrases,

    /// Identifier of the host action run on the execute phrase
    #[serde(default)]
    pub exec_method: String,

    /// Voice selected when switching to each language
    #[serde(default)]
    pub default_voices: BTreeMap<Language, String>,

    /// Spoken feedback on at startup
    #[serde(default = "default_true")]
    pub synthesis_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl VoiceSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid voice settings")
    }

    /// Read settings from `path`, falling back to the built-in phrase sets
    /// when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(?path, "no voice settings file, using defaults");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings = Self::from_json(&json)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!(?path, language = %settings.language, "voice settings loaded");
        Ok(settings)
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        let en = Language::from("en-US");
        let es = Language::from("es-ES");
        let pair = |en_text: &str, es_text: &str| {
            PhraseSet::from_iter([
                (en.clone(), en_text.to_string()),
                (es.clone(), es_text.to_string()),
            ])
        };

        let phrases = RawPhrases {
            start_phrases: pair("computer", "ordenador"),
            execute_phrases: pair("execute", "ejecutar"),
            switch_phrases: BTreeMap::from([
                (
                    en.clone(),
                    BTreeMap::from([("switch to spanish".to_string(), es.clone())]),
                ),
                (
                    es.clone(),
                    BTreeMap::from([("cambiar a inglés".to_string(), en.clone())]),
                ),
            ]),
            break_phrases: pair("cancel", "cancelar"),
            response_phrases: pair("listening", "escuchando"),
            confirm_phrases: pair("okay", "vale"),
        };

        Self {
            language: en.clone(),
            phrases,
            exec_method: "submit".to_string(),
            default_voices: BTreeMap::from([
                (en, "US English Female".to_string()),
                (es, "Spanish Female".to_string()),
            ]),
            synthesis_enabled: true,
        }
    }
}
