use serde::{Deserialize, Serialize};

/// Which channel is in control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Waiting for the wake phrase
    #[default]
    Listening,
    /// Taking dictation
    Recognizing,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Listening => write!(f, "Listening"),
            Mode::Recognizing => write!(f, "Recognizing"),
        }
    }
}

/// Mode plus the intents consulted whenever a channel ends.
///
/// The intents outlive the channel sessions: a channel that stops for any
/// reason is restarted only if its intent is still set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineState {
    pub mode: Mode,
    pub want_listening: bool,
    pub want_recognizing: bool,
    /// Voice input switched on
    pub enabled: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            mode: Mode::Listening,
            want_listening: true,
            want_recognizing: false,
            enabled: true,
        }
    }
}
