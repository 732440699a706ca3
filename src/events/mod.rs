//! Events flowing into and out of the engine
//!
//! `EngineEvent` is everything that can drive a transition: channel results
//! and ends, synthesis completion, and user actions. `StateEvent` is what the
//! engine broadcasts after it has acted.

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelEvent, ChannelRole, UtteranceId};
use crate::language::Language;

/// Inputs to the engine, handled one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A recognition channel produced a result or went idle
    Channel {
        role: ChannelRole,
        event: ChannelEvent,
    },

    /// Playback of an utterance finished
    SpeechEnded(UtteranceId),

    /// Status label activated: skip or leave dictation by hand
    Toggle,

    /// Voice input switched on or off
    SetEnabled(bool),

    /// Language label activated: move to the next language
    CycleLanguage,

    SetLanguage {
        language: Language,
        switch_voice: bool,
    },

    /// Spoken feedback switched on or off
    SetSynthesis(bool),

    SelectVoice(String),

    /// The synthesis backend finished loading and offers these voices
    SynthesisReady(Vec<String>),
}

/// Events broadcast by the engine and the runner around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// A host attached and the engine was built
    HostAttached,

    /// The engine was torn down
    HostDetached,

    /// Wake-phrase detection (re)started
    ListeningStarted,

    /// Dictation (re)started
    RecognizingStarted,

    LanguageChanged { language: Language },

    /// Free dictation was appended to the input
    TranscriptAppended { text: String },

    /// The execute action was invoked
    ExecuteRequested { method: String },

    /// Dictation was abandoned and the input cleared
    DictationCancelled,

    VoiceInputEnabled,

    VoiceInputDisabled,

    SynthesisToggled { enabled: bool },

    VoiceSelected { voice: String },

    /// Spoken feedback became possible
    SynthesisLoaded { voices: Vec<String> },
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::HostAttached => write!(f, "HOST_ATTACHED"),
            StateEvent::HostDetached => write!(f, "HOST_DETACHED"),
            StateEvent::ListeningStarted => write!(f, "LISTENING_STARTED"),
            StateEvent::RecognizingStarted => write!(f, "RECOGNIZING_STARTED"),
            StateEvent::LanguageChanged { language } => {
                write!(f, "LANGUAGE_CHANGED ({})", language)
            }
            StateEvent::TranscriptAppended { text } => {
                write!(f, "TRANSCRIPT_APPENDED ({} chars)", text.len())
            }
            StateEvent::ExecuteRequested { method } => {
                write!(f, "EXECUTE_REQUESTED ({})", method)
            }
            StateEvent::DictationCancelled => write!(f, "DICTATION_CANCELLED"),
            StateEvent::VoiceInputEnabled => write!(f, "VOICE_INPUT_ENABLED"),
            StateEvent::VoiceInputDisabled => write!(f, "VOICE_INPUT_DISABLED"),
            StateEvent::SynthesisToggled { enabled } => {
                write!(f, "SYNTHESIS_TOGGLED ({})", enabled)
            }
            StateEvent::VoiceSelected { voice } => write!(f, "VOICE_SELECTED ({})", voice),
            StateEvent::SynthesisLoaded { voices } => {
                write!(f, "SYNTHESIS_LOADED ({} voices)", voices.len())
            }
        }
    }
}
