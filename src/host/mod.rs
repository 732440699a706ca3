//! Host bridge
//!
//! The speech engines, the dictation input and the labels live in a host
//! process. The bridge realizes every engine collaborator as a
//! `HostCommand` broadcast to the host's IPC subscription.

mod bridge;

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelRole, Status, Utterance};
use crate::language::Language;

pub use bridge::HostBridge;

/// What the attaching host can do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// A speech recognizer is present
    pub recognition: bool,

    /// A speech synthesizer is present
    pub synthesis: bool,

    /// Voices of a synthesis backend that has already loaded. Absent while
    /// the backend is loading; the host announces it later with
    /// `synthesis_ready`.
    #[serde(default)]
    pub voices: Option<Vec<String>>,
}

/// Commands pushed to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    StartChannel { channel: ChannelRole },

    StopChannel { channel: ChannelRole },

    SetLocale { channel: ChannelRole, language: Language },

    /// Play an utterance and report `speech_ended` with its id afterwards
    Speak { utterance: Utterance },

    AppendInput { text: String },

    ClearInput,

    ScrollInput,

    SetStatus { status: Status, text: String },

    SetLanguageLabel { language: Language },

    /// Run the host action named by the execute method
    Execute { method: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let command = HostCommand::StartChannel {
            channel: ChannelRole::Listener,
        };
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(json, r#"{"command":"start_channel","channel":"listener"}"#);
    }

    #[test]
    fn test_capabilities_voices_optional() {
        let caps: HostCapabilities =
            serde_json::from_str(r#"{"recognition":true,"synthesis":true}"#).unwrap();
        assert!(caps.recognition);
        assert_eq!(caps.voices, None);

        let caps: HostCapabilities = serde_json::from_str(
            r#"{"recognition":true,"synthesis":true,"voices":["Spanish Female"]}"#,
        )
        .unwrap();
        assert_eq!(caps.voices, Some(vec!["Spanish Female".to_string()]));
    }
}
