//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelEvent, ChannelRole, RecognitionBatch, UtteranceId};
use crate::config::VoiceSettings;
use crate::engine::Mode;
use crate::events::{EngineEvent, StateEvent};
use crate::host::{HostCapabilities, HostCommand};
use crate::language::Language;
use crate::phrases::RawPhrases;

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from a client to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Request the configured phrases and voices
    GetSettings,

    /// Receive host commands and state events on this connection
    Subscribe,

    /// Register as the host owning the speech engines
    Attach { capabilities: HostCapabilities },

    Detach,

    /// A recognition channel produced results
    ChannelResult {
        channel: ChannelRole,
        results: RecognitionBatch,
    },

    /// A recognition channel went idle
    ChannelEnd { channel: ChannelRole },

    /// Playback of an utterance finished
    SpeechEnded { utterance: UtteranceId },

    /// Status label activated
    Toggle,

    /// Voice input checkbox changed
    SetEnabled { enabled: bool },

    /// Language label activated
    CycleLanguage,

    SetLanguage {
        language: Language,
        #[serde(default)]
        switch_voice: bool,
    },

    /// Synthesis checkbox changed
    SetSynthesis { enabled: bool },

    SelectVoice { voice: String },

    /// The host's synthesis backend finished loading
    SynthesisReady { voices: Vec<String> },
}

impl Request {
    /// The engine input this request carries, if any
    pub fn into_engine_event(self) -> Option<EngineEvent> {
        let event = match self {
            Request::ChannelResult { channel, results } => EngineEvent::Channel {
                role: channel,
                event: ChannelEvent::Result(results),
            },
            Request::ChannelEnd { channel } => EngineEvent::Channel {
                role: channel,
                event: ChannelEvent::End,
            },
            Request::SpeechEnded { utterance } => EngineEvent::SpeechEnded(utterance),
            Request::Toggle => EngineEvent::Toggle,
            Request::SetEnabled { enabled } => EngineEvent::SetEnabled(enabled),
            Request::CycleLanguage => EngineEvent::CycleLanguage,
            Request::SetLanguage {
                language,
                switch_voice,
            } => EngineEvent::SetLanguage {
                language,
                switch_voice,
            },
            Request::SetSynthesis { enabled } => EngineEvent::SetSynthesis(enabled),
            Request::SelectVoice { voice } => EngineEvent::SelectVoice(voice),
            Request::SynthesisReady { voices } => EngineEvent::SynthesisReady(voices),
            Request::Ping
            | Request::GetStatus
            | Request::GetSettings
            | Request::Subscribe
            | Request::Attach { .. }
            | Request::Detach => return None,
        };
        Some(event)
    }
}

/// Responses from daemon to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    Settings(SettingsSnapshot),

    /// Subscription confirmed
    Subscribed,

    /// Engine built against the attaching host
    Attached,

    /// Request queued for the engine
    Accepted,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    /// Work for the host
    Host(HostCommand),
    /// State event occurred
    StateEvent(StateEvent),
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Whether a host is attached and the engine is running
    pub attached: bool,

    /// Voice input switched on
    pub enabled: bool,

    pub mode: Mode,

    pub language: Option<Language>,

    pub synthesis_enabled: bool,

    /// The host's synthesis backend has loaded
    pub synthesis_loaded: bool,

    pub voice: Option<String>,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            attached: false,
            enabled: true,
            mode: Mode::default(),
            language: None,
            synthesis_enabled: true,
            synthesis_loaded: false,
            voice: None,
            uptime_secs: 0,
        }
    }
}

impl DaemonStatus {
    /// Fold a state event into the snapshot
    pub fn apply(&mut self, event: &StateEvent) {
        match event {
            StateEvent::HostAttached => {
                self.attached = true;
                self.enabled = true;
            }
            StateEvent::HostDetached => {
                self.attached = false;
                self.synthesis_loaded = false;
            }
            StateEvent::ListeningStarted => self.mode = Mode::Listening,
            StateEvent::RecognizingStarted => self.mode = Mode::Recognizing,
            StateEvent::LanguageChanged { language } => self.language = Some(language.clone()),
            StateEvent::VoiceInputEnabled => self.enabled = true,
            StateEvent::VoiceInputDisabled => self.enabled = false,
            StateEvent::SynthesisToggled { enabled } => self.synthesis_enabled = *enabled,
            StateEvent::VoiceSelected { voice } => self.voice = Some(voice.clone()),
            StateEvent::SynthesisLoaded { .. } => self.synthesis_loaded = true,
            StateEvent::TranscriptAppended { .. }
            | StateEvent::ExecuteRequested { .. }
            | StateEvent::DictationCancelled => {}
        }
    }
}

/// Configured phrases and voices, as shown in a settings panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub language: Language,
    pub phrases: RawPhrases,
    pub exec_method: String,
    pub default_voices: BTreeMap<Language, String>,
    pub synthesis_enabled: bool,
    /// Voices advertised by the attached host
    pub voices: Vec<String>,
}

impl SettingsSnapshot {
    /// Track the voices of the attached host
    pub fn apply(&mut self, event: &StateEvent) {
        match event {
            StateEvent::SynthesisLoaded { voices } => self.voices = voices.clone(),
            StateEvent::HostDetached => self.voices.clear(),
            _ => {}
        }
    }
}

impl From<&VoiceSettings> for SettingsSnapshot {
    fn from(settings: &VoiceSettings) -> Self {
        Self {
            language: settings.language.clone(),
            phrases: settings.phrases.clone(),
            exec_method: settings.exec_method.clone(),
            default_voices: settings.default_voices.clone(),
            synthesis_enabled: settings.synthesis_enabled,
            voices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;
    use crate::engine::fakes::FakeHost;
    use crate::engine::VoiceEngine;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetLanguage {
            language: "es-ES".into(),
            switch_voice: true,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_language"));
        assert!(json.contains("es-ES"));
    }

    #[test]
    fn test_channel_result_request() {
        let json = r#"{"type":"channel_result","channel":"listener","results":[["Computer"]]}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.into_engine_event(),
            Some(EngineEvent::Channel {
                role: ChannelRole::Listener,
                event: ChannelEvent::Result(RecognitionBatch::single("Computer")),
            })
        );
    }

    #[test]
    fn test_switch_voice_defaults_off() {
        let req: Request =
            serde_json::from_str(r#"{"type":"set_language","language":"es-ES"}"#).unwrap();
        assert_eq!(
            req.into_engine_event(),
            Some(EngineEvent::SetLanguage {
                language: "es-ES".into(),
                switch_voice: false,
            })
        );
        assert_eq!(Request::Ping.into_engine_event(), None);
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"status\""));
        assert!(json.contains("uptime_secs"));
    }

    #[test]
    fn test_notification_wraps_tagged_payloads() {
        let note = Notification::StateEvent(StateEvent::ListeningStarted);
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(
            json,
            r#"{"type":"state_event","payload":{"type":"listening_started"}}"#
        );
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_status_follows_events() {
        let mut status = DaemonStatus::default();
        status.apply(&StateEvent::HostAttached);
        status.apply(&StateEvent::RecognizingStarted);
        status.apply(&StateEvent::LanguageChanged {
            language: "es-ES".into(),
        });
        status.apply(&StateEvent::VoiceSelected {
            voice: "Spanish Female".into(),
        });
        status.apply(&StateEvent::SynthesisLoaded { voices: vec![] });
        status.apply(&StateEvent::VoiceInputDisabled);

        assert!(status.attached);
        assert!(!status.enabled);
        assert!(status.synthesis_loaded);
        assert_eq!(status.mode, Mode::Recognizing);
        assert_eq!(status.language, Some(Language::from("es-ES")));
        assert_eq!(status.voice.as_deref(), Some("Spanish Female"));

        status.apply(&StateEvent::HostDetached);
        assert!(!status.attached);
        assert!(!status.synthesis_loaded);
    }

    #[test]
    fn test_status_tracks_voice_of_switched_language() {
        let host = FakeHost::new();
        let (tx, mut rx) = broadcast::channel(64);
        let mut engine =
            VoiceEngine::new(&VoiceSettings::default(), host.collaborators(false), tx).unwrap();
        engine.start();

        engine.handle(EngineEvent::Channel {
            role: ChannelRole::Listener,
            event: ChannelEvent::Result(RecognitionBatch::single("switch to spanish")),
        });

        let mut status = DaemonStatus::default();
        while let Ok(event) = rx.try_recv() {
            status.apply(&event);
        }
        assert_eq!(status.language, Some(Language::from("es-ES")));
        assert_eq!(status.voice.as_deref(), engine.voice());
        assert_eq!(status.voice.as_deref(), Some("Spanish Female"));
    }

    #[test]
    fn test_settings_follow_loaded_voices() {
        let mut settings = SettingsSnapshot::from(&VoiceSettings::default());
        assert!(settings.voices.is_empty());

        settings.apply(&StateEvent::SynthesisLoaded {
            voices: vec!["Spanish Female".into()],
        });
        assert_eq!(settings.voices, vec!["Spanish Female".to_string()]);

        settings.apply(&StateEvent::HostDetached);
        assert!(settings.voices.is_empty());
    }

    #[test]
    fn test_synthesis_ready_request() {
        let req: Request =
            serde_json::from_str(r#"{"type":"synthesis_ready","voices":["UK English Male"]}"#)
                .unwrap();
        assert_eq!(
            req.into_engine_event(),
            Some(EngineEvent::SynthesisReady(vec!["UK English Male".into()]))
        );
    }
}
