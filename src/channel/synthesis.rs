//! Spoken feedback
//!
//! The synthesis channel pairs each utterance with the work that must wait
//! for it. The follow-up is stored under the utterance id and moved out
//! exactly once: when playback ends, or immediately when nothing will play.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::language::Language;

/// Errors reported by the synthesis layer
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("no synthesis backend is connected")]
    Disconnected,

    #[error("voice {0:?} is not offered by the synthesis backend")]
    UnknownVoice(String),
}

/// Identifies one spoken utterance so its end can be matched later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(pub u64);

/// A request to speak
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub voice: Option<String>,
    pub language: Language,
}

/// A text-to-speech backend.
///
/// `speak` starts playback and returns; the end of playback is reported
/// later as an `EngineEvent::SpeechEnded` carrying the utterance id.
pub trait SpeechSynthesizer: Send {
    /// Whether the host has a synthesis primitive at all
    fn is_available(&self) -> bool;

    fn speak(&mut self, utterance: &Utterance) -> Result<(), SynthesisError>;

    /// Names of the voices the backend offers, or `None` while the backend
    /// is still loading
    fn voices(&self) -> Option<Vec<String>>;
}

/// Work deferred until a spoken response or confirmation has finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    SwitchLanguage(Language),
    StartRecognizing,
    Execute,
}

/// Synthesis gated by the user's enable flag.
///
/// Until the backend has loaded the channel behaves as disabled.
pub struct SynthesisChannel {
    backend: Box<dyn SpeechSynthesizer>,
    /// Voices of the loaded backend
    loaded: Option<Vec<String>>,
    enabled: bool,
    voice: Option<String>,
    next_id: u64,
    pending: HashMap<UtteranceId, FollowUp>,
}

impl SynthesisChannel {
    pub fn new(backend: Box<dyn SpeechSynthesizer>, enabled: bool) -> Self {
        let loaded = backend.voices();
        Self {
            backend,
            loaded,
            enabled,
            voice: None,
            next_id: 0,
            pending: HashMap::new(),
        }
    }

    /// Whether utterances will actually be played
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.is_loaded()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// The backend finished loading and offers `voices`
    pub fn backend_loaded(&mut self, voices: Vec<String>) {
        debug!(voices = voices.len(), "synthesis backend loaded");
        if let Some(voice) = &self.voice {
            if !voices.is_empty() && !voices.contains(voice) {
                warn!(%voice, "selected voice is not offered by the backend");
                self.voice = None;
            }
        }
        self.loaded = Some(voices);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Currently selected voice
    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn voices(&self) -> &[String] {
        self.loaded.as_deref().unwrap_or_default()
    }

    /// Select a voice. When the backend advertises voices the name must be
    /// one of them.
    pub fn select_voice(&mut self, voice: String) -> Result<(), SynthesisError> {
        let offered = self.voices();
        if !offered.is_empty() && !offered.contains(&voice) {
            return Err(SynthesisError::UnknownVoice(voice));
        }
        self.voice = Some(voice);
        Ok(())
    }

    /// Speak `text` and park `follow_up` until playback ends.
    ///
    /// Returns the follow-up when it has to run right away: synthesis is
    /// disabled or still loading, there is nothing to say, or the backend
    /// refused the request.
    #[must_use]
    pub fn speak(
        &mut self,
        text: Option<&str>,
        language: &Language,
        follow_up: Option<FollowUp>,
    ) -> Option<FollowUp> {
        if !self.enabled {
            debug!("synthesis disabled, skipping playback");
            return follow_up;
        }
        if !self.is_loaded() {
            debug!("synthesis backend not loaded, skipping playback");
            return follow_up;
        }
        let Some(text) = text else {
            debug!(%language, "nothing to say");
            return follow_up;
        };

        self.next_id += 1;
        let utterance = Utterance {
            id: UtteranceId(self.next_id),
            text: text.to_string(),
            voice: self.voice.clone(),
            language: language.clone(),
        };

        match self.backend.speak(&utterance) {
            Ok(()) => {
                debug!(id = utterance.id.0, text = %utterance.text, "speaking");
                if let Some(follow_up) = follow_up {
                    self.pending.insert(utterance.id, follow_up);
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "synthesis failed, continuing without playback");
                follow_up
            }
        }
    }

    /// Playback of `id` ended; hand back whatever was waiting for it
    pub fn finish(&mut self, id: UtteranceId) -> Option<FollowUp> {
        self.pending.remove(&id)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
