//! Core voice interaction state machine
//!
//! Handles wake phrases, dictation control phrases, language switches and
//! the user's manual toggles. Every handler is synchronous; anything that
//! must wait for speech playback is parked in the synthesis channel as a
//! `FollowUp` and resumed by `EngineEvent::SpeechEnded`.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::channel::{
    ChannelError, ChannelEvent, ChannelRole, ExecuteAction, FollowUp, InputSink,
    RecognitionBatch, RecognitionChannel, RecognitionResult, SpeechSynthesizer, Status,
    StatusDisplay, SynthesisChannel, UtteranceId,
};
use crate::config::VoiceSettings;
use crate::events::{EngineEvent, StateEvent};
use crate::language::{Language, LanguageContext};
use crate::phrases::{PhraseCategory, PhraseTable};

use super::error::EngineError;
use super::state::{EngineState, Mode};

/// External collaborators injected into the engine
pub struct Collaborators {
    pub listener: Box<dyn RecognitionChannel>,
    pub recognizer: Box<dyn RecognitionChannel>,
    pub synthesizer: Box<dyn SpeechSynthesizer>,
    pub sink: Box<dyn InputSink>,
    pub display: Box<dyn StatusDisplay>,
    pub executor: Box<dyn ExecuteAction>,
}

/// The voice interaction engine
pub struct VoiceEngine {
    phrases: PhraseTable,
    language: LanguageContext,
    listener: Box<dyn RecognitionChannel>,
    recognizer: Box<dyn RecognitionChannel>,
    synthesis: SynthesisChannel,
    sink: Box<dyn InputSink>,
    display: Box<dyn StatusDisplay>,
    executor: Box<dyn ExecuteAction>,
    exec_method: String,
    state: EngineState,
    /// Channel for emitting state events
    event_tx: broadcast::Sender<StateEvent>,
}

impl VoiceEngine {
    /// Build an engine. Fails when the host lacks a recognition or
    /// synthesis primitive, or the initial language has no phrases.
    pub fn new(
        settings: &VoiceSettings,
        collaborators: Collaborators,
        event_tx: broadcast::Sender<StateEvent>,
    ) -> Result<Self, EngineError> {
        for (role, channel) in [
            (ChannelRole::Listener, &collaborators.listener),
            (ChannelRole::Recognizer, &collaborators.recognizer),
        ] {
            if !channel.is_available() {
                return Err(EngineError::ChannelUnavailable(role));
            }
        }
        if !collaborators.synthesizer.is_available() {
            return Err(EngineError::SynthesisUnavailable);
        }

        let phrases = PhraseTable::build(&settings.phrases);
        if !phrases.contains_language(&settings.language) {
            return Err(EngineError::UnknownLanguage(settings.language.clone()));
        }

        let Collaborators {
            listener,
            recognizer,
            synthesizer,
            sink,
            display,
            executor,
        } = collaborators;
        let mut engine = Self {
            phrases,
            language: LanguageContext::new(
                settings.language.clone(),
                settings.default_voices.clone(),
            ),
            listener,
            recognizer,
            synthesis: SynthesisChannel::new(synthesizer, settings.synthesis_enabled),
            sink,
            display,
            executor,
            exec_method: settings.exec_method.clone(),
            state: EngineState::default(),
            event_tx,
        };
        engine.apply_language(settings.language.clone(), true);
        if !engine.synthesis.is_loaded() {
            info!("synthesis backend still loading, confirmations are silent until it is ready");
        }

        Ok(engine)
    }

    /// Begin listening for the wake phrase
    pub fn start(&mut self) {
        info!(language = %self.language.current(), "voice engine started in Listening mode");
        if self.synthesis.is_loaded() {
            self.emit(StateEvent::SynthesisLoaded {
                voices: self.synthesis.voices().to_vec(),
            });
        }
        self.start_listening();
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn language(&self) -> &Language {
        self.language.current()
    }

    pub fn phrases(&self) -> &PhraseTable {
        &self.phrases
    }

    /// Selected synthesis voice
    pub fn voice(&self) -> Option<&str> {
        self.synthesis.voice()
    }

    pub fn voices(&self) -> &[String] {
        self.synthesis.voices()
    }

    /// Whether the synthesis backend has finished loading
    pub fn synthesis_loaded(&self) -> bool {
        self.synthesis.is_loaded()
    }

    /// Whether confirmations are actually spoken
    pub fn synthesis_enabled(&self) -> bool {
        self.synthesis.is_enabled()
    }

    /// Process one event to completion
    pub fn handle(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Channel { role, event } => match (role, event) {
                (ChannelRole::Listener, ChannelEvent::Result(batch)) => {
                    self.on_listener_result(&batch)
                }
                (ChannelRole::Listener, ChannelEvent::End) => self.on_listener_end(),
                (ChannelRole::Recognizer, ChannelEvent::Result(batch)) => {
                    self.on_recognizer_result(&batch)
                }
                (ChannelRole::Recognizer, ChannelEvent::End) => self.on_recognizer_end(),
            },
            EngineEvent::SpeechEnded(id) => self.on_speech_ended(id),
            EngineEvent::Toggle => self.toggle(),
            EngineEvent::SetEnabled(enabled) => self.set_enabled(enabled),
            EngineEvent::CycleLanguage => self.cycle_language(),
            EngineEvent::SetLanguage {
                language,
                switch_voice,
            } => {
                if let Err(e) = self.set_language(language, switch_voice) {
                    warn!(error = %e, "language change rejected");
                }
            }
            EngineEvent::SetSynthesis(enabled) => self.set_synthesis_enabled(enabled),
            EngineEvent::SelectVoice(voice) => {
                if let Err(e) = self.select_voice(voice) {
                    warn!(error = %e, "voice selection rejected");
                }
            }
            EngineEvent::SynthesisReady(voices) => self.on_synthesis_ready(voices),
        }
    }

    /// Switch the active language. Locales and the language label follow
    /// before this returns; the voice follows only when `switch_voice`.
    pub fn set_language(
        &mut self,
        language: Language,
        switch_voice: bool,
    ) -> Result<(), EngineError> {
        if !self.phrases.contains_language(&language) {
            return Err(EngineError::UnknownLanguage(language));
        }
        self.apply_language(language, switch_voice);
        Ok(())
    }

    /// Move to the next configured language. The voice follows when
    /// spoken feedback is on.
    pub fn cycle_language(&mut self) {
        let Some(next) = self
            .phrases
            .next_language(self.language.current())
            .cloned()
        else {
            warn!("no languages to cycle through");
            return;
        };
        let switch_voice = self.synthesis.is_enabled();
        self.apply_language(next, switch_voice);
    }

    /// Manual override from the status label:
    /// - Recognizing: drop the input and leave dictation
    /// - Listening: skip the wake phrase and start dictation
    /// - otherwise resume listening
    pub fn toggle(&mut self) {
        if !self.state.enabled {
            debug!("voice input disabled, toggle ignored");
            return;
        }

        if self.state.want_recognizing {
            info!("dictation stopped by user");
            report("clear input", self.sink.clear());
            self.stop_recognizing();
        } else if self.state.want_listening {
            info!("wake phrase skipped by user");
            self.start_recognizing();
        } else {
            self.start_listening();
        }
    }

    /// Switch voice input on or off. Turning it on starts over in
    /// Listening mode.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.state.enabled == enabled {
            debug!(enabled, "voice input already in requested state");
            return;
        }

        if enabled {
            info!("voice input enabled");
            self.state.enabled = true;
            self.emit(StateEvent::VoiceInputEnabled);
            self.start_listening();
        } else {
            self.stop_voice_input();
        }
    }

    pub fn set_synthesis_enabled(&mut self, enabled: bool) {
        info!(enabled, "spoken feedback toggled");
        self.synthesis.set_enabled(enabled);
        self.emit(StateEvent::SynthesisToggled { enabled });
    }

    pub fn select_voice(&mut self, voice: String) -> Result<(), EngineError> {
        self.synthesis.select_voice(voice.clone())?;
        info!(%voice, "voice selected");
        self.emit(StateEvent::VoiceSelected { voice });
        Ok(())
    }

    /// Stop both channels before the engine is dropped
    pub fn shutdown(&mut self) {
        if self.state.enabled {
            self.stop_voice_input();
        }
    }

    fn on_listener_result(&mut self, batch: &RecognitionBatch) {
        let Some(result) = self.accept(ChannelRole::Listener, batch) else {
            return;
        };
        let language = self.language.current().clone();

        if let Some(target) = self
            .phrases
            .switch_target(&language, result.text())
            .cloned()
        {
            info!(from = %language, to = %target, "switch phrase heard");
            self.state.want_listening = true;
            self.speak(
                PhraseCategory::Confirm,
                Some(FollowUp::SwitchLanguage(target)),
            );
        } else if self
            .phrases
            .matches(PhraseCategory::Start, &language, result.text())
        {
            info!("wake phrase heard");
            self.state.want_listening = false;
            self.speak(PhraseCategory::Response, Some(FollowUp::StartRecognizing));
        } else {
            debug!(text = result.text(), "no phrase matched");
        }
    }

    fn on_listener_end(&mut self) {
        if self.state.want_listening {
            debug!("listener ended, restarting");
            self.start_listening();
        } else {
            debug!("listener ended");
        }
    }

    fn on_recognizer_result(&mut self, batch: &RecognitionBatch) {
        let Some(result) = self.accept(ChannelRole::Recognizer, batch) else {
            return;
        };
        let language = self.language.current().clone();

        if self
            .phrases
            .matches(PhraseCategory::Execute, &language, result.text())
        {
            info!("execute phrase heard");
            self.state.want_listening = true;
            self.stop_recognizing();
            self.speak(PhraseCategory::Confirm, Some(FollowUp::Execute));
        } else if self
            .phrases
            .matches(PhraseCategory::Break, &language, result.text())
        {
            info!("break phrase heard, discarding input");
            report("clear input", self.sink.clear());
            self.state.want_listening = true;
            self.stop_recognizing();
            self.speak(PhraseCategory::Confirm, None);
            self.emit(StateEvent::DictationCancelled);
        } else {
            let text = format!("{} ", result.text());
            report("append input", self.sink.append(&text));
            report("scroll input", self.sink.scroll_to_end());
            self.state.want_recognizing = true;
            self.emit(StateEvent::TranscriptAppended { text });
        }
    }

    fn on_recognizer_end(&mut self) {
        if !self.state.enabled {
            debug!("recognizer ended while voice input disabled");
            return;
        }

        if self.state.want_recognizing {
            debug!("recognizer ended, restarting");
            self.start_recognizing();
        } else {
            self.start_listening();
        }
    }

    /// The backend loaded late: offer its voices and pick the default voice
    /// of the current language from them
    fn on_synthesis_ready(&mut self, voices: Vec<String>) {
        info!(voices = voices.len(), "synthesis backend ready");
        self.synthesis.backend_loaded(voices.clone());
        self.emit(StateEvent::SynthesisLoaded { voices });

        let language = self.language.current().clone();
        self.select_default_voice(&language);
    }

    fn on_speech_ended(&mut self, id: UtteranceId) {
        match self.synthesis.finish(id) {
            Some(follow_up) => self.run_follow_up(follow_up),
            None => debug!(id = id.0, "speech ended, nothing waiting"),
        }
    }

    /// Filter a recognition event down to a usable transcript
    fn accept(&self, role: ChannelRole, batch: &RecognitionBatch) -> Option<RecognitionResult> {
        if !self.state.enabled {
            debug!(%role, "voice input disabled, dropping result");
            return None;
        }
        let result = RecognitionResult::from_batch(batch).filter(|r| !r.is_empty());
        match &result {
            Some(result) => debug!(%role, text = result.text(), "recognition result"),
            None => debug!(%role, "empty recognition result"),
        }
        result
    }

    fn speak(&mut self, category: PhraseCategory, follow_up: Option<FollowUp>) {
        let language = self.language.current();
        let text = self.phrases.phrase(category, language);
        if text.is_none() {
            debug!(%category, %language, "no phrase to speak");
        }
        let ready = self.synthesis.speak(text, language, follow_up);

        if let Some(follow_up) = ready {
            self.run_follow_up(follow_up);
        }
    }

    fn run_follow_up(&mut self, follow_up: FollowUp) {
        debug!(?follow_up, "running follow-up");
        match follow_up {
            FollowUp::SwitchLanguage(target) => {
                if let Err(e) = self.set_language(target, true) {
                    warn!(error = %e, "switch phrase points at an unconfigured language");
                }
            }
            FollowUp::StartRecognizing => {
                if self.state.enabled {
                    self.start_recognizing();
                }
            }
            FollowUp::Execute => {
                info!(method = %self.exec_method, "executing");
                report("execute", self.executor.execute());
                self.emit(StateEvent::ExecuteRequested {
                    method: self.exec_method.clone(),
                });
            }
        }
    }

    fn start_listening(&mut self) {
        self.state.want_listening = true;
        self.state.want_recognizing = false;
        self.enter(Mode::Listening);
        report("start listener", self.listener.start());
        self.emit(StateEvent::ListeningStarted);
    }

    fn start_recognizing(&mut self) {
        let was_listening = self.state.mode == Mode::Listening;
        self.state.want_listening = false;
        self.state.want_recognizing = true;
        self.enter(Mode::Recognizing);
        if was_listening {
            report("stop listener", self.listener.stop());
        }
        report("start recognizer", self.recognizer.start());
        self.emit(StateEvent::RecognizingStarted);
    }

    fn stop_recognizing(&mut self) {
        if self.state.want_recognizing {
            self.state.want_recognizing = false;
            report("stop recognizer", self.recognizer.stop());
        }
    }

    fn stop_voice_input(&mut self) {
        info!("voice input disabled");
        self.state.enabled = false;
        self.state.want_listening = false;
        self.state.want_recognizing = false;
        report("stop listener", self.listener.stop());
        report("stop recognizer", self.recognizer.stop());
        let pending = self.synthesis.pending();
        if pending > 0 {
            debug!(pending, "follow-ups still wait for playback");
        }
        report("show status", self.display.show_status(Status::Disabled));
        self.emit(StateEvent::VoiceInputDisabled);
    }

    /// Record the mode and update the status label
    fn enter(&mut self, mode: Mode) {
        if self.state.mode != mode {
            info!(from = %self.state.mode, to = %mode, "mode transition");
        }
        self.state.mode = mode;

        let status = match mode {
            Mode::Listening => Status::Listening,
            Mode::Recognizing => Status::Recognizing,
        };
        report("show status", self.display.show_status(status));
    }

    fn apply_language(&mut self, language: Language, switch_voice: bool) {
        let previous = self.language.replace(language.clone());
        report("set listener locale", self.listener.set_locale(&language));
        report("set recognizer locale", self.recognizer.set_locale(&language));
        report("show language", self.display.show_language(&language));

        info!(from = %previous, to = %language, "language set");
        self.emit(StateEvent::LanguageChanged {
            language: language.clone(),
        });

        if switch_voice {
            self.select_default_voice(&language);
        }
    }

    /// Select the voice configured for `language`, announcing it when the
    /// selection changes
    fn select_default_voice(&mut self, language: &Language) {
        let Some(voice) = self.language.default_voice(language).map(str::to_string) else {
            warn!(%language, "no default voice configured");
            return;
        };
        if self.synthesis.voice() == Some(voice.as_str()) {
            return;
        }
        match self.synthesis.select_voice(voice.clone()) {
            Ok(()) => {
                debug!(%voice, %language, "default voice selected");
                self.emit(StateEvent::VoiceSelected { voice });
            }
            Err(e) => warn!(error = %e, %language, "default voice unavailable"),
        }
    }

    fn emit(&self, event: StateEvent) {
        debug!(?event, "emitting state event");
        let _ = self.event_tx.send(event);
    }
}

/// Collaborator failures never stop the engine
fn report(action: &'static str, result: Result<(), ChannelError>) {
    if let Err(e) = result {
        warn!(action, error = %e, "host command failed");
    }
}
