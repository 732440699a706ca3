//! Recording stand-ins for every engine collaborator

use std::sync::{Arc, Mutex};

use crate::channel::{
    ChannelError, ChannelRole, ExecuteAction, InputSink, RecognitionChannel, SpeechSynthesizer,
    Status, StatusDisplay, SynthesisError, Utterance,
};
use crate::language::Language;

use super::Collaborators;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Start(ChannelRole),
    Stop(ChannelRole),
    Locale(ChannelRole, Language),
    Speak(Utterance),
    Append(String),
    Clear,
    Scroll,
    Status(Status),
    LanguageLabel(Language),
    Execute,
}

/// Shared call log behind every fake collaborator
#[derive(Clone)]
pub(crate) struct FakeHost {
    calls: Arc<Mutex<Vec<Call>>>,
    recognition: bool,
    synthesis: bool,
    voices: Vec<String>,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            recognition: true,
            synthesis: true,
            voices: vec!["US English Female".into(), "Spanish Female".into()],
        }
    }

    pub(crate) fn without_recognition() -> Self {
        Self {
            recognition: false,
            ..Self::new()
        }
    }

    pub(crate) fn without_synthesis() -> Self {
        Self {
            synthesis: false,
            ..Self::new()
        }
    }

    /// Collaborators backed by this host. With `loaded` false the synthesis
    /// backend is still loading.
    pub(crate) fn collaborators(&self, loaded: bool) -> Collaborators {
        Collaborators {
            listener: Box::new(FakeChannel {
                host: self.clone(),
                role: ChannelRole::Listener,
            }),
            recognizer: Box::new(FakeChannel {
                host: self.clone(),
                role: ChannelRole::Recognizer,
            }),
            synthesizer: Box::new(FakeSynthesizer {
                host: self.clone(),
                voices: loaded.then(|| self.voices.clone()),
            }),
            sink: Box::new(self.clone()),
            display: Box::new(self.clone()),
            executor: Box::new(self.clone()),
        }
    }

    pub(crate) fn voices(&self) -> Vec<String> {
        self.voices.clone()
    }

    fn record(&self, call: Call) -> Result<(), ChannelError> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Drain the log
    pub(crate) fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub(crate) fn last_utterance(&self) -> Option<Utterance> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::Speak(utterance) => Some(utterance),
            _ => None,
        })
    }

    pub(crate) fn executions(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Execute))
            .count()
    }

    /// Input text as a real sink would hold it
    pub(crate) fn input(&self) -> String {
        let mut text = String::new();
        for call in self.calls() {
            match call {
                Call::Append(piece) => text.push_str(&piece),
                Call::Clear => text.clear(),
                _ => {}
            }
        }
        text
    }
}

struct FakeChannel {
    host: FakeHost,
    role: ChannelRole,
}

impl RecognitionChannel for FakeChannel {
    fn is_available(&self) -> bool {
        self.host.recognition
    }

    fn start(&mut self) -> Result<(), ChannelError> {
        self.host.record(Call::Start(self.role))
    }

    fn stop(&mut self) -> Result<(), ChannelError> {
        self.host.record(Call::Stop(self.role))
    }

    fn set_locale(&mut self, language: &Language) -> Result<(), ChannelError> {
        self.host.record(Call::Locale(self.role, language.clone()))
    }
}

struct FakeSynthesizer {
    host: FakeHost,
    voices: Option<Vec<String>>,
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn is_available(&self) -> bool {
        self.host.synthesis
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<(), SynthesisError> {
        self.host
            .calls
            .lock()
            .unwrap()
            .push(Call::Speak(utterance.clone()));
        Ok(())
    }

    fn voices(&self) -> Option<Vec<String>> {
        self.voices.clone()
    }
}

impl InputSink for FakeHost {
    fn append(&mut self, text: &str) -> Result<(), ChannelError> {
        self.record(Call::Append(text.to_string()))
    }

    fn clear(&mut self) -> Result<(), ChannelError> {
        self.record(Call::Clear)
    }

    fn scroll_to_end(&mut self) -> Result<(), ChannelError> {
        self.record(Call::Scroll)
    }
}

impl StatusDisplay for FakeHost {
    fn show_status(&mut self, status: Status) -> Result<(), ChannelError> {
        self.record(Call::Status(status))
    }

    fn show_language(&mut self, language: &Language) -> Result<(), ChannelError> {
        self.record(Call::LanguageLabel(language.clone()))
    }
}

impl ExecuteAction for FakeHost {
    fn execute(&mut self) -> Result<(), ChannelError> {
        self.record(Call::Execute)
    }
}
