use tokio::sync::broadcast;
use tracing::debug;

use super::{HostCapabilities, HostCommand};
use crate::channel::{
    ChannelError, ChannelRole, ExecuteAction, InputSink, RecognitionChannel, SpeechSynthesizer,
    Status, StatusDisplay, SynthesisError, Utterance,
};
use crate::engine::Collaborators;
use crate::language::Language;

/// Sends collaborator calls to the attached host
#[derive(Debug, Clone)]
pub struct HostBridge {
    tx: broadcast::Sender<HostCommand>,
    capabilities: HostCapabilities,
}

impl HostBridge {
    pub fn new(tx: broadcast::Sender<HostCommand>, capabilities: HostCapabilities) -> Self {
        Self { tx, capabilities }
    }

    /// One collaborator per engine seam, all backed by this bridge
    pub fn collaborators(&self, exec_method: &str) -> Collaborators {
        Collaborators {
            listener: Box::new(HostChannel {
                bridge: self.clone(),
                role: ChannelRole::Listener,
            }),
            recognizer: Box::new(HostChannel {
                bridge: self.clone(),
                role: ChannelRole::Recognizer,
            }),
            synthesizer: Box::new(HostSynthesizer {
                bridge: self.clone(),
            }),
            sink: Box::new(HostSurface {
                bridge: self.clone(),
            }),
            display: Box::new(HostSurface {
                bridge: self.clone(),
            }),
            executor: Box::new(HostExecutor {
                bridge: self.clone(),
                method: exec_method.to_string(),
            }),
        }
    }

    fn send(&self, command: HostCommand) -> Result<(), ChannelError> {
        debug!(?command, "host command");
        self.tx
            .send(command)
            .map(|_| ())
            .map_err(|_| ChannelError::Disconnected)
    }
}

struct HostChannel {
    bridge: HostBridge,
    role: ChannelRole,
}

impl RecognitionChannel for HostChannel {
    fn is_available(&self) -> bool {
        self.bridge.capabilities.recognition
    }

    fn start(&mut self) -> Result<(), ChannelError> {
        self.bridge
            .send(HostCommand::StartChannel { channel: self.role })
    }

    fn stop(&mut self) -> Result<(), ChannelError> {
        self.bridge
            .send(HostCommand::StopChannel { channel: self.role })
    }

    fn set_locale(&mut self, language: &Language) -> Result<(), ChannelError> {
        self.bridge.send(HostCommand::SetLocale {
            channel: self.role,
            language: language.clone(),
        })
    }
}

struct HostSynthesizer {
    bridge: HostBridge,
}

impl SpeechSynthesizer for HostSynthesizer {
    fn is_available(&self) -> bool {
        self.bridge.capabilities.synthesis
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<(), SynthesisError> {
        self.bridge
            .send(HostCommand::Speak {
                utterance: utterance.clone(),
            })
            .map_err(|_| SynthesisError::Disconnected)
    }

    fn voices(&self) -> Option<Vec<String>> {
        self.bridge.capabilities.voices.clone()
    }
}

/// Dictation input and labels
struct HostSurface {
    bridge: HostBridge,
}

impl InputSink for HostSurface {
    fn append(&mut self, text: &str) -> Result<(), ChannelError> {
        self.bridge.send(HostCommand::AppendInput {
            text: text.to_string(),
        })
    }

    fn clear(&mut self) -> Result<(), ChannelError> {
        self.bridge.send(HostCommand::ClearInput)
    }

    fn scroll_to_end(&mut self) -> Result<(), ChannelError> {
        self.bridge.send(HostCommand::ScrollInput)
    }
}

impl StatusDisplay for HostSurface {
    fn show_status(&mut self, status: Status) -> Result<(), ChannelError> {
        self.bridge.send(HostCommand::SetStatus {
            status,
            text: status.text().to_string(),
        })
    }

    fn show_language(&mut self, language: &Language) -> Result<(), ChannelError> {
        self.bridge.send(HostCommand::SetLanguageLabel {
            language: language.clone(),
        })
    }
}

struct HostExecutor {
    bridge: HostBridge,
    method: String,
}

impl ExecuteAction for HostExecutor {
    fn execute(&mut self) -> Result<(), ChannelError> {
        self.bridge.send(HostCommand::Execute {
            method: self.method.clone(),
        })
    }
}
