//! Single task owning the engine
//!
//! Every input reaches the engine through one queue, so handlers never
//! overlap. The engine exists only while a host is attached.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::VoiceSettings;
use crate::events::{EngineEvent, StateEvent};
use crate::host::{HostBridge, HostCapabilities, HostCommand};

use super::error::EngineError;
use super::machine::VoiceEngine;

/// Identifies one host attachment. A later attach supersedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub u64);

/// Messages handled by the runner
#[derive(Debug)]
pub enum RunnerCommand {
    /// A host attached; build and start the engine against it
    Attach {
        capabilities: HostCapabilities,
        reply: oneshot::Sender<Result<AttachmentId, EngineError>>,
    },

    /// The host of `attachment` went away. Ignored once a newer host has
    /// attached.
    Detach { attachment: AttachmentId },

    /// Input for the running engine
    Engine(EngineEvent),

    /// Tear down and stop processing
    Shutdown,
}

/// Owns the engine for the lifetime of a host attachment
pub struct EngineRunner {
    settings: VoiceSettings,
    host_tx: broadcast::Sender<HostCommand>,
    event_tx: broadcast::Sender<StateEvent>,
    next_attachment: u64,
    attached: Option<(AttachmentId, VoiceEngine)>,
}

impl EngineRunner {
    pub fn new(
        settings: VoiceSettings,
        host_tx: broadcast::Sender<HostCommand>,
        event_tx: broadcast::Sender<StateEvent>,
    ) -> Self {
        Self {
            settings,
            host_tx,
            event_tx,
            next_attachment: 0,
            attached: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// The attachment currently owning the engine
    pub fn attachment(&self) -> Option<AttachmentId> {
        self.attached.as_ref().map(|(id, _)| *id)
    }

    pub fn engine(&self) -> Option<&VoiceEngine> {
        self.attached.as_ref().map(|(_, engine)| engine)
    }

    /// Process commands until the queue closes or shutdown is requested
    pub async fn run(&mut self, mut rx: mpsc::Receiver<RunnerCommand>) {
        info!("engine runner started, waiting for a host");

        while let Some(command) = rx.recv().await {
            if matches!(command, RunnerCommand::Shutdown) {
                break;
            }
            self.handle(command);
        }

        self.detach();
        info!("engine runner stopped");
    }

    pub fn handle(&mut self, command: RunnerCommand) {
        match command {
            RunnerCommand::Attach {
                capabilities,
                reply,
            } => {
                let result = self.attach(capabilities);
                if reply.send(result).is_err() {
                    warn!("attach requester went away before the reply");
                }
            }
            RunnerCommand::Detach { attachment } => {
                if self.attachment() == Some(attachment) {
                    self.detach();
                } else {
                    debug!(attachment = attachment.0, "detach for a superseded host ignored");
                }
            }
            RunnerCommand::Engine(event) => match self.attached.as_mut() {
                Some((_, engine)) => engine.handle(event),
                None => warn!(?event, "no host attached, event dropped"),
            },
            RunnerCommand::Shutdown => self.detach(),
        }
    }

    fn attach(&mut self, capabilities: HostCapabilities) -> Result<AttachmentId, EngineError> {
        self.detach();

        info!(
            recognition = capabilities.recognition,
            synthesis = capabilities.synthesis,
            voices = ?capabilities.voices.as_ref().map(Vec::len),
            "host attaching"
        );
        let bridge = HostBridge::new(self.host_tx.clone(), capabilities);
        let mut engine = VoiceEngine::new(
            &self.settings,
            bridge.collaborators(&self.settings.exec_method),
            self.event_tx.clone(),
        )
        .map_err(|e| {
            error!(error = %e, "voice engine could not be built");
            e
        })?;

        self.next_attachment += 1;
        let id = AttachmentId(self.next_attachment);

        let _ = self.event_tx.send(StateEvent::HostAttached);
        engine.start();
        self.attached = Some((id, engine));
        info!(attachment = id.0, "host attached");
        Ok(id)
    }

    fn detach(&mut self) {
        if let Some((id, mut engine)) = self.attached.take() {
            engine.shutdown();
            let _ = self.event_tx.send(StateEvent::HostDetached);
            info!(attachment = id.0, "host detached, voice engine dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelEvent, ChannelRole, RecognitionBatch};
    use crate::engine::Mode;

    struct Harness {
        runner: EngineRunner,
        host_rx: broadcast::Receiver<HostCommand>,
        event_rx: broadcast::Receiver<StateEvent>,
    }

    fn harness() -> Harness {
        let (host_tx, host_rx) = broadcast::channel(64);
        let (event_tx, event_rx) = broadcast::channel(64);
        Harness {
            runner: EngineRunner::new(VoiceSettings::default(), host_tx, event_tx),
            host_rx,
            event_rx,
        }
    }

    fn attach(
        runner: &mut EngineRunner,
        capabilities: HostCapabilities,
    ) -> Result<AttachmentId, EngineError> {
        let (reply, mut rx) = oneshot::channel();
        runner.handle(RunnerCommand::Attach {
            capabilities,
            reply,
        });
        rx.try_recv().expect("attach reply")
    }

    fn full_host() -> HostCapabilities {
        HostCapabilities {
            recognition: true,
            synthesis: true,
            voices: Some(vec![]),
        }
    }

    fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        items
    }

    #[test]
    fn test_attach_starts_listening() {
        let mut h = harness();
        attach(&mut h.runner, full_host()).unwrap();
        assert!(h.runner.is_attached());

        let commands = drain(&mut h.host_rx);
        assert_eq!(
            commands.last(),
            Some(&HostCommand::StartChannel {
                channel: ChannelRole::Listener
            })
        );
        let events = drain(&mut h.event_rx);
        assert!(events.contains(&StateEvent::HostAttached));
        assert!(events.contains(&StateEvent::ListeningStarted));
    }

    #[test]
    fn test_attach_without_recognition_fails() {
        let mut h = harness();
        let result = attach(&mut h.runner, HostCapabilities::default());
        assert!(matches!(result, Err(EngineError::ChannelUnavailable(_))));
        assert!(!h.runner.is_attached());
        assert!(drain(&mut h.host_rx).is_empty());
    }

    #[test]
    fn test_attach_without_synthesis_fails() {
        let mut h = harness();
        let result = attach(
            &mut h.runner,
            HostCapabilities {
                recognition: true,
                synthesis: false,
                voices: None,
            },
        );
        assert!(matches!(result, Err(EngineError::SynthesisUnavailable)));
        assert!(!h.runner.is_attached());
    }

    #[test]
    fn test_events_dropped_without_host() {
        let mut h = harness();
        h.runner.handle(RunnerCommand::Engine(EngineEvent::Toggle));
        assert!(drain(&mut h.host_rx).is_empty());
    }

    #[test]
    fn test_engine_events_forwarded() {
        let mut h = harness();
        attach(&mut h.runner, full_host()).unwrap();
        drain(&mut h.host_rx);

        h.runner.handle(RunnerCommand::Engine(EngineEvent::Channel {
            role: ChannelRole::Listener,
            event: ChannelEvent::Result(RecognitionBatch::single("computer")),
        }));
        let spoken = drain(&mut h.host_rx);
        let Some(HostCommand::Speak { utterance }) = spoken.last() else {
            panic!("expected a speak command, got {:?}", spoken);
        };
        assert_eq!(utterance.text, "listening");

        h.runner
            .handle(RunnerCommand::Engine(EngineEvent::SpeechEnded(utterance.id)));
        assert_eq!(h.runner.engine().unwrap().mode(), Mode::Recognizing);
    }

    #[test]
    fn test_detach_stops_channels() {
        let mut h = harness();
        let attachment = attach(&mut h.runner, full_host()).unwrap();
        drain(&mut h.host_rx);
        drain(&mut h.event_rx);

        h.runner.handle(RunnerCommand::Detach { attachment });
        assert!(!h.runner.is_attached());
        let commands = drain(&mut h.host_rx);
        assert!(commands.contains(&HostCommand::StopChannel {
            channel: ChannelRole::Recognizer
        }));
        assert!(drain(&mut h.event_rx).contains(&StateEvent::HostDetached));
    }

    #[test]
    fn test_superseded_detach_is_ignored() {
        let mut h = harness();
        let first = attach(&mut h.runner, full_host()).unwrap();
        let second = attach(&mut h.runner, full_host()).unwrap();
        assert_ne!(first, second);
        assert_eq!(h.runner.attachment(), Some(second));
        drain(&mut h.host_rx);
        drain(&mut h.event_rx);

        h.runner.handle(RunnerCommand::Detach { attachment: first });
        assert_eq!(h.runner.attachment(), Some(second));
        assert!(drain(&mut h.host_rx).is_empty());
        assert!(drain(&mut h.event_rx).is_empty());
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let h = harness();
        let mut runner = h.runner;
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            runner.run(rx).await;
            runner
        });

        let (reply, reply_rx) = oneshot::channel();
        tx.send(RunnerCommand::Attach {
            capabilities: full_host(),
            reply,
        })
        .await
        .unwrap();
        tokio_test::assert_ok!(reply_rx.await.unwrap());

        tx.send(RunnerCommand::Shutdown).await.unwrap();
        let runner = task.await.unwrap();
        assert!(!runner.is_attached());
    }
}
