//! Collaborator seams of the engine
//!
//! Everything the engine talks to is behind a trait here: the two
//! recognition channels, the speech synthesizer and the surfaces it writes
//! to (dictation input, status and language labels, the execute action).

mod recognition;
mod surface;
mod synthesis;

use thiserror::Error;

pub use recognition::{
    ChannelEvent, ChannelRole, RecognitionBatch, RecognitionChannel, RecognitionResult,
};
pub use surface::{ExecuteAction, InputSink, Status, StatusDisplay};
pub use synthesis::{
    FollowUp, SpeechSynthesizer, SynthesisChannel, SynthesisError, Utterance, UtteranceId,
};

/// A command to a collaborator could not be delivered
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0} channel is not available on this host")]
    Unavailable(ChannelRole),

    #[error("no host is connected to receive the command")]
    Disconnected,
}
