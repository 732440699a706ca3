//! Voice interaction engine
//!
//! Two modes, each owned by one recognition channel:
//! - Listening: the listener waits for the wake phrase or a switch phrase
//! - Recognizing: the recognizer takes dictation until execute or break
//!
//! Channels end on their own, so the engine keeps intent flags that say
//! which channel should be running and restarts from them on every end
//! event. The runner owns the engine inside a single task so every handler
//! runs to completion before the next event is looked at.

mod error;
mod machine;
mod runner;
mod state;

#[cfg(test)]
pub(crate) mod fakes;

pub use error::EngineError;
pub use machine::{Collaborators, VoiceEngine};
pub use runner::{AttachmentId, EngineRunner, RunnerCommand};
pub use state::{EngineState, Mode};
