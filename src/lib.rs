//! voice_command: wake-phrase voice command engine
//!
//! The engine listens for a wake phrase on one recognition channel, switches
//! a second channel into dictation, matches control phrases (execute, cancel,
//! language switch) and confirms them with synthesized speech.
//!
//! Speech engines live in a host process. The daemon binary exposes the
//! engine over a Unix socket; the host attaches, streams recognition and
//! playback events in, and receives channel commands back.

pub mod channel;
pub mod config;
pub mod engine;
pub mod events;
pub mod host;
pub mod ipc;
pub mod language;
pub mod lifecycle;
pub mod phrases;

pub use config::{Config, VoiceSettings};
pub use engine::{Collaborators, EngineError, EngineRunner, RunnerCommand, VoiceEngine};
pub use events::{EngineEvent, StateEvent};
pub use language::{Language, LanguageContext};
pub use phrases::{PhraseCategory, PhraseSet, PhraseTable, RawPhrases};
