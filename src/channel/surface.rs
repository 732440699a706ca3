//! Output surfaces: dictation input, status/language labels, execute action

use serde::{Deserialize, Serialize};

use super::ChannelError;
use crate::language::Language;

/// Append-only text surface receiving dictation. The engine never reads it.
pub trait InputSink: Send {
    fn append(&mut self, text: &str) -> Result<(), ChannelError>;

    fn clear(&mut self) -> Result<(), ChannelError>;

    fn scroll_to_end(&mut self) -> Result<(), ChannelError>;
}

/// What the status label shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Listening,
    Recognizing,
    Disabled,
}

impl Status {
    /// Label text
    pub fn text(&self) -> &'static str {
        match self {
            Status::Listening => "listening...",
            Status::Recognizing => "recognizing...",
            Status::Disabled => "No voice input",
        }
    }
}

/// Status and language labels
pub trait StatusDisplay: Send {
    fn show_status(&mut self, status: Status) -> Result<(), ChannelError>;

    fn show_language(&mut self, language: &Language) -> Result<(), ChannelError>;
}

/// The user action run after the execute phrase is confirmed
pub trait ExecuteAction: Send {
    fn execute(&mut self) -> Result<(), ChannelError>;
}
