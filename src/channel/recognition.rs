//! Recognition channels and the events they produce

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ChannelError;
use crate::language::Language;
use crate::phrases::normalize;

/// Which of the two recognition channels an event or command concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    /// Wake-phrase detection
    Listener,
    /// Dictation
    Recognizer,
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRole::Listener => write!(f, "listener"),
            ChannelRole::Recognizer => write!(f, "recognizer"),
        }
    }
}

/// A continuous speech recognizer owned by the host.
///
/// Commands are fire-and-forget. `stop` is advisory: only the channel's end
/// event says it is idle, and the engine alone decides whether to restart.
pub trait RecognitionChannel: Send {
    /// Whether the host has a recognizer behind this channel at all
    fn is_available(&self) -> bool;

    fn start(&mut self) -> Result<(), ChannelError>;

    fn stop(&mut self) -> Result<(), ChannelError>;

    fn set_locale(&mut self, language: &Language) -> Result<(), ChannelError>;
}

/// Results of one recognition event in arrival order, each holding its
/// alternative transcripts best first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecognitionBatch(pub Vec<Vec<String>>);

impl RecognitionBatch {
    /// A batch carrying one result with one alternative
    pub fn single(transcript: impl Into<String>) -> Self {
        Self(vec![vec![transcript.into()]])
    }
}

/// A normalized transcript, alive only while one event is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    text: String,
}

impl RecognitionResult {
    /// Take the primary alternative of the most recent result; earlier
    /// results and lower-ranked alternatives are dropped
    pub fn from_batch(batch: &RecognitionBatch) -> Option<Self> {
        let latest = batch.0.last()?;
        let primary = latest.first()?;
        Some(Self {
            text: normalize(primary),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Events a recognition channel reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Result(RecognitionBatch),
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_result_primary_alternative_wins() {
        let batch = RecognitionBatch(vec![
            vec!["first utterance".into()],
            vec!["  Second Utterance ".into(), "second other".into()],
        ]);
        let result = RecognitionResult::from_batch(&batch).unwrap();
        assert_eq!(result.text(), "second utterance");
    }

    #[test]
    fn test_empty_batches() {
        assert!(RecognitionResult::from_batch(&RecognitionBatch::default()).is_none());
        assert!(RecognitionResult::from_batch(&RecognitionBatch(vec![vec![]])).is_none());
        let blank = RecognitionResult::from_batch(&RecognitionBatch::single("   ")).unwrap();
        assert!(blank.is_empty());
    }

    #[test]
    fn test_batch_wire_format() {
        let batch: RecognitionBatch = serde_json::from_str(r#"[["a","b"],["c"]]"#).unwrap();
        assert_eq!(batch.0.len(), 2);
        assert_eq!(serde_json::to_string(&ChannelRole::Recognizer).unwrap(), "\"recognizer\"");
    }
}
