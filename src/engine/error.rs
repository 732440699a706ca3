use thiserror::Error;

use crate::channel::{ChannelRole, SynthesisError};
use crate::language::Language;

/// Errors raised while building or steering the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} recognition channel is unavailable on this host")]
    ChannelUnavailable(ChannelRole),

    #[error("speech synthesis is unavailable on this host")]
    SynthesisUnavailable,

    #[error("language {0} has no configured phrases")]
    UnknownLanguage(Language),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl EngineError {
    /// Stable identifier used in IPC error responses
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ChannelUnavailable(_) | EngineError::SynthesisUnavailable => {
                "channel_unavailable"
            }
            EngineError::UnknownLanguage(_) => "unknown_language",
            EngineError::Synthesis(_) => "synthesis",
        }
    }
}
