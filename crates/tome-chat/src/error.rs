//! Error types for the conversation core.

use tome_core::error::TomeError;

/// The phase of a conversation turn, carried in errors so failures are
/// diagnosable without exposing upstream payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Rewrite,
    Retrieve,
    Generate,
    Commit,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnPhase::Rewrite => write!(f, "rewrite"),
            TurnPhase::Retrieve => write!(f, "retrieve"),
            TurnPhase::Generate => write!(f, "generate"),
            TurnPhase::Commit => write!(f, "commit"),
        }
    }
}

/// Errors from the conversation core.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// An upstream collaborator (retriever or generator) failed. Aborts the
    /// current turn; dialogue state is rolled back and the loop continues.
    #[error("upstream service failed during {phase}: {message}")]
    Upstream { phase: TurnPhase, message: String },

    /// A dialogue-state invariant was violated. Indicates a programming
    /// defect, not a recoverable condition.
    #[error("invalid dialogue state: {0}")]
    InvalidState(String),
}

impl ChatError {
    pub(crate) fn upstream(phase: TurnPhase, err: impl std::fmt::Display) -> Self {
        ChatError::Upstream {
            phase,
            message: err.to_string(),
        }
    }
}

impl From<ChatError> for TomeError {
    fn from(err: ChatError) -> Self {
        TomeError::Conversation(err.to_string())
    }
}
