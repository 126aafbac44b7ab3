//! Conversation core for Tome.
//!
//! Drives one retrieval-grounded dialogue: query rewriting against prior
//! turns, passage retrieval, grounded prompt assembly, streamed answer
//! reassembly, and a consistent mutable dialogue history.

pub mod error;
pub mod history;
pub mod orchestrator;
pub mod prompt;
pub mod rewriter;
pub mod transcript;

pub use error::{ChatError, TurnPhase};
pub use history::DialogueHistory;
pub use orchestrator::{is_exit_command, FragmentSink, Orchestrator, SinkFlow, TurnOutcome};
pub use rewriter::QueryRewriter;
pub use transcript::TranscriptWriter;
