//! Diagnostic conversation transcript.
//!
//! A human-readable mirror of the dialogue, rewritten in full on every
//! committed turn. Not authoritative state; write failures are the
//! caller's to log, never fatal.

use std::path::PathBuf;

use tome_core::types::Message;

/// Writes the full dialogue to a text file as `role: content` paragraphs.
#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    path: PathBuf,
}

impl TranscriptWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Rewrite the whole transcript from the given message sequence.
    pub fn rewrite(&self, messages: &[Message]) -> std::io::Result<()> {
        let mut out = String::new();
        for message in messages {
            out.push_str(&format!("{}: {}\n\n", message.role, message.content));
        }
        std::fs::write(&self.path, out)
    }
}
