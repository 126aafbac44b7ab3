//! Standalone-query rewriting via an ephemeral, history-free agent.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};

use tome_core::types::{Message, StreamFragment};
use tome_llm::Generator;

use crate::error::{ChatError, TurnPhase};
use crate::prompt::{build_rewrite_instruction, format_history};

/// A disposable generation session with no system message and no persisted
/// history. Used for exactly one rewrite call, then dropped; it never
/// touches the primary dialogue.
struct EphemeralAgent {
    generator: Arc<dyn Generator>,
}

impl EphemeralAgent {
    fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Stream one instruction and concatenate all non-terminal, non-empty
    /// fragments in arrival order.
    async fn ask(&self, instruction: &str) -> Result<String, ChatError> {
        let messages = vec![Message::user(instruction)];
        let mut stream = self
            .generator
            .stream(&messages)
            .await
            .map_err(|e| ChatError::upstream(TurnPhase::Rewrite, e))?;

        let mut text = String::new();
        let mut saw_end = false;
        while let Some(item) = stream.next().await {
            match item.map_err(|e| ChatError::upstream(TurnPhase::Rewrite, e))? {
                StreamFragment::Text(t) => text.push_str(&t),
                StreamFragment::End => {
                    saw_end = true;
                    break;
                }
            }
        }
        if !saw_end {
            warn!("rewrite stream ended without terminal sentinel; using accumulated text");
        }
        Ok(text)
    }
}

/// Decides whether a new raw question needs a standalone rewrite given the
/// prior dialogue, and produces it when so.
pub struct QueryRewriter {
    generator: Arc<dyn Generator>,
}

impl QueryRewriter {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Rewrite `question` into a standalone query.
    ///
    /// With no prior exchange (history of one message or fewer) the raw
    /// question passes through unchanged and no generation call is made.
    /// Otherwise a fresh ephemeral agent receives the rewrite instruction
    /// in streaming mode; zero usable fragments yield the empty string,
    /// which callers treat as "nothing to retrieve on".
    pub async fn rewrite(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<String, ChatError> {
        if history.len() <= 1 {
            return Ok(question.to_string());
        }

        let instruction = build_rewrite_instruction(question, &format_history(history));
        let agent = EphemeralAgent::new(Arc::clone(&self.generator));
        let rewritten = agent.ask(&instruction).await?;

        debug!(
            original_len = question.len(),
            rewritten_len = rewritten.len(),
            "Question rewritten for retrieval"
        );
        Ok(rewritten)
    }
}
