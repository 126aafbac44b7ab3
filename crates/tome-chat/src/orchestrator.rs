//! The conversation loop: rewrite, retrieve, prompt, stream, commit.
//!
//! One `Orchestrator` owns one dialogue. A turn runs to completion before
//! the next is read; the only suspension points are fragment deliveries
//! from the streaming generator, where cancellation is honored.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use tome_core::types::{Message, StreamFragment};
use tome_llm::Generator;
use tome_retrieval::Retriever;

use crate::error::{ChatError, TurnPhase};
use crate::history::DialogueHistory;
use crate::prompt::{build_prompt, format_context, SYSTEM_PROMPT};
use crate::rewriter::QueryRewriter;
use crate::transcript::TranscriptWriter;

/// Flow control returned by a sink for each delivered fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFlow {
    Continue,
    Cancel,
}

/// Receives answer fragments as they arrive.
///
/// `on_fragment` is called once per non-empty text fragment, in order;
/// returning `Cancel` stops the stream, discards the partial answer, and
/// rolls the turn back. `on_complete` fires when a committed answer's
/// stream has finished.
pub trait FragmentSink: Send {
    fn on_fragment(&mut self, text: &str) -> SinkFlow;
    fn on_complete(&mut self) {}
}

/// Result of one completed call to [`Orchestrator::ask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn committed: the stored user content is `query` (the query
    /// actually used for retrieval) and the assistant content is `answer`.
    Answered { query: String, answer: String },
    /// The caller cancelled mid-stream; nothing was committed.
    Cancelled,
}

/// True when `input` is the conversation exit sentinel (case-insensitive
/// "q", surrounding whitespace ignored).
pub fn is_exit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("q")
}

/// Drives one retrieval-grounded conversation.
pub struct Orchestrator {
    history: DialogueHistory,
    rewriter: QueryRewriter,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    top_k: usize,
    transcript: Option<TranscriptWriter>,
}

impl Orchestrator {
    /// Create an orchestrator with a fresh system-seeded dialogue.
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        top_k: usize,
    ) -> Self {
        Self {
            history: DialogueHistory::new(SYSTEM_PROMPT),
            rewriter: QueryRewriter::new(Arc::clone(&generator)),
            retriever,
            generator,
            top_k,
            transcript: None,
        }
    }

    /// Attach a diagnostic transcript, rewritten on every committed turn.
    pub fn with_transcript(mut self, transcript: TranscriptWriter) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// An owned copy of the current dialogue state.
    pub fn snapshot(&self) -> Vec<Message> {
        self.history.snapshot()
    }

    /// Reset the dialogue to a single fresh system message.
    pub fn reset(&mut self) {
        self.history.reset(SYSTEM_PROMPT);
    }

    /// Process one raw question through a full turn.
    ///
    /// On success the dialogue has grown by exactly one {user, assistant}
    /// pair whose user content is the retrieval query (not the verbose
    /// grounding prompt). On upstream failure or cancellation the dialogue
    /// is left exactly as it was before the call.
    pub async fn ask(
        &mut self,
        question: &str,
        sink: &mut dyn FragmentSink,
    ) -> Result<TurnOutcome, ChatError> {
        // Rewriting: only once a prior exchange exists.
        let query = if self.history.len() > 1 {
            self.rewriter
                .rewrite(question, &self.history.snapshot())
                .await?
        } else {
            question.to_string()
        };

        // Retrieving: an empty result proceeds with an empty context block;
        // the grounding instruction already covers "no context".
        let passages = self
            .retriever
            .search(&query, self.top_k)
            .await
            .map_err(|e| ChatError::upstream(TurnPhase::Retrieve, e))?;
        debug!(passages = passages.len(), "Context retrieved");

        // Generating: reserve the turn-pair slot before dispatch.
        let prompt = build_prompt(&format_context(&passages), &query);
        self.history.append(Message::user(prompt));

        let mut stream = match self.generator.stream(&self.history.snapshot()).await {
            Ok(s) => s,
            Err(e) => {
                self.history.retract_speculative_user()?;
                return Err(ChatError::upstream(TurnPhase::Generate, e));
            }
        };

        let mut answer = String::new();
        let mut saw_end = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(StreamFragment::End) => {
                    saw_end = true;
                    break;
                }
                Ok(StreamFragment::Text(t)) => {
                    if t.is_empty() {
                        continue;
                    }
                    answer.push_str(&t);
                    if sink.on_fragment(&t) == SinkFlow::Cancel {
                        info!("turn cancelled mid-stream; rolling back");
                        self.history.retract_speculative_user()?;
                        return Ok(TurnOutcome::Cancelled);
                    }
                }
                Err(e) => {
                    self.history.retract_speculative_user()?;
                    return Err(ChatError::upstream(TurnPhase::Generate, e));
                }
            }
        }

        if !saw_end {
            // Protocol violation, non-fatal: commit what was accumulated.
            warn!(
                accumulated = answer.len(),
                "stream ended without terminal sentinel; committing partial answer"
            );
        }
        sink.on_complete();

        // Committing: store the clean retrieval query in place of the
        // grounding prompt, keeping history compact and re-promptable.
        self.history.append(Message::assistant(answer.clone()));
        self.history.replace_last_turn_pair(query.clone(), answer.clone())?;

        if let Some(transcript) = &self.transcript {
            if let Err(e) = transcript.rewrite(self.history.messages()) {
                warn!(error = %e, "transcript write failed");
            }
        }

        Ok(TurnOutcome::Answered { query, answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tome_core::types::Passage;
    use tome_llm::{LlmError, MockGenerator};
    use tome_retrieval::RetrievalError;

    /// Retriever returning a fixed passage list, or failing on demand.
    struct StaticRetriever {
        passages: Vec<Passage>,
        fail: bool,
    }

    impl StaticRetriever {
        fn with_passages(contents: &[&str]) -> Self {
            Self {
                passages: contents
                    .iter()
                    .enumerate()
                    .map(|(i, c)| Passage {
                        content: (*c).to_string(),
                        source: "doc.txt".to_string(),
                        score: 1.0 - i as f64 * 0.1,
                    })
                    .collect(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                passages: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn search(
            &self,
            _query: &str,
            top_k: usize,
        ) -> Result<Vec<Passage>, RetrievalError> {
            if self.fail {
                return Err(RetrievalError::Index("index unavailable".to_string()));
            }
            Ok(self.passages.iter().take(top_k).cloned().collect())
        }
    }

    /// Sink that records fragments and optionally cancels after N of them.
    #[derive(Default)]
    struct RecordingSink {
        fragments: Vec<String>,
        completions: usize,
        cancel_after: Option<usize>,
    }

    impl FragmentSink for RecordingSink {
        fn on_fragment(&mut self, text: &str) -> SinkFlow {
            self.fragments.push(text.to_string());
            match self.cancel_after {
                Some(n) if self.fragments.len() >= n => SinkFlow::Cancel,
                _ => SinkFlow::Continue,
            }
        }

        fn on_complete(&mut self) {
            self.completions += 1;
        }
    }

    fn orchestrator_with(
        retriever: StaticRetriever,
        generator: Arc<MockGenerator>,
    ) -> Orchestrator {
        Orchestrator::new(Arc::new(retriever), generator, 5)
    }

    #[tokio::test]
    async fn test_first_turn_passes_question_through() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_text(&["Wizards chess is chess with moving pieces."]);
        let mut orch = orchestrator_with(
            StaticRetriever::with_passages(&["passage one", "passage two"]),
            generator.clone(),
        );

        let mut sink = RecordingSink::default();
        let outcome = orch.ask("What is wizards chess?", &mut sink).await.unwrap();

        match outcome {
            TurnOutcome::Answered { query, .. } => assert_eq!(query, "What is wizards chess?"),
            other => panic!("expected Answered, got {other:?}"),
        }
        // Only the answer generation call — no rewrite call on first turn.
        assert_eq!(generator.call_count(), 1);

        let snap = orch.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[1].content, "What is wizards chess?");
    }

    #[tokio::test]
    async fn test_grounding_prompt_sent_but_clean_query_stored() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_text(&["answer"]);
        let mut orch = orchestrator_with(
            StaticRetriever::with_passages(&["some context"]),
            generator.clone(),
        );

        let mut sink = RecordingSink::default();
        orch.ask("What is wizards chess?", &mut sink).await.unwrap();

        // The generator saw the full grounding prompt...
        let sent = &generator.recorded_calls()[0];
        let user_msg = &sent[1];
        assert!(user_msg.content.contains("THIS IS THE CONTEXT:"));
        assert!(user_msg.content.contains("Document 1)"));
        assert!(user_msg.content.contains("some context"));

        // ...but the committed history stores only the clean query.
        let snap = orch.snapshot();
        assert_eq!(snap[1].content, "What is wizards chess?");
        assert!(!snap[1].content.contains("THIS IS THE CONTEXT:"));
    }

    #[tokio::test]
    async fn test_history_grows_by_two_per_turn() {
        let generator = Arc::new(MockGenerator::new());
        let mut orch = orchestrator_with(
            StaticRetriever::with_passages(&["ctx"]),
            generator.clone(),
        );

        generator.push_text(&["first answer"]);
        let mut sink = RecordingSink::default();
        orch.ask("first?", &mut sink).await.unwrap();
        assert_eq!(orch.snapshot().len(), 3);

        // Second turn triggers a rewrite call plus the answer call.
        generator.push_text(&["standalone second question"]);
        generator.push_text(&["second answer"]);
        orch.ask("second?", &mut sink).await.unwrap();
        assert_eq!(orch.snapshot().len(), 5);
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_zero_fragment_stream_commits_empty_answer() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_fragments(vec![StreamFragment::End]);
        let mut orch =
            orchestrator_with(StaticRetriever::with_passages(&["ctx"]), generator.clone());

        let mut sink = RecordingSink::default();
        let outcome = orch.ask("anything?", &mut sink).await.unwrap();

        match outcome {
            TurnOutcome::Answered { answer, .. } => assert_eq!(answer, ""),
            other => panic!("expected Answered, got {other:?}"),
        }
        assert_eq!(orch.snapshot().len(), 3);
        assert!(sink.fragments.is_empty());
        assert_eq!(sink.completions, 1);
    }

    #[tokio::test]
    async fn test_terminal_sentinel_scenario() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_fragments(vec![
            StreamFragment::Text("Hel".to_string()),
            StreamFragment::Text("lo".to_string()),
            StreamFragment::Text(String::new()),
            StreamFragment::End,
        ]);
        let mut orch =
            orchestrator_with(StaticRetriever::with_passages(&["ctx"]), generator.clone());

        let mut sink = RecordingSink::default();
        let outcome = orch.ask("greeting?", &mut sink).await.unwrap();

        match outcome {
            TurnOutcome::Answered { answer, .. } => assert_eq!(answer, "Hello"),
            other => panic!("expected Answered, got {other:?}"),
        }
        // The empty fragment produced no visible output.
        assert_eq!(sink.fragments, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_sentinel_commits_partial() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_fragments(vec![StreamFragment::Text("partial".to_string())]);
        let mut orch =
            orchestrator_with(StaticRetriever::with_passages(&["ctx"]), generator.clone());

        let mut sink = RecordingSink::default();
        let outcome = orch.ask("q?", &mut sink).await.unwrap();

        match outcome {
            TurnOutcome::Answered { answer, .. } => assert_eq!(answer, "partial"),
            other => panic!("expected Answered, got {other:?}"),
        }
        assert_eq!(orch.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn test_retriever_failure_rolls_back() {
        let generator = Arc::new(MockGenerator::new());
        let mut orch = orchestrator_with(StaticRetriever::failing(), generator.clone());
        let before = orch.snapshot();

        let mut sink = RecordingSink::default();
        let err = orch.ask("q?", &mut sink).await.unwrap_err();

        match err {
            ChatError::Upstream { phase, .. } => assert_eq!(phase, TurnPhase::Retrieve),
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert_eq!(orch.snapshot(), before);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generator_refusal_rolls_back_speculative_user() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_failure(LlmError::RateLimited);
        let mut orch =
            orchestrator_with(StaticRetriever::with_passages(&["ctx"]), generator.clone());
        let before = orch.snapshot();

        let mut sink = RecordingSink::default();
        let err = orch.ask("q?", &mut sink).await.unwrap_err();

        match err {
            ChatError::Upstream { phase, .. } => assert_eq!(phase, TurnPhase::Generate),
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert_eq!(orch.snapshot(), before);
    }

    #[tokio::test]
    async fn test_mid_stream_error_rolls_back() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_items(vec![
            Ok(StreamFragment::Text("doomed ".to_string())),
            Err(LlmError::Network("connection reset".to_string())),
        ]);
        let mut orch =
            orchestrator_with(StaticRetriever::with_passages(&["ctx"]), generator.clone());
        let before = orch.snapshot();

        let mut sink = RecordingSink::default();
        let err = orch.ask("q?", &mut sink).await.unwrap_err();

        assert!(matches!(err, ChatError::Upstream { phase: TurnPhase::Generate, .. }));
        assert_eq!(orch.snapshot(), before);
        // The fragment had already been forwarded before the failure.
        assert_eq!(sink.fragments, vec!["doomed ".to_string()]);
    }

    #[tokio::test]
    async fn test_cancellation_discards_partial_and_rolls_back() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_text(&["one ", "two ", "three"]);
        let mut orch =
            orchestrator_with(StaticRetriever::with_passages(&["ctx"]), generator.clone());
        let before = orch.snapshot();

        let mut sink = RecordingSink {
            cancel_after: Some(2),
            ..Default::default()
        };
        let outcome = orch.ask("q?", &mut sink).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(orch.snapshot(), before);
        assert_eq!(sink.fragments.len(), 2);
        assert_eq!(sink.completions, 0);
    }

    #[tokio::test]
    async fn test_empty_retrieval_proceeds_with_empty_context() {
        let generator = Arc::new(MockGenerator::new());
        generator.push_text(&["I don't know."]);
        let mut orch =
            orchestrator_with(StaticRetriever::with_passages(&[]), generator.clone());

        let mut sink = RecordingSink::default();
        let outcome = orch.ask("obscure question?", &mut sink).await.unwrap();

        assert!(matches!(outcome, TurnOutcome::Answered { .. }));
        let sent = &generator.recorded_calls()[0];
        assert!(sent[1].content.contains("THIS IS THE CONTEXT:"));
        assert!(!sent[1].content.contains("Document 1)"));
    }

    #[test]
    fn test_exit_command_variants() {
        assert!(is_exit_command("q"));
        assert!(is_exit_command("Q"));
        assert!(is_exit_command(" q "));
        assert!(is_exit_command("\tQ\n"));
        assert!(!is_exit_command("quit"));
        assert!(!is_exit_command(""));
        assert!(!is_exit_command("q and more"));
    }
}
