//! The `Generator` trait and its scripted test double.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::Stream;
use futures::StreamExt;

use tome_core::types::{Message, StreamFragment};

use crate::error::LlmError;

/// A lazy sequence of stream fragments terminated by `StreamFragment::End`.
pub type FragmentStream =
    Pin<Box<dyn Stream<Item = Result<StreamFragment, LlmError>> + Send + 'static>>;

/// A text-generation service consuming an ordered list of role-tagged
/// messages.
///
/// Implementations must terminate every well-formed stream with an explicit
/// `StreamFragment::End`; consumers treat exhaustion without it as a
/// protocol violation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a single completed text for the given messages.
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// Generate a streamed completion for the given messages.
    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream, LlmError>;
}

/// One scripted response for [`MockGenerator`].
enum Scripted {
    /// `stream()` succeeds and yields these items in order.
    Fragments(Vec<Result<StreamFragment, LlmError>>),
    /// `stream()` itself fails before producing any fragment.
    Refuse(LlmError),
}

/// Deterministic generator for tests: pops one scripted response per call
/// and records every message list it was invoked with.
///
/// Exposed publicly (rather than behind `cfg(test)`) so that downstream
/// crates can drive their orchestration tests with it.
#[derive(Default)]
pub struct MockGenerator {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful stream of fragments for the next call.
    pub fn push_fragments(&self, fragments: Vec<StreamFragment>) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Scripted::Fragments(fragments.into_iter().map(Ok).collect()));
    }

    /// Script a stream that yields these items verbatim, errors included.
    pub fn push_items(&self, items: Vec<Result<StreamFragment, LlmError>>) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Scripted::Fragments(items));
    }

    /// Script a call that fails before streaming anything.
    pub fn push_failure(&self, err: LlmError) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Scripted::Refuse(err));
    }

    /// Convenience: script a stream of text deltas followed by `End`.
    pub fn push_text(&self, deltas: &[&str]) {
        let mut fragments: Vec<StreamFragment> = deltas
            .iter()
            .map(|d| StreamFragment::Text((*d).to_string()))
            .collect();
        fragments.push(StreamFragment::End);
        self.push_fragments(fragments);
    }

    /// Number of calls made so far (complete and stream combined).
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock").len()
    }

    /// Message lists captured from every call, in order.
    pub fn recorded_calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().expect("mock calls lock").clone()
    }

    fn record(&self, messages: &[Message]) {
        self.calls
            .lock()
            .expect("mock calls lock")
            .push(messages.to_vec());
    }

    fn pop(&self) -> Result<Vec<Result<StreamFragment, LlmError>>, LlmError> {
        match self.script.lock().expect("mock script lock").pop_front() {
            Some(Scripted::Fragments(items)) => Ok(items),
            Some(Scripted::Refuse(err)) => Err(err),
            None => Err(LlmError::Parse("mock script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.record(messages);
        let items = self.pop()?;
        let mut text = String::new();
        for item in items {
            if let StreamFragment::Text(t) = item? {
                text.push_str(&t);
            }
        }
        Ok(text)
    }

    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream, LlmError> {
        self.record(messages);
        let items = self.pop()?;
        Ok(futures::stream::iter(items).boxed())
    }
}
