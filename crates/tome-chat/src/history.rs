//! Mutable dialogue history: the single source of truth for conversational
//! context.
//!
//! The sequence starts with exactly one system message (unless created
//! history-free) and, after the first committed turn, always ends with a
//! {user, assistant} pair. Only the orchestrator mutates it, one turn at a
//! time; every mutation is visible to the very next read.

use tome_core::types::{Message, Role};

use crate::error::ChatError;

/// Ordered sequence of role-tagged messages for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueHistory {
    messages: Vec<Message>,
}

impl DialogueHistory {
    /// Create a history seeded with a single system message.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Create an empty, history-free sequence (used by ephemeral rewrite
    /// agents, which carry no behavioral contract and no prior turns).
    pub fn history_free() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Append a message to the end of the history.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Atomically replace the last turn pair.
    ///
    /// Fails with `InvalidState` unless the last two messages are exactly
    /// {user, assistant} in that order. On success the user message content
    /// becomes `user_content` and the assistant content `assistant_content`.
    pub fn replace_last_turn_pair(
        &mut self,
        user_content: impl Into<String>,
        assistant_content: impl Into<String>,
    ) -> Result<(), ChatError> {
        let n = self.messages.len();
        if n < 2 {
            return Err(ChatError::InvalidState(format!(
                "cannot replace turn pair: history has {} message(s)",
                n
            )));
        }
        let (user_idx, assistant_idx) = (n - 2, n - 1);
        if self.messages[user_idx].role != Role::User
            || self.messages[assistant_idx].role != Role::Assistant
        {
            return Err(ChatError::InvalidState(format!(
                "last two messages are {}, {} — expected user, assistant",
                self.messages[user_idx].role, self.messages[assistant_idx].role
            )));
        }

        self.messages[user_idx].content = user_content.into();
        self.messages[assistant_idx].content = assistant_content.into();
        Ok(())
    }

    /// Roll back a speculative user message appended for a turn that did
    /// not complete. Fails if the last message is not a user message.
    pub fn retract_speculative_user(&mut self) -> Result<Message, ChatError> {
        match self.messages.pop() {
            Some(m) if m.role == Role::User => Ok(m),
            Some(m) => {
                let role = m.role;
                self.messages.push(m);
                Err(ChatError::InvalidState(format!(
                    "cannot retract: last message is {}",
                    role
                )))
            }
            None => Err(ChatError::InvalidState(
                "cannot retract from empty history".to_string(),
            )),
        }
    }

    /// An owned copy of the current message sequence.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrow the current message sequence.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Replace the entire history with a fresh single system message.
    pub fn reset(&mut self, system_prompt: impl Into<String>) {
        self.messages = vec![Message::system(system_prompt)];
    }

    /// Number of messages in the history.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when the history holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
