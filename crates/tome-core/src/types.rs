//! Shared types used across the Tome crates.

use serde::{Deserialize, Serialize};

/// Role of a message in a dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single role-tagged message. Ordering within a dialogue is significant
/// and is the sole representation of conversational time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One increment of a streamed generation.
///
/// `Text` carries a (possibly empty) content delta; `End` is the explicit
/// terminal sentinel. The two are deliberately distinct variants — an empty
/// text increment is a no-op, not end-of-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    Text(String),
    End,
}

impl StreamFragment {
    /// True for a `Text` fragment with non-empty content.
    pub fn has_content(&self) -> bool {
        matches!(self, StreamFragment::Text(t) if !t.is_empty())
    }
}

/// A retrieved document passage. Rank is the passage's position within one
/// retrieval result; it has no identity beyond content and rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// The passage text.
    pub content: String,
    /// Name of the source document this passage was chunked from.
    pub source: String,
    /// Relevance score assigned by the retriever (higher is better).
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let back: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(back, Role::User);
    }

    #[test]
    fn test_message_constructors() {
        let m = Message::system("you are helpful");
        assert_eq!(m.role, Role::System);
        assert_eq!(m.content, "you are helpful");

        let m = Message::user("hello");
        assert_eq!(m.role, Role::User);

        let m = Message::assistant("hi");
        assert_eq!(m.role, Role::Assistant);
    }

    #[test]
    fn test_fragment_has_content() {
        assert!(StreamFragment::Text("x".to_string()).has_content());
        assert!(!StreamFragment::Text(String::new()).has_content());
        assert!(!StreamFragment::End.has_content());
    }

    #[test]
    fn test_empty_text_is_not_end() {
        // The empty increment and the terminal sentinel must stay distinct.
        assert_ne!(StreamFragment::Text(String::new()), StreamFragment::End);
    }
}
