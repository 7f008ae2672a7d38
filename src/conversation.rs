//! Conversation history shared between the caller and the workflow.
//!
//! History is owned by the caller (the chat session, or whatever hosts the
//! workflow) and passed by read-only reference into each `ask` call. The
//! workflow never mutates it; appending turns is the caller's job.

use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Append-only ordered sequence of conversation turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::user(text));
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::assistant(text));
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_window() {
        let mut history = ConversationHistory::new();
        for i in 0..5 {
            history.push_user(format!("question {}", i));
            history.push_assistant(format!("answer {}", i));
        }

        let window = history.recent(4);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].text, "question 3");
        assert_eq!(window[3].text, "answer 4");
    }

    #[test]
    fn test_recent_larger_than_history() {
        let mut history = ConversationHistory::new();
        history.push_user("hello");

        assert_eq!(history.recent(10).len(), 1);
        assert_eq!(history.recent(0).len(), 0);
    }
}
