//! Conversation history kept between user turns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered chat history, bounded to the last `max_turns` exchanges
/// (`0` keeps everything).
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
}

impl ConversationSession {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    /// Append a completed exchange.
    pub fn record(&mut self, user: &str, assistant: &str) {
        self.turns.push(ConversationTurn::user(user));
        self.turns.push(ConversationTurn::assistant(assistant));
        self.trim();
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Number of recorded exchanges.
    pub fn exchanges(&self) -> usize {
        self.turns.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn trim(&mut self) {
        if self.max_turns == 0 {
            return;
        }
        let keep = self.max_turns * 2;
        if self.turns.len() > keep {
            let excess = self.turns.len() - keep;
            self.turns.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_order() {
        let mut session = ConversationSession::new(0);
        session.record("hi", "hello");
        session.record("next?", "standup");

        let roles: Vec<_> = session.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(session.turns()[2].content, "next?");
        assert_eq!(session.exchanges(), 2);
    }

    #[test]
    fn test_oldest_exchanges_are_dropped() {
        let mut session = ConversationSession::new(2);
        for i in 0..5 {
            session.record(&format!("q{}", i), &format!("a{}", i));
        }
        assert_eq!(session.exchanges(), 2);
        assert_eq!(session.turns()[0], ConversationTurn::user("q3"));
        assert_eq!(session.turns()[3], ConversationTurn::assistant("a4"));
    }

    #[test]
    fn test_clear() {
        let mut session = ConversationSession::new(10);
        session.record("q", "a");
        session.clear();
        assert!(session.is_empty());
    }
}
