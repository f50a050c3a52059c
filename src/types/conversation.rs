//! Conversation types
//!
//! A conversation is an append-only sequence of messages plus bookkeeping
//! metadata. The full record round-trips exactly through serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::message::Message;

/// A conversation with its full message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Optional title; derived from the first user message when unset
    pub title: Option<String>,
    /// Messages in strict append order. Never reordered, never mutated in place.
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    /// Monotone non-decreasing across mutations
    pub updated_at: DateTime<Utc>,
    /// Model this conversation prefers for generation
    pub model_name: Option<String>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new(title: Option<String>, model_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            model_name,
        }
    }

    /// Append a message and bump `updated_at`, keeping it monotone even if
    /// the wall clock steps backwards.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Lightweight view for listings.
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.messages.len(),
            model_name: self.model_name.clone(),
        }
    }
}

/// Conversation listing entry, sorted most-recently-updated first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub model_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::Role;

    #[test]
    fn test_new_conversation_is_empty() {
        let conv = Conversation::new(None, Some("phi-3.5-mini".into()));
        assert!(conv.title.is_none());
        assert!(conv.messages.is_empty());
        assert_eq!(conv.created_at, conv.updated_at);
        assert_eq!(conv.model_name.as_deref(), Some("phi-3.5-mini"));
    }

    #[test]
    fn test_push_preserves_append_order() {
        let mut conv = Conversation::new(None, None);
        for i in 0..5 {
            conv.push_message(Message::new(Role::User, format!("msg {i}"), 2));
        }
        let contents: Vec<_> = conv.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_updated_at_monotone() {
        let mut conv = Conversation::new(None, None);
        let mut last = conv.updated_at;
        for _ in 0..3 {
            conv.push_message(Message::new(Role::User, "hi", 1));
            assert!(conv.updated_at >= last);
            last = conv.updated_at;
        }
    }

    #[test]
    fn test_conversation_round_trip() {
        let mut conv = Conversation::new(Some("Borrow checker".into()), Some("qwen2.5-coder-7b".into()));
        conv.push_message(Message::new(Role::User, "why does this not compile?", 7));
        conv.push_message(Message::new(Role::Assistant, "you are moving out of a borrow", 8));

        let json = serde_json::to_string_pretty(&conv).unwrap();
        let back: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(conv, back);
    }

    #[test]
    fn test_summary_reflects_state() {
        let mut conv = Conversation::new(Some("T".into()), None);
        conv.push_message(Message::new(Role::User, "a", 1));
        let summary = conv.summary();
        assert_eq!(summary.id, conv.id);
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.title.as_deref(), Some("T"));
    }
}
