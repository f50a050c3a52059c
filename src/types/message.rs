//! Message types
//!
//! Defines chat message structures and roles.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user
    User,
    /// Message from the AI assistant
    Assistant,
    /// System prompt
    System,
}

impl Role {
    /// Capitalized label used when rendering prompts ("User", "Assistant", "System").
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

/// A single chat message. Immutable once appended to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    /// The role of the message sender
    pub role: Role,
    /// The content of the message
    pub content: String,
    /// When the message was created (serialized as RFC 3339)
    pub timestamp: DateTime<Utc>,
    /// Token count as estimated at append time. Prompt assembly recounts
    /// with the active model's estimator instead of trusting this value.
    pub token_count: u32,
    /// Free-form metadata supplied by the caller
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Message {
    /// Create a new message with a fresh id and the current timestamp.
    pub fn new(role: Role, content: impl Into<String>, token_count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            token_count,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
