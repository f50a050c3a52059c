//! Core data types
//!
//! Messages, conversations, and model metadata shared across services.

pub mod conversation;
pub mod message;
pub mod model;

pub use conversation::{Conversation, ConversationSummary};
pub use message::{Message, Role};
pub use model::{ModelProfile, ModelStatus};
