//! CodeAssist core
//!
//! Model lifecycle management and the conversation context pipeline for a
//! local-first coding assistant: loads and evicts inference models under a
//! fixed memory budget, streams generated text, builds token-budgeted
//! prompts from conversation history, and persists conversations with a
//! bounded in-memory cache. Transport, search, and document ingestion live
//! outside this crate.

pub mod config;
pub mod conversation;
pub mod error;
pub mod inference;
pub mod logging;
pub mod types;

pub use config::Settings;
pub use conversation::{ConversationCache, ConversationOrchestrator, ConversationStore, ContextBuilder};
pub use error::{Error, Result};
pub use inference::{GenerationParams, InferenceEngine, ModelLifecycleManager, ModelRegistry, ModelRuntime};
pub use types::{Conversation, ConversationSummary, Message, ModelProfile, ModelStatus, Role};
