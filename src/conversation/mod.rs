//! Conversation pipeline
//!
//! Durable conversation records, the bounded in-memory cache over them,
//! token-budgeted prompt assembly, and the orchestrator that ties them to
//! the model lifecycle manager.

pub mod cache;
pub mod context;
pub mod orchestrator;
pub mod store;
pub mod tokens;

pub use cache::ConversationCache;
pub use context::{BuiltPrompt, ContextBuilder, SYSTEM_PREAMBLE};
pub use orchestrator::ConversationOrchestrator;
pub use store::ConversationStore;
pub use tokens::{HeuristicTokenizer, TokenBudgetEstimator, Tokenizer};
