//! Prompt assembly
//!
//! Builds a token-budgeted prompt from conversation history. The window is
//! budget-driven, not message-count-driven: messages are taken newest to
//! oldest until the next one would exceed the budget, then rendered back
//! in chronological order. Older messages are dropped whole, never
//! truncated.

use crate::conversation::tokens::TokenBudgetEstimator;
use crate::types::Message;

/// System preamble prepended to every prompt.
pub const SYSTEM_PREAMBLE: &str = "\
You are CodeAssist AI, a helpful programming assistant that provides accurate, \
concise, and practical coding help.

Key guidelines:
- Provide working code examples with clear explanations
- Focus on best practices and modern conventions
- Explain complex concepts in simple terms
- When debugging, ask clarifying questions if the problem isn't clear
- Prefer readable, maintainable code over clever one-liners
- Include error handling where appropriate

Respond in a conversational tone while being technically accurate.";

/// A rendered prompt plus the windowing facts behind it.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub text: String,
    /// How many history messages made it into the window
    pub included_messages: usize,
    /// Estimated token cost of the rendered prompt
    pub prompt_tokens: u32,
}

/// Deterministic prompt builder.
#[derive(Clone)]
pub struct ContextBuilder {
    estimator: TokenBudgetEstimator,
    system_prompt: String,
    reserved_response_tokens: u32,
}

impl ContextBuilder {
    pub fn new(estimator: TokenBudgetEstimator, reserved_response_tokens: u32) -> Self {
        Self {
            estimator,
            system_prompt: SYSTEM_PREAMBLE.to_string(),
            reserved_response_tokens,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn estimator(&self) -> &TokenBudgetEstimator {
        &self.estimator
    }

    /// Build a prompt for `messages` within `context_length`.
    ///
    /// Each message's cost is recomputed here instead of reusing its stored
    /// count: the active model's tokenizer may differ from the one that
    /// counted it at append time.
    pub fn build(&self, messages: &[Message], context_length: u32) -> BuiltPrompt {
        let budget = context_length.saturating_sub(self.reserved_response_tokens);
        let mut used = self.estimator.count(&self.system_prompt);

        // Walk newest to oldest; `start` ends up at the oldest retained message.
        let mut start = messages.len();
        for (i, message) in messages.iter().enumerate().rev() {
            let cost = self.estimator.count_line(message.role, &message.content);
            if used + cost > budget {
                break;
            }
            used += cost;
            start = i;
        }

        let mut parts = vec![format!("System: {}\n", self.system_prompt)];
        for message in &messages[start..] {
            parts.push(format!("{}: {}\n", message.role.label(), message.content));
        }
        parts.push("Assistant: ".to_string());

        let included_messages = messages.len() - start;
        tracing::debug!(
            included_messages,
            dropped = start,
            prompt_tokens = used,
            budget,
            "prepared prompt"
        );

        BuiltPrompt {
            text: parts.join("\n"),
            included_messages,
            prompt_tokens: used,
        }
    }
}
