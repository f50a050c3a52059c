//! Token budget estimation
//!
//! Counts tokens in text for context windowing. The tokenizer is pluggable
//! because the estimate directly determines how much history a prompt
//! keeps; whatever backend is installed must be deterministic within a run
//! and monotone non-decreasing in text length.

use std::sync::Arc;

use crate::types::Role;

/// Pluggable tokenizer backend.
pub trait Tokenizer: Send + Sync {
    /// Number of tokens in `text`. Same text must always give the same
    /// count, and longer text never counts fewer tokens.
    fn count(&self, text: &str) -> usize;
}

/// Default backend: one token per four characters, rounded up.
///
/// A deliberately coarse stand-in for a real BPE tokenizer. It
/// overestimates code-heavy text slightly, which errs on the safe side:
/// prompts come out under budget, never over.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// Token counter used across the pipeline for message costs and prompt
/// budgets.
#[derive(Clone)]
pub struct TokenBudgetEstimator {
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenBudgetEstimator {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Estimator with the default heuristic backend.
    pub fn heuristic() -> Self {
        Self::new(Arc::new(HeuristicTokenizer))
    }

    pub fn count(&self, text: &str) -> u32 {
        self.tokenizer.count(text) as u32
    }

    /// Cost of a message as it is rendered into a prompt ("Role: content").
    pub fn count_line(&self, role: Role, content: &str) -> u32 {
        self.count(&format!("{}: {}", role.label(), content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let est = TokenBudgetEstimator::heuristic();
        let text = "fn reverse(list: &mut Vec<i32>) { list.reverse(); }";
        assert_eq!(est.count(text), est.count(text));
    }

    #[test]
    fn test_monotone_in_length() {
        let est = TokenBudgetEstimator::heuristic();
        let mut text = String::new();
        let mut last = 0;
        for _ in 0..64 {
            text.push('x');
            let count = est.count(&text);
            assert!(count >= last);
            last = count;
        }
    }

    #[test]
    fn test_four_chars_per_token_rounded_up() {
        let est = TokenBudgetEstimator::heuristic();
        assert_eq!(est.count(""), 0);
        assert_eq!(est.count("abc"), 1);
        assert_eq!(est.count("abcd"), 1);
        assert_eq!(est.count("abcde"), 2);
    }

    #[test]
    fn test_count_line_includes_role_prefix() {
        let est = TokenBudgetEstimator::heuristic();
        // "User: hi" is 8 chars -> 2 tokens; bare "hi" is 1.
        assert_eq!(est.count_line(Role::User, "hi"), 2);
        assert_eq!(est.count("hi"), 1);
    }

    #[test]
    fn test_custom_tokenizer_backend() {
        struct WordTokenizer;
        impl Tokenizer for WordTokenizer {
            fn count(&self, text: &str) -> usize {
                text.split_whitespace().count()
            }
        }
        let est = TokenBudgetEstimator::new(Arc::new(WordTokenizer));
        assert_eq!(est.count("three short words"), 3);
    }
}
