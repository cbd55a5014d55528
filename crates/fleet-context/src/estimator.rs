//! Token counting (`CountTokens`).
//!
//! A pluggable `TokenEstimator` trait over plain text, backed by a BPE
//! tokenizer with a word-count fallback.

use tiktoken_rs::CoreBPE;
use tracing::warn;

pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// `⌈word_count × 1.3⌉`, used as an explicit fallback when the BPE
/// tokenizer is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordBasedEstimator;

impl TokenEstimator for WordBasedEstimator {
    fn estimate(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        (words as f64 * 1.3).ceil() as usize
    }
}

struct TiktokenEstimator {
    bpe: CoreBPE,
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl TiktokenEstimator {
    fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let tokens = self.bpe.encode_with_special_tokens(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }
        self.bpe.decode(tokens[..max_tokens].to_vec()).unwrap_or_else(|_| text.to_string())
    }
}

/// Counts tokens with `cl100k_base` when available, falling back to
/// [`WordBasedEstimator`] if the tokenizer failed to load.
pub struct TokenCounter {
    primary: Option<TiktokenEstimator>,
    fallback: WordBasedEstimator,
}

impl TokenCounter {
    pub fn new() -> Self {
        let primary = match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(TiktokenEstimator { bpe }),
            Err(e) => {
                warn!(error = %e, "failed to load cl100k_base tokenizer, falling back to word-count estimate");
                None
            }
        };
        Self { primary, fallback: WordBasedEstimator }
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.primary {
            Some(estimator) => estimator.estimate(text),
            None => self.fallback.estimate(text),
        }
    }

    /// Truncates `text` down to at most `max_tokens` tokens, preferring the
    /// BPE tokenizer's own encode/decode round-trip so the cut lands on a
    /// token boundary; falls back to a word-count cut consistent with
    /// [`WordBasedEstimator`]'s `1.3` multiplier.
    pub fn trim_to_tokens(&self, text: &str, max_tokens: usize) -> String {
        if max_tokens == 0 {
            return String::new();
        }
        match &self.primary {
            Some(estimator) => estimator.truncate(text, max_tokens),
            None => {
                let max_words = ((max_tokens as f64) / 1.3).floor() as usize;
                text.split_whitespace().take(max_words).collect::<Vec<_>>().join(" ")
            }
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_based_estimator_applies_1_3_multiplier() {
        let estimator = WordBasedEstimator;
        assert_eq!(estimator.estimate("one two three four"), 6);
    }

    #[test]
    fn word_based_estimator_handles_empty_text() {
        let estimator = WordBasedEstimator;
        assert_eq!(estimator.estimate(""), 0);
    }

    #[test]
    fn token_counter_produces_a_positive_count_for_nonempty_text() {
        let counter = TokenCounter::new();
        assert!(counter.count("hello world, this is a test sentence.") > 0);
    }
}
