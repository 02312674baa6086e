//! Stop filter implementation.
//!
//! ```
//! use pilum::analysis::token_filter::Filter;
//! use pilum::analysis::token_filter::stop::StopFilter;
//! use pilum::analysis::token::Token;
//!
//! let filter = StopFilter::new();
//! let tokens = vec![Token::new("the", 0), Token::new("quick", 1)];
//! let result: Vec<_> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();
//!
//! assert_eq!(result.len(), 1);
//! assert_eq!(result[0].text, "quick");
//! assert_eq!(result[0].position, 1);
//! ```

use std::sync::{Arc, LazyLock};

use ahash::AHashSet;

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Default English stop words list.
const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Default English stop words as a set.
pub static DEFAULT_ENGLISH_STOP_WORDS_SET: LazyLock<AHashSet<String>> = LazyLock::new(|| {
    DEFAULT_ENGLISH_STOP_WORDS
        .iter()
        .map(|&s| s.to_string())
        .collect()
});

/// A filter that removes stop words from the token stream.
///
/// Removed tokens leave a gap in positions; the surviving tokens keep the
/// positions the tokenizer gave them.
#[derive(Clone, Debug)]
pub struct StopFilter {
    stop_words: Arc<AHashSet<String>>,
    /// Whether to remove stopped tokens entirely or just mark them as stopped
    remove_stopped: bool,
}

impl StopFilter {
    /// Create a new stop filter with the default English stop words.
    pub fn new() -> Self {
        Self::with_stop_words(DEFAULT_ENGLISH_STOP_WORDS_SET.clone())
    }

    /// Create a new stop filter with custom stop words.
    pub fn with_stop_words(stop_words: AHashSet<String>) -> Self {
        StopFilter {
            stop_words: Arc::new(stop_words),
            remove_stopped: true,
        }
    }

    /// Create a new stop filter from a list of stop words.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_stop_words(words.into_iter().map(Into::into).collect())
    }

    /// Keep stopped tokens in the stream, marked instead of removed.
    pub fn remove_stopped(mut self, remove: bool) -> Self {
        self.remove_stopped = remove;
        self
    }

    /// Check if a word is a stop word.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let stop_words = Arc::clone(&self.stop_words);
        let remove_stopped = self.remove_stopped;

        Ok(Box::new(tokens.filter_map(move |token| {
            if token.is_stopped() || !stop_words.contains(&token.text) {
                Some(token)
            } else if remove_stopped {
                None
            } else {
                Some(token.stop())
            }
        })))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}
