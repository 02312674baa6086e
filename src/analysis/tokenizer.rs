//! Tokenizer implementations for text analysis.
//!
//! Tokenizers are the first step of an analyzer: they split input text into
//! tokens carrying positions and byte offsets.
//!
//! - [`unicode_word::UnicodeWordTokenizer`] - Uses Unicode word boundaries
//!
//! Keyword fields skip tokenization altogether, see
//! [`KeywordAnalyzer`](crate::analysis::KeywordAnalyzer).

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
///
/// # Examples
///
/// ```
/// use pilum::analysis::token::{Token, TokenStream};
/// use pilum::analysis::tokenizer::Tokenizer;
/// use pilum::error::Result;
///
/// struct CommaTokenizer;
///
/// impl Tokenizer for CommaTokenizer {
///     fn tokenize(&self, text: &str) -> Result<TokenStream> {
///         let tokens: Vec<Token> = text
///             .split(',')
///             .enumerate()
///             .map(|(i, s)| Token::new(s.trim(), i))
///             .collect();
///         Ok(Box::new(tokens.into_iter()))
///     }
///
///     fn name(&self) -> &'static str {
///         "comma"
///     }
/// }
/// ```
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod unicode_word;
