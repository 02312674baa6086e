//! Analyzers combine a tokenizer with a chain of filters.
//!
//! The index engine only sees the [`Analyzer`] trait. It calls
//! [`Analyzer::analyze_field`] for every tokenized field at indexing time and
//! the query parser calls it with the searched field, so a caller-supplied
//! analyzer is applied identically on both sides.
//!
//! - [`standard::StandardAnalyzer`] - Unicode words, lowercased
//! - [`keyword::KeywordAnalyzer`] - Treats entire input as one token
//! - [`pipeline::PipelineAnalyzer`] - Custom tokenizer + filter chains
//! - [`per_field::PerFieldAnalyzer`] - Different analyzers per field

use std::fmt::Debug;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
///
/// # Examples
///
/// Implementing a custom analyzer:
///
/// ```
/// use pilum::analysis::Analyzer;
/// use pilum::analysis::token::{Token, TokenStream};
/// use pilum::error::Result;
///
/// #[derive(Debug)]
/// struct SplitAnalyzer;
///
/// impl Analyzer for SplitAnalyzer {
///     fn analyze(&self, text: &str) -> Result<TokenStream> {
///         let tokens: Vec<Token> = text
///             .split('-')
///             .enumerate()
///             .map(|(i, s)| Token::new(s, i))
///             .collect();
///         Ok(Box::new(tokens.into_iter()))
///     }
///
///     fn name(&self) -> &'static str {
///         "split"
///     }
/// }
///
/// assert_eq!(SplitAnalyzer.tokenize("a-b").unwrap(), vec!["a", "b"]);
/// ```
pub trait Analyzer: Send + Sync + Debug {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Analyze text belonging to `field`.
    ///
    /// Analyzers that do not distinguish fields use [`Analyzer::analyze`].
    fn analyze_field(&self, field: &str, text: &str) -> Result<TokenStream> {
        let _ = field;
        self.analyze(text)
    }

    /// The ordered, normalized terms of `text`. Stopped tokens are skipped.
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .analyze(text)?
            .filter(|token| !token.is_stopped())
            .map(|token| token.text)
            .collect())
    }

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod keyword;
pub mod per_field;
pub mod pipeline;
pub mod standard;
