//! Text analysis for Pilum.
//!
//! Analysis turns raw field text into the ordered sequence of normalized
//! terms that the segment builder indexes and the query parser searches for.
//! An [`Analyzer`] is a tokenizer followed by a chain of token filters:
//!
//! ```text
//! Raw Text → Tokenizer → Filter 1 → ... → Filter N → Token Stream
//! ```
//!
//! # Examples
//!
//! ```
//! use pilum::analysis::{Analyzer, StandardAnalyzer};
//!
//! let analyzer = StandardAnalyzer::new();
//! assert_eq!(analyzer.tokenize("Hello, Lucene!").unwrap(), vec!["hello", "lucene"]);
//! ```

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::Analyzer;
pub use analyzer::keyword::KeywordAnalyzer;
pub use analyzer::per_field::PerFieldAnalyzer;
pub use analyzer::pipeline::PipelineAnalyzer;
pub use analyzer::standard::StandardAnalyzer;
pub use token::{Token, TokenStream};
