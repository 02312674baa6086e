//! Standard analyzer that provides good defaults for most use cases.
//!
//! # Pipeline
//!
//! 1. UnicodeWordTokenizer (UAX #29 word boundaries)
//! 2. LowercaseFilter
//! 3. StopFilter (only when built with [`StandardAnalyzer::with_stop_words`])
//!
//! ```
//! use pilum::analysis::{Analyzer, StandardAnalyzer};
//!
//! let analyzer = StandardAnalyzer::new();
//! assert_eq!(analyzer.tokenize("Hello World").unwrap(), vec!["hello", "world"]);
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::unicode_word::UnicodeWordTokenizer;
use crate::error::Result;

/// A standard analyzer: Unicode word tokenization and lowercasing.
///
/// Stop words are kept by default so that every word of a document is
/// searchable.
#[derive(Clone, Debug)]
pub struct StandardAnalyzer {
    inner: PipelineAnalyzer,
}

impl StandardAnalyzer {
    /// Create a new standard analyzer with default settings.
    pub fn new() -> Self {
        let analyzer = PipelineAnalyzer::new(Arc::new(UnicodeWordTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()));

        StandardAnalyzer { inner: analyzer }
    }

    /// Create a standard analyzer that also drops English stop words.
    pub fn with_stop_words() -> Self {
        let analyzer = PipelineAnalyzer::new(Arc::new(UnicodeWordTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(StopFilter::new()));

        StandardAnalyzer { inner: analyzer }
    }

    /// Get the inner pipeline analyzer.
    pub fn inner(&self) -> &PipelineAnalyzer {
        &self.inner
    }
}

impl Default for StandardAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_analyzer_keeps_stop_words() {
        let analyzer = StandardAnalyzer::new();
        assert_eq!(
            analyzer.tokenize("Hello the World").unwrap(),
            vec!["hello", "the", "world"]
        );
    }

    #[test]
    fn test_standard_analyzer_with_stop_words() {
        let analyzer = StandardAnalyzer::with_stop_words();
        assert_eq!(
            analyzer.tokenize("Hello the world and test").unwrap(),
            vec!["hello", "world", "test"]
        );
    }

    #[test]
    fn test_positions_survive_stop_removal() {
        let analyzer = StandardAnalyzer::with_stop_words();
        let tokens: Vec<_> = analyzer.analyze("the lucene index").unwrap().collect();
        assert_eq!(tokens[0].position, 1);
        assert_eq!(tokens[1].position, 2);
    }
}
