//! Keyword analyzer that treats the entire input as a single token.
//!
//! ```
//! use pilum::analysis::{Analyzer, KeywordAnalyzer};
//!
//! let analyzer = KeywordAnalyzer::new();
//! assert_eq!(analyzer.tokenize("user-123-abc").unwrap(), vec!["user-123-abc"]);
//! ```

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// A keyword analyzer that emits the input unchanged as one token.
///
/// Indexed but non-tokenized fields are always indexed this way, whatever
/// analyzer the index is configured with, so a `Term` built from the raw
/// value (an id, an author name) matches exactly. Empty input yields no
/// token and so no term.
#[derive(Clone, Debug, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    /// Create a new keyword analyzer.
    pub fn new() -> Self {
        KeywordAnalyzer
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let token = (!text.is_empty()).then(|| Token::with_offsets(text, 0, 0, text.len()));
        Ok(Box::new(token.into_iter()))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_analyzer_keeps_value_intact() {
        let analyzer = KeywordAnalyzer::new();
        assert_eq!(
            analyzer.tokenize("Hello World Test").unwrap(),
            vec!["Hello World Test"]
        );

        let tokens: Vec<Token> = analyzer.analyze("doc-42").unwrap().collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].position, 0);
        assert_eq!((tokens[0].start_offset, tokens[0].end_offset), (0, 6));
    }

    #[test]
    fn test_empty_value_has_no_term() {
        let analyzer = KeywordAnalyzer::new();
        assert!(analyzer.tokenize("").unwrap().is_empty());
        assert_eq!(analyzer.analyze("").unwrap().count(), 0);
    }
}
